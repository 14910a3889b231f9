//! Dedicated execution context for one brain.
//!
//! [`spawn`] moves a [`Brain`] onto its own OS thread running a
//! current-thread tokio runtime. Events go in through an unbounded queue,
//! requests come out through another, and the latest [`BrainStatus`] is
//! published on a watch channel after every event.
//!
//! # Shutdown
//!
//! The loop stops when the brain finishes its game, when the inbound queue
//! closes, or when the [`KillSwitch`] trips. A kill is observed while the
//! loop waits for the next event and while it sleeps before a paced
//! request, never in the middle of [`Brain::step`]. The runtime and any
//! timers it owns are dropped with the thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use settler_types::{GameEvent, PlayerNumber, Request};
use tokio::sync::{Notify, mpsc, watch};
use tracing::{debug, info, warn};

use crate::brain::Brain;
use crate::error::BrainError;
use crate::status::BrainStatus;

// ---------------------------------------------------------------------------
// Kill switch
// ---------------------------------------------------------------------------

/// Thread-safe, idempotent stop signal for one brain loop.
#[derive(Debug, Default)]
pub struct KillSwitch {
    /// Set once, never cleared.
    killed: AtomicBool,

    /// Wakes the loop out of its waits.
    notify: Notify,
}

impl KillSwitch {
    /// A switch that has not tripped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the switch. Returns `true` for the call that tripped it.
    pub fn kill(&self) -> bool {
        let first = !self.killed.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    /// Whether the switch has tripped.
    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// Resolve once the switch has tripped.
    pub async fn killed(&self) {
        while !self.is_killed() {
            // Registered before the check, so a kill in between still wakes us.
            let notified = self.notify.notified();
            if self.is_killed() {
                return;
            }
            notified.await;
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owner's side of a running brain.
///
/// Dropping the handle kills the loop.
#[derive(Debug)]
pub struct BrainHandle {
    seat: PlayerNumber,
    events: mpsc::UnboundedSender<GameEvent>,
    status: watch::Receiver<BrainStatus>,
    kill: Arc<KillSwitch>,
    thread: Option<JoinHandle<Brain>>,
}

impl BrainHandle {
    /// The seat this brain plays.
    pub const fn seat(&self) -> PlayerNumber {
        self.seat
    }

    /// Queue an event. Returns `false` once the loop has stopped.
    pub fn send(&self, event: GameEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Another sender for the inbound queue, for the engine side.
    pub fn sender(&self) -> mpsc::UnboundedSender<GameEvent> {
        self.events.clone()
    }

    /// The status published after the latest event.
    pub fn status(&self) -> BrainStatus {
        self.status.borrow().clone()
    }

    /// A receiver that sees every new status.
    pub fn status_receiver(&self) -> watch::Receiver<BrainStatus> {
        self.status.clone()
    }

    /// Stop the loop. Safe to call any number of times from any thread.
    pub fn kill(&self) -> bool {
        self.kill.kill()
    }

    /// The switch itself, for callers that outlive the handle.
    pub fn kill_switch(&self) -> Arc<KillSwitch> {
        Arc::clone(&self.kill)
    }

    /// Whether the loop thread has exited.
    pub fn is_stopped(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the loop to stop on its own and take the brain back.
    ///
    /// Blocks until the game ends or the switch trips; see [`Self::shutdown`]
    /// to stop it first.
    pub fn join(mut self) -> Option<Brain> {
        self.thread.take().and_then(|thread| thread.join().ok())
    }

    /// Kill the loop, wait for it, and take the brain back.
    pub fn shutdown(self) -> Option<Brain> {
        self.kill();
        self.join()
    }
}

impl Drop for BrainHandle {
    fn drop(&mut self) {
        self.kill.kill();
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Start `brain` on a dedicated thread. Requests are sent to `outbound`.
///
/// # Errors
///
/// Returns [`BrainError::Spawn`] if the runtime or thread cannot be created.
pub fn spawn(
    brain: Brain,
    outbound: mpsc::UnboundedSender<Request>,
) -> Result<BrainHandle, BrainError> {
    let seat = brain.me();
    let pacing = Duration::from_millis(brain.config().pacing_ms);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(brain.status());
    let kill = Arc::new(KillSwitch::new());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|source| BrainError::Spawn { source })?;
    let loop_kill = Arc::clone(&kill);
    let thread = std::thread::Builder::new()
        .name(format!("settler-brain-{}", seat.index()))
        .spawn(move || {
            runtime.block_on(run_loop(
                brain, events_rx, outbound, status_tx, loop_kill, pacing,
            ))
        })
        .map_err(|source| BrainError::Spawn { source })?;

    info!(seat = %seat, pacing_ms = pacing.as_millis(), "brain started");
    Ok(BrainHandle {
        seat,
        events: events_tx,
        status: status_rx,
        kill,
        thread: Some(thread),
    })
}

async fn run_loop(
    mut brain: Brain,
    mut events: mpsc::UnboundedReceiver<GameEvent>,
    outbound: mpsc::UnboundedSender<Request>,
    status: watch::Sender<BrainStatus>,
    kill: Arc<KillSwitch>,
    pacing: Duration,
) -> Brain {
    let seat = brain.me();
    'events: loop {
        let event = tokio::select! {
            biased;
            () = kill.killed() => {
                info!(seat = %seat, "brain killed");
                break;
            }
            event = events.recv() => match event {
                Some(event) => event,
                None => {
                    debug!(seat = %seat, "event queue closed");
                    break;
                }
            },
        };

        let requests = brain.step(&event);
        status.send_replace(brain.status());

        for request in requests {
            if !pacing.is_zero() {
                tokio::select! {
                    biased;
                    () = kill.killed() => {
                        info!(seat = %seat, "brain killed while pacing");
                        break 'events;
                    }
                    () = tokio::time::sleep(pacing) => {}
                }
            }
            if outbound.send(request).is_err() {
                warn!(seat = %seat, "request queue closed, stopping");
                break 'events;
            }
        }

        if brain.is_finished() {
            info!(seat = %seat, turns = brain.turns_ended(), "game finished");
            break;
        }
    }
    brain
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use settler_board::Layout;
    use settler_types::{GameId, GamePhase, SeatKind};

    use super::*;
    use crate::config::BrainConfig;

    const ME: PlayerNumber = PlayerNumber(0);

    fn opening_events() -> Vec<GameEvent> {
        vec![
            GameEvent::GameStarted {
                game: GameId::new(),
                seats: BTreeMap::from([(ME, SeatKind::Robot), (PlayerNumber(1), SeatKind::Human)]),
            },
            GameEvent::StateChanged {
                phase: GamePhase::RollOrCard,
            },
            GameEvent::TurnChanged { player: ME },
        ]
    }

    fn brain(pacing_ms: u64) -> Brain {
        let config = BrainConfig {
            pacing_ms,
            ..BrainConfig::default()
        };
        Brain::new(ME, Layout::standard(5).unwrap(), config)
    }

    #[test]
    fn kill_is_idempotent() {
        let switch = KillSwitch::new();
        assert!(!switch.is_killed());
        assert!(switch.kill());
        assert!(!switch.kill());
        assert!(switch.is_killed());
    }

    #[tokio::test]
    async fn killed_wakes_a_waiter_from_another_thread() {
        let switch = Arc::new(KillSwitch::new());
        let remote = Arc::clone(&switch);
        let killer = std::thread::spawn(move || remote.kill());
        tokio::time::timeout(Duration::from_secs(5), switch.killed())
            .await
            .unwrap();
        assert!(killer.join().unwrap());
    }

    #[test]
    fn spawned_brain_answers_and_hands_back_state() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn(brain(0), tx).unwrap();
        for event in opening_events() {
            assert!(handle.send(event));
        }
        assert_eq!(rx.blocking_recv(), Some(Request::RollDice));

        let brain = handle.shutdown().unwrap();
        assert_eq!(
            brain.pending().map(|p| p.request.kind()),
            Some(settler_types::RequestKind::RollDice)
        );
    }

    #[test]
    fn kill_interrupts_the_pacing_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn(brain(60_000), tx).unwrap();
        for event in opening_events() {
            handle.send(event);
        }
        let switch = handle.kill_switch();
        assert!(switch.kill());
        assert!(!handle.kill());
        assert!(handle.join().is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropping_the_handle_stops_the_thread() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = spawn(brain(0), tx).unwrap();
        let switch = handle.kill_switch();
        drop(handle);
        assert!(switch.is_killed());
    }
}
