//! Drive a real brain thread through its opening placement.
//!
//! The brain is spawned exactly as a game host would run it, fed a
//! one-seat opening, and asked for its settlement and road. A brain that
//! answers proves the board, strategy, and runner fit together.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use settler_board::Layout;
use settler_core::{Brain, BrainConfig, BrainHandle, BrainStatus};
use settler_types::{GameEvent, GameId, GamePhase, Piece, PieceKey, PlayerNumber, Request, SeatKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::AnalyzeError;

const SEAT: PlayerNumber = PlayerNumber(0);
const RIVAL: PlayerNumber = PlayerNumber(1);

/// What the brain chose for its first opening round.
#[derive(Debug, Clone, Serialize)]
pub struct OpeningRun {
    /// The settlement it put down.
    pub settlement: PieceKey,
    /// The road next to it.
    pub road: PieceKey,
    /// Its status once the road was requested.
    pub status: BrainStatus,
}

/// Spawn a brain on `layout` and collect its first opening placement.
///
/// # Errors
///
/// Returns [`AnalyzeError::Brain`] if the brain thread cannot start,
/// [`AnalyzeError::Stopped`] if its loop exits early, or
/// [`AnalyzeError::NoAnswer`] if it does not place within `wait`.
pub async fn opening_run(
    layout: Layout,
    config: BrainConfig,
    wait: Duration,
) -> Result<OpeningRun, AnalyzeError> {
    let (outbound, mut requests) = mpsc::unbounded_channel();
    let handle = settler_core::spawn(Brain::new(SEAT, layout, config), outbound)?;

    feed(
        &handle,
        GameEvent::GameStarted {
            game: GameId::new(),
            seats: BTreeMap::from([(SEAT, SeatKind::Robot), (RIVAL, SeatKind::Human)]),
        },
    )?;
    feed(
        &handle,
        GameEvent::StateChanged {
            phase: GamePhase::OpeningSettlement { round: 1 },
        },
    )?;
    feed(&handle, GameEvent::TurnChanged { player: SEAT })?;
    let settlement = next_placement(&mut requests, wait, "opening settlement").await?;
    info!(?settlement, "brain placed its opening settlement");

    feed(
        &handle,
        GameEvent::PiecePlaced {
            piece: Piece {
                owner: SEAT,
                key: settlement,
            },
        },
    )?;
    feed(
        &handle,
        GameEvent::StateChanged {
            phase: GamePhase::OpeningRoad { round: 1 },
        },
    )?;
    let road = next_placement(&mut requests, wait, "opening road").await?;
    info!(?road, "brain placed its opening road");

    let status = handle.status();

    // Joining blocks until the brain thread exits.
    tokio::task::spawn_blocking(move || handle.shutdown())
        .await
        .map_err(|e| AnalyzeError::Join {
            reason: e.to_string(),
        })?;

    Ok(OpeningRun {
        settlement,
        road,
        status,
    })
}

fn feed(handle: &BrainHandle, event: GameEvent) -> Result<(), AnalyzeError> {
    let label = event.label();
    if handle.send(event) {
        return Ok(());
    }
    warn!(seat = %handle.seat(), event = label, "brain loop stopped before the event");
    Err(AnalyzeError::Stopped { event: label })
}

async fn next_placement(
    requests: &mut mpsc::UnboundedReceiver<Request>,
    wait: Duration,
    expected: &'static str,
) -> Result<PieceKey, AnalyzeError> {
    let found = tokio::time::timeout(wait, async {
        while let Some(request) = requests.recv().await {
            if let Request::PutPiece { piece } = request {
                return Some(piece);
            }
            debug!(?request, "skipping request");
        }
        None
    })
    .await;

    found.ok().flatten().ok_or_else(|| AnalyzeError::NoAnswer {
        expected,
        waited_ms: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn brain_places_settlement_then_adjacent_road() {
        let layout = Layout::standard(3).unwrap();
        let run = opening_run(layout.clone(), BrainConfig::default(), Duration::from_secs(5))
            .await
            .unwrap();

        let PieceKey::Settlement(node) = run.settlement else {
            panic!("Expected a settlement, got {:?}", run.settlement);
        };
        let PieceKey::Road(edge) = run.road else {
            panic!("Expected a road, got {:?}", run.road);
        };
        let ends = layout.edge(edge).unwrap().ends;
        assert!(ends.0 == node || ends.1 == node);
        assert_eq!(run.status.seat, SEAT);
    }

    #[tokio::test]
    async fn feeding_a_stopped_brain_is_an_error() {
        let (outbound, _requests) = mpsc::unbounded_channel();
        let brain = Brain::new(SEAT, Layout::standard(3).unwrap(), BrainConfig::default());
        let handle = settler_core::spawn(brain, outbound).unwrap();
        assert!(feed(&handle, GameEvent::Pulse).is_ok());

        handle.kill();
        while !handle.is_stopped() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let err = feed(&handle, GameEvent::Pulse).unwrap_err();
        assert!(matches!(err, AnalyzeError::Stopped { event: "pulse" }));
    }
}
