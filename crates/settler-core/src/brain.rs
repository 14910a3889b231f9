//! The per-seat agent brain.
//!
//! A [`Brain`] consumes engine events one at a time through [`Brain::step`]
//! and returns the requests to send in answer. It owns the board mirror, the
//! tracker, the build plan, and the negotiator for one seat in one game, and
//! nothing else touches them.
//!
//! # Turn lifecycle
//!
//! `Idle` on other players' turns, then `RollOrAct`, optionally `Discard`,
//! `RelocateHazard` and `ChooseVictim` after a seven, then `MainPhase`
//! (plan, trade, build, await placement) until nothing is left to do, then
//! `EndTurn`. Opening placements run in `Opening` before normal play.
//!
//! Every confirmed request sets exactly one [`Pending`] expectation. While
//! one is set the brain only listens: offers addressed to us are rejected,
//! pulses advance the stall counters. A denial clears it and counts against
//! the turn; past the configured bound the turn is ended.

use std::fmt;

use settler_board::{Board, Layout};
use settler_strategy::planner::feasible;
use settler_strategy::{
    BuildPlan, CardStrategy, DiscardStrategy, KeepPlanDiscard, LeaderRobber, Negotiator,
    OfferResponse, OpeningStrategy, PlanContext, PlanDrivenCards, ProductionOpening,
    PulseOutcome, RobberStrategy, TradeContext, Tracker, recompute,
};
use settler_types::{
    CardEvent, CardType, GameEvent, GamePhase, NodeId, Piece, PieceKey, PieceType, PlayerNumber,
    Request, RequestKind, Resource, TradeOffer,
};
use tracing::{debug, info, warn};

use crate::config::BrainConfig;
use crate::error::BrainError;
use crate::expectation::{Expectation, MachineState, Pending, placed_in};
use crate::history::{Direction, History};
use crate::mirror::{BoardChange, GameMirror};
use crate::status::{BrainSnapshot, BrainStatus, SpareCopy, TurnState};

// ---------------------------------------------------------------------------
// Strategy seams
// ---------------------------------------------------------------------------

/// The pluggable decision components a brain delegates to.
pub struct Strategies {
    /// Opening settlement and road choice.
    pub opening: Box<dyn OpeningStrategy + Send>,
    /// Robber hex and victim choice.
    pub robber: Box<dyn RobberStrategy + Send>,
    /// Which cards to give up after a seven.
    pub discard: Box<dyn DiscardStrategy + Send>,
    /// Development card play and picks.
    pub cards: Box<dyn CardStrategy + Send>,
}

impl Default for Strategies {
    fn default() -> Self {
        Self {
            opening: Box::new(ProductionOpening),
            robber: Box::new(LeaderRobber),
            discard: Box::new(KeepPlanDiscard),
            cards: Box::new(PlanDrivenCards),
        }
    }
}

impl fmt::Debug for Strategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategies").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Brain
// ---------------------------------------------------------------------------

/// One agent's decision loop state for one game.
#[derive(Debug)]
pub struct Brain {
    me: PlayerNumber,
    config: BrainConfig,
    strategies: Strategies,
    mirror: GameMirror,
    tracker: Tracker,
    negotiator: Negotiator,
    plan: BuildPlan,
    state: MachineState,
    pending: Option<Pending>,
    turn: TurnState,
    opening_denials: u32,
    opening_settlement: Option<NodeId>,
    pulse: u64,
    turns_ended: u64,
    history: History,
}

impl Brain {
    /// A brain for seat `me` on `layout`, with the default strategies.
    pub fn new(me: PlayerNumber, layout: Layout, config: BrainConfig) -> Self {
        Self::with_strategies(me, layout, config, Strategies::default())
    }

    /// A brain with custom strategy components.
    pub fn with_strategies(
        me: PlayerNumber,
        layout: Layout,
        config: BrainConfig,
        strategies: Strategies,
    ) -> Self {
        let tracker = Tracker::new(&config.strategy, [me]);
        let negotiator = Negotiator::new(&config.strategy);
        let history = History::new(config.history_len);
        Self {
            me,
            strategies,
            mirror: GameMirror::new(me, layout),
            tracker,
            negotiator,
            plan: BuildPlan::new(),
            state: MachineState::Idle,
            pending: None,
            turn: TurnState::default(),
            opening_denials: 0,
            opening_settlement: None,
            pulse: 0,
            turns_ended: 0,
            history,
            config,
        }
    }

    /// Rebuild a brain from a snapshot, with the default strategies.
    pub fn restore(snapshot: BrainSnapshot) -> Self {
        Self::restore_with(snapshot, Strategies::default())
    }

    /// Rebuild a brain from a snapshot with custom strategy components.
    pub fn restore_with(snapshot: BrainSnapshot, strategies: Strategies) -> Self {
        let BrainSnapshot {
            me,
            config,
            mirror,
            tracker,
            negotiator,
            plan,
            state,
            pending,
            turn,
            opening_denials,
            opening_settlement,
            pulse,
            turns_ended,
            history,
        } = snapshot;
        Self {
            me,
            config,
            strategies,
            mirror,
            tracker,
            negotiator,
            plan,
            state,
            pending,
            turn,
            opening_denials,
            opening_settlement,
            pulse,
            turns_ended,
            history,
        }
    }

    /// Everything needed to rebuild this brain later.
    pub fn snapshot(&self) -> BrainSnapshot {
        BrainSnapshot {
            me: self.me,
            config: self.config.clone(),
            mirror: self.mirror.clone(),
            tracker: self.tracker.clone(),
            negotiator: self.negotiator.clone(),
            plan: self.plan.clone(),
            state: self.state,
            pending: self.pending.clone(),
            turn: self.turn.clone(),
            opening_denials: self.opening_denials,
            opening_settlement: self.opening_settlement,
            pulse: self.pulse,
            turns_ended: self.turns_ended,
            history: self.history.clone(),
        }
    }

    /// Diagnostic dump of the machine state.
    pub fn status(&self) -> BrainStatus {
        BrainStatus {
            seat: self.me,
            state: self.state,
            phase: self.mirror.phase(),
            current: self.mirror.current(),
            expectation: self.pending.as_ref().map(|p| p.expectation.clone()),
            pending_request: self.pending.as_ref().map(|p| p.request.kind()),
            pulse: self.pulse,
            turn_pulses: self.turn.pulses,
            denials: self.turn.denials,
            faults: self.turn.faults,
            opening_denials: self.opening_denials,
            plan: self.plan.iter().map(|s| s.key).collect(),
            offer_outstanding: self.negotiator.outstanding().is_some(),
            turns_ended: self.turns_ended,
            history: self.history.entries().cloned().collect(),
        }
    }

    /// Our seat.
    pub const fn me(&self) -> PlayerNumber {
        self.me
    }

    /// The configuration this brain runs with.
    pub const fn config(&self) -> &BrainConfig {
        &self.config
    }

    /// Current machine state.
    pub const fn state(&self) -> MachineState {
        self.state
    }

    /// The request awaiting confirmation, if any.
    pub const fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }

    /// The current build plan.
    pub const fn plan(&self) -> &BuildPlan {
        &self.plan
    }

    /// Per-player projections.
    pub const fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Trade state and beliefs.
    pub const fn negotiator(&self) -> &Negotiator {
        &self.negotiator
    }

    /// The local copy of the game.
    pub const fn mirror(&self) -> &GameMirror {
        &self.mirror
    }

    /// Whether the game is over for this brain.
    pub fn is_finished(&self) -> bool {
        self.state == MachineState::Finished
    }

    /// Turns this brain has ended so far.
    pub const fn turns_ended(&self) -> u64 {
        self.turns_ended
    }

    // -------------------------------------------------------------------
    // Event loop body
    // -------------------------------------------------------------------

    /// Process one engine event and return the requests to send.
    ///
    /// Never fails: an error while handling the event is logged and counted
    /// as a fault against the turn. Past the fault bound on our own turn the
    /// turn is ended.
    pub fn step(&mut self, event: &GameEvent) -> Vec<Request> {
        let mut out = Vec::new();
        if !matches!(event, GameEvent::Pulse) {
            self.history
                .record(self.pulse, Direction::Inbound, event.label());
        }

        if let Err(err) = self.handle(event, &mut out) {
            self.turn.faults = self.turn.faults.saturating_add(1);
            warn!(
                seat = %self.me,
                event = event.label(),
                faults = self.turn.faults,
                error = %err,
                "fault while handling event"
            );
            self.history
                .record(self.pulse, Direction::Fault, err.to_string());
            if self.mirror.is_our_turn()
                && !self.mirror.phase().is_opening()
                && self.turn.faults > self.config.max_faults_per_turn
                && !self.is_finished()
            {
                self.pending = None;
                self.end_turn(&mut out);
            }
        }
        out
    }

    fn handle(&mut self, event: &GameEvent, out: &mut Vec<Request>) -> Result<(), BrainError> {
        match event {
            GameEvent::Pulse => self.on_pulse(out),
            GameEvent::RequestDenied { request, reason } => self.on_denied(*request, reason)?,
            _ => {
                let change = self.mirror.apply(event)?;
                self.update_tracker(event, change);
                self.settle_pending(event);
                self.react(event, out);
            }
        }
        if self.pending.is_none() && !self.is_finished() {
            self.act(out)?;
        }
        Ok(())
    }

    fn update_tracker(&mut self, event: &GameEvent, change: BoardChange) {
        match change {
            BoardChange::Placed(piece) => self.tracker.on_piece_placed(self.mirror.board(), piece),
            BoardChange::RobberMoved => self.tracker.on_robber_moved(self.mirror.board()),
            // The overridden piece may have fed any player's projection.
            BoardChange::Replaced { .. } => self.tracker.rebuild_all(self.mirror.board()),
            BoardChange::Confirmed(_) | BoardChange::None => {}
        }
        match event {
            GameEvent::GameStarted { seats, .. } => {
                let players = seats.keys().copied().chain([self.me]);
                self.tracker = Tracker::new(&self.config.strategy, players);
                self.tracker.rebuild_all(self.mirror.board());
            }
            GameEvent::VictoryPoints { player, points } => {
                self.tracker.set_score(*player, *points);
            }
            GameEvent::TurnChanged { .. } => {
                self.mirror.new_turn();
                self.tracker.new_turn(self.mirror.board());
            }
            _ => {}
        }
    }

    /// Clear the pending expectation if `event` confirms it.
    fn settle_pending(&mut self, event: &GameEvent) {
        let me = self.me;
        let Some(done) = self
            .pending
            .take_if(|p| p.expectation.is_met_by(event, me))
        else {
            return;
        };
        debug!(seat = %me, request = done.request.kind().label(), "request confirmed");
        self.note_spare_copy(&done);
        if done.expectation.precedes_phase_change() && self.mirror.phase() == done.phase {
            self.turn.stale_phase = Some(done.phase);
        }
        match done.expectation {
            Expectation::Placement { piece } => {
                if self.plan.lead().is_some_and(|lead| lead.key == piece) {
                    self.plan.pop_lead();
                }
            }
            Expectation::CardBought => {
                if self.plan.lead().is_some_and(|lead| lead.key == PieceKey::DevCard) {
                    self.plan.pop_lead();
                }
            }
            Expectation::Discarded => self.turn.discard_owed = 0,
            Expectation::VictimRobbed => self.turn.rob_candidates = None,
            _ => {}
        }
    }

    fn react(&mut self, event: &GameEvent, out: &mut Vec<Request>) {
        let me = self.me;
        match event {
            GameEvent::GameStarted { .. } => {
                self.negotiator = Negotiator::new(&self.config.strategy);
                self.plan.clear();
                self.opening_denials = 0;
                self.state = MachineState::Idle;
            }
            GameEvent::TurnChanged { player } => self.on_turn_changed(*player),
            GameEvent::GameOver { winner } => {
                self.pending = None;
                self.state = MachineState::Finished;
                info!(seat = %me, winner = ?winner, turns = self.turns_ended, "game over");
            }
            GameEvent::TradeOfferAnnounced { offer } => self.on_offer(offer, out),
            GameEvent::TradeRejected { player } => {
                if self.negotiator.on_reject(*player) {
                    debug!(seat = %me, "every recipient rejected our offer");
                    self.pending
                        .take_if(|p| p.expectation == Expectation::TradeAnswer);
                }
            }
            GameEvent::TradeAccepted { offerer, accepter } => {
                self.negotiator.on_accept(*offerer, *accepter);
            }
            GameEvent::TradeCleared { player } if *player == me => {
                self.negotiator.clear_outstanding();
            }
            GameEvent::DiscardRequired { count } => self.turn.discard_owed = *count,
            GameEvent::RobChoice { candidates } => {
                self.turn.rob_candidates = Some(candidates.clone());
            }
            GameEvent::DiceResult { player, .. } if *player == me => self.turn.rolled = true,
            GameEvent::StateChanged { phase } => {
                self.turn.stale_phase = None;
                if *phase == GamePhase::RollOrCard && self.mirror.is_our_turn() {
                    self.turn.rolled = false;
                }
            }
            GameEvent::CardAction {
                player,
                action: CardEvent::Rejected(card),
            } if *player == me => {
                self.turn.card_played = true;
                self.pending.take_if(
                    |p| matches!(p.expectation, Expectation::CardPlayed { card: c } if c == *card),
                );
            }
            _ => {}
        }
    }

    fn on_turn_changed(&mut self, player: PlayerNumber) {
        let number = self.turn.number.saturating_add(1);
        self.turn = TurnState {
            number,
            spare_copy: self.turn.spare_copy.take(),
            ..TurnState::default()
        };
        self.pending = None;
        self.plan.clear();
        self.negotiator.new_turn();
        self.state = if player != self.me {
            MachineState::Idle
        } else if self.mirror.phase().is_opening() {
            MachineState::Opening
        } else {
            MachineState::RollOrAct
        };
        info!(seat = %self.me, turn = number, player = %player, "turn changed");
    }

    fn on_offer(&mut self, offer: &TradeOffer, out: &mut Vec<Request>) {
        if offer.from == self.me || !offer.is_offered_to(self.me) {
            return;
        }
        if !self.config.trading {
            self.notify(Request::RejectTrade, out);
            return;
        }
        // Our own offer may be replaced; any other wait blocks trading.
        let busy = self
            .pending
            .as_ref()
            .is_some_and(|p| p.expectation != Expectation::TradeAnswer);
        if busy {
            self.negotiator.note_offer(offer);
            debug!(seat = %self.me, from = %offer.from, "busy, rejecting offer");
            self.notify(Request::RejectTrade, out);
            return;
        }

        self.ensure_plan();
        let seats = self.mirror.seats();
        let may_hold = self.mirror.may_hold();
        let ports = self.mirror.board().port_ratios(self.me);
        let ctx = TradeContext {
            me: self.me,
            hand: self.mirror.our_hand(),
            plan: &self.plan,
            seats: &seats,
            may_hold: &may_hold,
            ports: &ports,
            pulse: self.pulse,
        };
        let response = self.negotiator.evaluate_offer(offer, &ctx);
        debug!(seat = %self.me, from = %offer.from, response = ?response, "answering offer");

        match response {
            OfferResponse::Ignore => {}
            OfferResponse::Reject => self.notify(Request::RejectTrade, out),
            OfferResponse::Accept => {
                self.pending = None;
                if self.negotiator.outstanding().is_some() {
                    self.negotiator.clear_outstanding();
                    self.notify(Request::ClearOffer, out);
                }
                self.issue(
                    Request::AcceptTrade {
                        offerer: offer.from,
                    },
                    Expectation::TradeDone {
                        offerer: offer.from,
                    },
                    out,
                );
            }
            OfferResponse::Counter(counter) | OfferResponse::Complete(counter) => {
                self.pending = None;
                self.issue(
                    Request::OfferTrade { offer: counter },
                    Expectation::TradeAnswer,
                    out,
                );
            }
        }
    }

    fn on_denied(&mut self, kind: RequestKind, reason: &str) -> Result<(), BrainError> {
        let (pulse, window) = (self.pulse, self.config.stall_resend_pulses);
        if self
            .turn
            .spare_copy
            .take_if(|c| c.answers(kind, pulse, window))
            .is_some()
        {
            debug!(seat = %self.me, request = kind.label(), reason, "denial for the spare copy of a resent request");
            return Ok(());
        }
        let Some(denied) = self.pending.take_if(|p| p.request.kind() == kind) else {
            debug!(seat = %self.me, request = kind.label(), "denial for a request not pending");
            return Ok(());
        };
        self.note_spare_copy(&denied);
        self.turn.denials = self.turn.denials.saturating_add(1);
        if self.mirror.phase().is_opening() {
            self.opening_denials = self.opening_denials.saturating_add(1);
        }
        warn!(
            seat = %self.me,
            request = kind.label(),
            reason,
            denials = self.turn.denials,
            "request denied"
        );

        match denied.request {
            Request::PutPiece { piece: key } => {
                self.turn.denied.insert(key);
                self.plan.clear();
                let piece = Piece {
                    owner: self.me,
                    key,
                };
                self.tracker
                    .on_piece_retracted(self.mirror.board_mut(), piece)?;
            }
            Request::BuildRequest { .. } | Request::BuyCard => {
                if let Some(lead) = self.plan.lead() {
                    self.turn.denied.insert(lead.key);
                }
                self.plan.clear();
            }
            Request::PlayCard { .. } => self.turn.card_played = true,
            Request::OfferTrade { .. } => self.negotiator.clear_outstanding(),
            Request::BankTrade { .. } => self.turn.bank_denied = true,
            // The engine asks again if it still wants cards.
            Request::Discard { .. } => self.turn.discard_owed = 0,
            Request::ChoosePlayer { .. } => self.turn.rob_candidates = None,
            _ => {}
        }
        Ok(())
    }

    /// Remember that a settled request had a second copy in flight.
    fn note_spare_copy(&mut self, settled: &Pending) {
        if settled.resent {
            self.turn.spare_copy = Some(SpareCopy {
                kind: settled.request.kind(),
                since: self.pulse,
            });
        }
    }

    fn on_pulse(&mut self, out: &mut Vec<Request>) {
        self.pulse = self.pulse.saturating_add(1);
        self.turn.pulses = self.turn.pulses.saturating_add(1);
        if self.is_finished() {
            return;
        }
        if self.turn.pulses > self.config.abandon_after_pulses {
            warn!(seat = %self.me, pulses = self.turn.pulses, "turn never progressed, leaving game");
            self.leave_game(out);
            return;
        }

        let seats = self.mirror.seats();
        if let PulseOutcome::Expired { silent } = self.negotiator.on_pulse(self.pulse, &seats) {
            debug!(seat = %self.me, silent = silent.len(), "withdrawing unanswered offer");
            self.pending
                .take_if(|p| p.expectation == Expectation::TradeAnswer);
            self.notify(Request::ClearOffer, out);
        }

        let stall = self.config.stall_resend_pulses;
        let pulse = self.pulse;
        let resend = self.pending.as_mut().and_then(|p| {
            let stalled = !p.resent
                && p.expectation != Expectation::TradeAnswer
                && p.waited(pulse) >= stall;
            stalled.then(|| {
                p.resent = true;
                p.request.clone()
            })
        });
        if let Some(request) = resend {
            info!(seat = %self.me, request = request.kind().label(), "request stalled, sending again");
            self.history
                .record(self.pulse, Direction::Outbound, request.kind().label());
            out.push(request);
        }
    }

    // -------------------------------------------------------------------
    // Acting
    // -------------------------------------------------------------------

    fn act(&mut self, out: &mut Vec<Request>) -> Result<(), BrainError> {
        if self.turn.discard_owed > 0 {
            self.act_discard(out);
            return Ok(());
        }
        if !self.mirror.is_our_turn() {
            self.state = MachineState::Idle;
            return Ok(());
        }
        let phase = self.mirror.phase();
        if self.turn.ended || self.turn.stale_phase == Some(phase) {
            return Ok(());
        }
        if phase.is_opening() {
            return self.act_opening(phase, out);
        }
        if self.turn.denials > self.config.max_denials_per_turn {
            warn!(seat = %self.me, denials = self.turn.denials, "too many denials, ending turn");
            self.end_turn(out);
            return Ok(());
        }

        match phase {
            GamePhase::RollOrCard => self.act_roll(out),
            GamePhase::PlacingRobber => self.act_robber(out),
            GamePhase::WaitingForRobChoice => self.act_victim(out),
            GamePhase::WaitingForDiscovery => self.act_discovery(out),
            GamePhase::WaitingForMonopoly => self.act_monopoly(out),
            GamePhase::Main => self.act_main(out),
            GamePhase::PlacingRoad
            | GamePhase::PlacingSettlement
            | GamePhase::PlacingCity
            | GamePhase::PlacingShip
            | GamePhase::PlacingFreeRoad { .. } => {
                if let Some(piece) = placed_in(phase) {
                    self.act_place(piece, out)?;
                }
            }
            GamePhase::NewGame
            | GamePhase::OpeningSettlement { .. }
            | GamePhase::OpeningRoad { .. }
            | GamePhase::WaitingForDiscards
            | GamePhase::Over => {}
        }
        Ok(())
    }

    fn act_opening(&mut self, phase: GamePhase, out: &mut Vec<Request>) -> Result<(), BrainError> {
        self.state = MachineState::Opening;
        if self.opening_denials > self.config.max_opening_denials {
            warn!(seat = %self.me, denials = self.opening_denials, "opening placements keep failing, leaving game");
            self.leave_game(out);
            return Ok(());
        }
        let key = match phase {
            GamePhase::OpeningSettlement { .. } => self
                .strategies
                .opening
                .choose_settlement(self.mirror.board(), self.me, &self.turn.denied)
                .map(|node| {
                    self.opening_settlement = Some(node);
                    PieceKey::Settlement(node)
                }),
            GamePhase::OpeningRoad { .. } => {
                let settlement = self
                    .opening_settlement
                    .or_else(|| self.mirror.board().settlements_of(self.me).last().copied());
                settlement.and_then(|node| {
                    self.strategies
                        .opening
                        .choose_road(self.mirror.board(), self.me, node, &self.turn.denied)
                        .map(PieceKey::Road)
                })
            }
            _ => return Ok(()),
        };
        match key {
            Some(key) => self.put_piece(key, out)?,
            None => {
                warn!(seat = %self.me, phase = ?phase, "no legal opening placement");
                self.leave_game(out);
            }
        }
        Ok(())
    }

    fn act_roll(&mut self, out: &mut Vec<Request>) {
        self.state = MachineState::RollOrAct;
        if self.turn.rolled {
            return;
        }
        if !self.turn.card_played
            && self.mirror.can_play(CardType::Knight)
            && self
                .strategies
                .cards
                .knight_before_roll(self.mirror.board(), self.me)
        {
            self.play_card(CardType::Knight, out);
            return;
        }
        self.issue(Request::RollDice, Expectation::Dice, out);
    }

    fn act_discard(&mut self, out: &mut Vec<Request>) {
        self.state = MachineState::Discard;
        self.ensure_plan();
        let keep = self.plan.lead_cost();
        let resources = self.strategies.discard.choose_discard(
            self.mirror.our_hand(),
            self.turn.discard_owed,
            &keep,
        );
        info!(seat = %self.me, count = self.turn.discard_owed, cards = %resources, "discarding");
        self.issue(Request::Discard { resources }, Expectation::Discarded, out);
    }

    fn act_robber(&mut self, out: &mut Vec<Request>) {
        self.state = MachineState::RelocateHazard;
        let scores = self.mirror.scores();
        match self
            .strategies
            .robber
            .choose_hex(self.mirror.board(), self.me, &scores)
        {
            Some(hex) => self.issue(Request::MoveRobber { hex }, Expectation::RobberMoved, out),
            None => {
                warn!(seat = %self.me, "nowhere to move the robber");
                self.end_turn(out);
            }
        }
    }

    fn act_victim(&mut self, out: &mut Vec<Request>) {
        self.state = MachineState::ChooseVictim;
        let Some(candidates) = &self.turn.rob_candidates else {
            return;
        };
        let victim = self.strategies.robber.choose_victim(
            self.me,
            candidates,
            &self.mirror.scores(),
            &self.mirror.hand_sizes(),
        );
        if let Some(target) = victim {
            self.issue(Request::ChoosePlayer { target }, Expectation::VictimRobbed, out);
        }
    }

    fn act_discovery(&mut self, out: &mut Vec<Request>) {
        self.state = MachineState::CardPick;
        self.ensure_plan();
        let board = self.mirror.board();
        let table = recompute(&board.contacts(self.me), board.robber());
        let resources = self
            .strategies
            .cards
            .choose_discovery(self.mirror.our_hand(), &self.plan, &table);
        self.issue(
            Request::PickResources { resources },
            Expectation::PicksApplied,
            out,
        );
    }

    fn act_monopoly(&mut self, out: &mut Vec<Request>) {
        self.state = MachineState::CardPick;
        self.ensure_plan();
        let resource = self
            .monopoly_choice()
            .or_else(|| self.plan.lead_cost().kinds().next())
            .unwrap_or(Resource::Wheat);
        self.issue(
            Request::PickMonopoly { resource },
            Expectation::PicksApplied,
            out,
        );
    }

    fn monopoly_choice(&self) -> Option<Resource> {
        self.strategies.cards.choose_monopoly(
            self.me,
            &self.mirror.known_hands(),
            self.mirror.our_hand(),
            &self.plan,
        )
    }

    fn act_place(&mut self, piece: PieceType, out: &mut Vec<Request>) -> Result<(), BrainError> {
        self.state = MachineState::MainPhase;
        match self.placement_for(piece) {
            Some(key) => self.put_piece(key, out)?,
            None => {
                warn!(seat = %self.me, piece = ?piece, "nowhere to place, ending turn");
                self.end_turn(out);
            }
        }
        Ok(())
    }

    /// Where to put a paid-for piece: the plan's lead if it fits, else the
    /// quickest legal candidate of that type.
    fn placement_for(&self, piece: PieceType) -> Option<PieceKey> {
        let board = self.mirror.board();
        let usable = |key: PieceKey| !self.turn.denied.contains(&key) && is_legal(board, self.me, key);

        if let Some(lead) = self.plan.lead() {
            if lead.piece_type() == piece && usable(lead.key) {
                return Some(lead.key);
            }
            let first_road = lead.roads_needed.first().map(|e| PieceKey::Road(*e));
            if let Some(road) = first_road.filter(|_| piece == PieceType::Road) {
                if usable(road) {
                    return Some(road);
                }
            }
        }
        self.tracker
            .possible_pieces(self.me)
            .iter()
            .filter(|c| c.piece_type() == piece && c.roads_needed.is_empty())
            .filter(|c| usable(c.key))
            .min_by_key(|c| (c.eta, c.key))
            .map(|c| c.key)
    }

    fn act_main(&mut self, out: &mut Vec<Request>) {
        self.state = MachineState::MainPhase;
        if !self.turn.rolled {
            return;
        }
        self.ensure_plan();
        if self.try_play_card(out) {
            return;
        }
        let Some(lead) = self.plan.lead() else {
            debug!(seat = %self.me, "nothing worth building");
            self.end_turn(out);
            return;
        };
        let lead_key = lead.key;
        let lead_type = lead.piece_type();

        if self.mirror.our_hand().contains(&self.plan.lead_cost()) {
            info!(seat = %self.me, piece = %lead_key, "building plan lead");
            if lead_key == PieceKey::DevCard {
                self.issue(Request::BuyCard, Expectation::CardBought, out);
            } else {
                self.issue(
                    Request::BuildRequest { piece: lead_type },
                    Expectation::PlacingPhase { piece: lead_type },
                    out,
                );
            }
            return;
        }

        let seats = self.mirror.seats();
        let may_hold = self.mirror.may_hold();
        let ports = self.mirror.board().port_ratios(self.me);
        let ctx = TradeContext {
            me: self.me,
            hand: self.mirror.our_hand(),
            plan: &self.plan,
            seats: &seats,
            may_hold: &may_hold,
            ports: &ports,
            pulse: self.pulse,
        };
        if self.config.trading && self.negotiator.outstanding().is_none() {
            if let Some(offer) = self.negotiator.propose_offer(&ctx) {
                self.issue(Request::OfferTrade { offer }, Expectation::TradeAnswer, out);
                return;
            }
        }
        if !self.turn.bank_denied {
            if let Some(bank) = self.negotiator.propose_bank_offer(&ctx) {
                self.issue(
                    Request::BankTrade {
                        give: bank.give,
                        get: bank.get,
                    },
                    Expectation::BankTrade,
                    out,
                );
                return;
            }
        }
        self.end_turn(out);
    }

    /// Play a development card if one moves the plan forward.
    fn try_play_card(&mut self, out: &mut Vec<Request>) -> bool {
        if self.turn.card_played {
            return false;
        }
        let roads_left = self
            .mirror
            .our_supply()
            .get(&PieceType::Road)
            .copied()
            .unwrap_or(0);
        let short = !self.mirror.our_hand().contains(&self.plan.lead_cost());
        let cards = &self.strategies.cards;

        let choice = if self.mirror.can_play(CardType::RoadBuilding)
            && roads_left > 0
            && cards.wants_road_building(&self.plan)
        {
            Some(CardType::RoadBuilding)
        } else if self.mirror.can_play(CardType::Discovery) && short {
            Some(CardType::Discovery)
        } else if self.mirror.can_play(CardType::Monopoly) && self.monopoly_choice().is_some() {
            Some(CardType::Monopoly)
        } else if self.mirror.can_play(CardType::Knight)
            && cards.knight_before_roll(self.mirror.board(), self.me)
        {
            Some(CardType::Knight)
        } else {
            None
        };
        match choice {
            Some(card) => {
                self.play_card(card, out);
                true
            }
            None => false,
        }
    }

    fn play_card(&mut self, card: CardType, out: &mut Vec<Request>) {
        info!(seat = %self.me, card = ?card, "playing card");
        self.turn.card_played = true;
        self.issue(
            Request::PlayCard { card },
            Expectation::CardPlayed { card },
            out,
        );
    }

    /// Replan if there is no plan or its lead can no longer be built.
    fn ensure_plan(&mut self) {
        let supply = self.mirror.our_supply();
        let ctx = PlanContext {
            board: self.mirror.board(),
            tracker: &self.tracker,
            me: self.me,
            hand: self.mirror.our_hand(),
            supply: &supply,
            dev_cards_left: self.mirror.dev_cards_left(),
            denied: &self.turn.denied,
            config: &self.config.strategy,
        };
        if self.plan.lead().is_some_and(|lead| feasible(&ctx, lead)) {
            return;
        }
        self.plan = self.config.strategy.planner.plan(&ctx);
        debug!(
            seat = %self.me,
            steps = self.plan.len(),
            lead = ?self.plan.lead().map(|s| s.key),
            "replanned"
        );
    }

    fn put_piece(&mut self, key: PieceKey, out: &mut Vec<Request>) -> Result<(), BrainError> {
        let piece = self.mirror.pre_apply(key)?;
        self.tracker.on_piece_placed(self.mirror.board(), piece);
        self.issue(
            Request::PutPiece { piece: key },
            Expectation::Placement { piece: key },
            out,
        );
        Ok(())
    }

    // -------------------------------------------------------------------
    // Sending
    // -------------------------------------------------------------------

    /// Send a request that waits for confirmation.
    fn issue(&mut self, request: Request, expectation: Expectation, out: &mut Vec<Request>) {
        if let Some(pending) = &self.pending {
            debug!(
                seat = %self.me,
                request = request.kind().label(),
                waiting_on = pending.request.kind().label(),
                "request suppressed while another is pending"
            );
            return;
        }
        debug!(seat = %self.me, request = request.kind().label(), "sending request");
        self.history
            .record(self.pulse, Direction::Outbound, request.kind().label());
        self.pending = Some(Pending {
            expectation,
            request: request.clone(),
            phase: self.mirror.phase(),
            sent_pulse: self.pulse,
            resent: false,
        });
        out.push(request);
    }

    /// Send a request nobody waits for.
    fn notify(&mut self, request: Request, out: &mut Vec<Request>) {
        self.history
            .record(self.pulse, Direction::Outbound, request.kind().label());
        out.push(request);
    }

    fn end_turn(&mut self, out: &mut Vec<Request>) {
        if self.turn.ended {
            return;
        }
        self.turn.ended = true;
        self.state = MachineState::EndTurn;
        self.turns_ended = self.turns_ended.saturating_add(1);
        if self.negotiator.outstanding().is_some() {
            self.negotiator.clear_outstanding();
            self.notify(Request::ClearOffer, out);
        }
        self.pending = None;
        info!(
            seat = %self.me,
            turn = self.turn.number,
            denials = self.turn.denials,
            faults = self.turn.faults,
            "ending turn"
        );
        self.issue(Request::EndTurn, Expectation::TurnOver, out);
    }

    fn leave_game(&mut self, out: &mut Vec<Request>) {
        self.pending = None;
        self.state = MachineState::Finished;
        self.notify(Request::LeaveGame, out);
    }
}

fn is_legal(board: &Board, me: PlayerNumber, key: PieceKey) -> bool {
    match key {
        PieceKey::Settlement(node) => board.can_place_settlement(me, node, false),
        PieceKey::City(node) => board.can_place_city(me, node),
        PieceKey::Road(edge) => board.can_place_road(me, edge),
        PieceKey::Ship(edge) => board.can_place_ship(me, edge),
        PieceKey::DevCard => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use settler_types::{GameId, ResourceChange, ResourceSet, SeatKind};

    use super::*;

    const ME: PlayerNumber = PlayerNumber(0);
    const RIVAL: PlayerNumber = PlayerNumber(1);

    fn brain() -> Brain {
        let mut brain = Brain::new(ME, Layout::standard(11).unwrap(), BrainConfig::default());
        brain.step(&GameEvent::GameStarted {
            game: GameId::new(),
            seats: BTreeMap::from([(ME, SeatKind::Robot), (RIVAL, SeatKind::Robot)]),
        });
        brain
    }

    #[test]
    fn idle_on_other_turns() {
        let mut brain = brain();
        let out = brain.step(&GameEvent::TurnChanged { player: RIVAL });
        assert!(out.is_empty());
        assert_eq!(brain.state(), MachineState::Idle);
    }

    #[test]
    fn rolls_at_start_of_turn() {
        let mut brain = brain();
        brain.step(&GameEvent::StateChanged {
            phase: GamePhase::RollOrCard,
        });
        let out = brain.step(&GameEvent::TurnChanged { player: ME });
        assert_eq!(out, vec![Request::RollDice]);
        assert_eq!(
            brain.pending().map(|p| &p.expectation),
            Some(&Expectation::Dice)
        );
    }

    #[test]
    fn second_request_waits_for_the_first() {
        let mut brain = brain();
        brain.step(&GameEvent::StateChanged {
            phase: GamePhase::RollOrCard,
        });
        brain.step(&GameEvent::TurnChanged { player: ME });
        // Still waiting on the dice: nothing new goes out.
        let out = brain.step(&GameEvent::StateChanged {
            phase: GamePhase::RollOrCard,
        });
        assert!(out.is_empty());
    }

    #[test]
    fn owed_discard_is_paid_off_turn() {
        let mut brain = brain();
        brain.step(&GameEvent::TurnChanged { player: RIVAL });
        brain.step(&GameEvent::ResourceDelta {
            player: ME,
            change: ResourceChange::Gain(ResourceSet::single(Resource::Sheep, 8)),
        });
        let out = brain.step(&GameEvent::DiscardRequired { count: 4 });
        assert_eq!(
            out,
            vec![Request::Discard {
                resources: ResourceSet::single(Resource::Sheep, 4)
            }]
        );
        assert_eq!(brain.state(), MachineState::Discard);
    }

    #[test]
    fn offers_are_rejected_when_trading_is_off() {
        let config = BrainConfig {
            trading: false,
            ..BrainConfig::default()
        };
        let mut brain = Brain::new(ME, Layout::standard(11).unwrap(), config);
        let offer = TradeOffer::new(
            RIVAL,
            BTreeSet::from([ME]),
            ResourceSet::single(Resource::Ore, 1),
            ResourceSet::single(Resource::Wood, 1),
            0,
        );
        let out = brain.step(&GameEvent::TradeOfferAnnounced { offer });
        assert_eq!(out, vec![Request::RejectTrade]);
    }

    #[test]
    fn unknown_seat_counts_a_fault() {
        let mut brain = brain();
        brain.step(&GameEvent::VictoryPoints {
            player: PlayerNumber(7),
            points: 2,
        });
        assert_eq!(brain.status().faults, 1);
        assert!(
            brain
                .status()
                .history
                .iter()
                .any(|e| e.direction == Direction::Fault)
        );
    }
}
