//! The brain's local copy of engine-reported game facts.
//!
//! [`GameMirror`] holds the board, what each player is known to hold, piece
//! supplies, development cards, scores, seats, and the engine phase. It
//! changes only through [`GameMirror::apply`] (engine events) and
//! [`GameMirror::pre_apply`] (our own placement, speculatively, before the
//! engine confirms it). Nothing here is authoritative; the engine is.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use settler_board::{Board, Layout};
use settler_types::{
    CardEvent, CardType, GameEvent, GameId, GamePhase, Piece, PieceKey, PieceType, PlayerNumber,
    Resource, ResourceChange, ResourceSet, SeatKind, SpecialItem,
};
use tracing::{debug, trace, warn};

use crate::error::BrainError;

/// Development cards in a fresh deck.
pub const DEV_DECK_SIZE: u32 = 25;

static EMPTY_HAND: ResourceSet = ResourceSet::new();

// ---------------------------------------------------------------------------
// Per-player facts
// ---------------------------------------------------------------------------

/// What we know about one player's resource cards.
///
/// Our own hand is exact. For opponents, some cards are known by kind and
/// the rest (stolen, discarded unseen) only by count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandKnowledge {
    /// Cards known by kind.
    pub known: ResourceSet,
    /// Cards known only to exist.
    pub unknown: u32,
}

impl HandKnowledge {
    /// Total cards held.
    pub fn total(&self) -> u32 {
        self.known.total().saturating_add(self.unknown)
    }

    /// Kinds this player might hold.
    pub fn may_hold(&self) -> BTreeSet<Resource> {
        if self.unknown > 0 {
            return Resource::ALL.into_iter().collect();
        }
        self.known.kinds().collect()
    }

    /// Apply an engine-reported change. With `exact`, a loss of cards we do
    /// not hold is an error rather than a guess.
    pub fn apply(&mut self, change: &ResourceChange, exact: bool) -> Result<(), BrainError> {
        match change {
            ResourceChange::Gain(set) => self.known.add_set(set),
            ResourceChange::Lose(set) if exact => self.known.subtract_set(set)?,
            ResourceChange::Lose(set) => {
                for (resource, amount) in set.iter() {
                    let taken = self.known.take_up_to(resource, amount);
                    let rest = amount.saturating_sub(taken);
                    self.unknown = self.unknown.saturating_sub(rest);
                }
            }
            ResourceChange::GainUnknown(n) => self.unknown = self.unknown.saturating_add(*n),
            ResourceChange::LoseUnknown(n) => {
                if *n > self.unknown {
                    // Some known card went too, and we cannot tell which.
                    self.unknown = self.unknown.saturating_add(self.known.total());
                    self.known = ResourceSet::new();
                }
                self.unknown = self.unknown.saturating_sub(*n);
            }
            ResourceChange::Set(set) => {
                self.known = set.clone();
                self.unknown = 0;
            }
        }
        Ok(())
    }
}

/// Public facts about one seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerFacts {
    /// Who controls the seat.
    pub seat: SeatKind,
    /// Resource knowledge.
    pub hand: HandKnowledge,
    /// Pieces left to build, by type.
    pub supply: BTreeMap<PieceType, u32>,
    /// Public victory points.
    pub victory_points: u32,
    /// Development cards held, by count.
    pub dev_cards: u32,
    /// Knights played so far.
    pub knights_played: u32,
}

impl PlayerFacts {
    fn new(seat: SeatKind) -> Self {
        let supply = PieceType::ALL
            .into_iter()
            .filter_map(|pt| pt.supply().map(|n| (pt, n)))
            .collect();
        Self {
            seat,
            hand: HandKnowledge::default(),
            supply,
            victory_points: 0,
            dev_cards: 0,
            knights_played: 0,
        }
    }

    fn take_from_supply(&mut self, piece: PieceType) {
        if let Some(left) = self.supply.get_mut(&piece) {
            *left = left.saturating_sub(1);
        }
        // A city hands its settlement back.
        if piece == PieceType::City {
            if let Some(left) = self.supply.get_mut(&PieceType::Settlement) {
                *left = left.saturating_add(1);
            }
        }
    }
}

/// One of our development cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldCard {
    /// The card.
    pub card: CardType,
    /// Bought this turn, so not yet playable.
    pub fresh: bool,
}

/// What applying an event did to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardChange {
    /// The board did not change.
    None,
    /// A piece appeared that the mirror did not have yet.
    Placed(Piece),
    /// The engine confirmed a piece we had already pre-applied.
    Confirmed(Piece),
    /// The engine put a piece where the mirror held a different one, which
    /// was taken off first.
    Replaced {
        /// The engine's piece.
        placed: Piece,
        /// What the mirror had there.
        removed: Piece,
    },
    /// The robber moved.
    RobberMoved,
}

// ---------------------------------------------------------------------------
// Mirror
// ---------------------------------------------------------------------------

/// Everything the brain knows about the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMirror {
    me: PlayerNumber,
    game: Option<GameId>,
    board: Board,
    players: BTreeMap<PlayerNumber, PlayerFacts>,
    our_cards: Vec<HeldCard>,
    current: Option<PlayerNumber>,
    phase: GamePhase,
    dev_cards_left: u32,
    awards: BTreeMap<SpecialItem, PlayerNumber>,
    winner: Option<PlayerNumber>,
}

impl GameMirror {
    /// A mirror for seat `me` on a fresh board.
    pub fn new(me: PlayerNumber, layout: Layout) -> Self {
        Self {
            me,
            game: None,
            board: Board::new(layout),
            players: BTreeMap::from([(me, PlayerFacts::new(SeatKind::Robot))]),
            our_cards: Vec::new(),
            current: None,
            phase: GamePhase::NewGame,
            dev_cards_left: DEV_DECK_SIZE,
            awards: BTreeMap::new(),
            winner: None,
        }
    }

    /// The board mirror.
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Mutable board, for retracting denied placements.
    pub const fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Our seat.
    pub const fn me(&self) -> PlayerNumber {
        self.me
    }

    /// The game we are in, once started.
    pub const fn game(&self) -> Option<GameId> {
        self.game
    }

    /// The engine phase.
    pub const fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Whose turn it is.
    pub const fn current(&self) -> Option<PlayerNumber> {
        self.current
    }

    /// Whether it is our turn.
    pub fn is_our_turn(&self) -> bool {
        self.current == Some(self.me)
    }

    /// Development cards left in the deck.
    pub const fn dev_cards_left(&self) -> u32 {
        self.dev_cards_left
    }

    /// The winner, once the game is over.
    pub const fn winner(&self) -> Option<PlayerNumber> {
        self.winner
    }

    /// Facts about `player`.
    pub fn player(&self, player: PlayerNumber) -> Option<&PlayerFacts> {
        self.players.get(&player)
    }

    /// Every seat and its controller.
    pub fn seats(&self) -> BTreeMap<PlayerNumber, SeatKind> {
        self.players.iter().map(|(p, f)| (*p, f.seat)).collect()
    }

    /// Our exact hand.
    pub fn our_hand(&self) -> &ResourceSet {
        self.players.get(&self.me).map_or(&EMPTY_HAND, |f| &f.hand.known)
    }

    /// Our remaining pieces by type.
    pub fn our_supply(&self) -> BTreeMap<PieceType, u32> {
        self.players
            .get(&self.me)
            .map(|f| f.supply.clone())
            .unwrap_or_default()
    }

    /// Our development cards.
    pub fn our_cards(&self) -> &[HeldCard] {
        &self.our_cards
    }

    /// Whether we hold a `card` bought before this turn.
    pub fn can_play(&self, card: CardType) -> bool {
        card.is_playable() && self.our_cards.iter().any(|c| c.card == card && !c.fresh)
    }

    /// Public scores by seat.
    pub fn scores(&self) -> BTreeMap<PlayerNumber, u32> {
        self.players
            .iter()
            .map(|(p, f)| (*p, f.victory_points))
            .collect()
    }

    /// Card counts by seat.
    pub fn hand_sizes(&self) -> BTreeMap<PlayerNumber, u32> {
        self.players
            .iter()
            .map(|(p, f)| (*p, f.hand.total()))
            .collect()
    }

    /// Per opponent, the kinds they might hold.
    pub fn may_hold(&self) -> BTreeMap<PlayerNumber, BTreeSet<Resource>> {
        self.players
            .iter()
            .filter(|(p, _)| **p != self.me)
            .map(|(p, f)| (*p, f.hand.may_hold()))
            .collect()
    }

    /// Per opponent, the cards known by kind.
    pub fn known_hands(&self) -> BTreeMap<PlayerNumber, ResourceSet> {
        self.players
            .iter()
            .filter(|(p, _)| **p != self.me)
            .map(|(p, f)| (*p, f.hand.known.clone()))
            .collect()
    }

    /// Holder of a special award.
    pub fn award(&self, item: SpecialItem) -> Option<PlayerNumber> {
        self.awards.get(&item).copied()
    }

    // -------------------------------------------------------------------
    // Updates
    // -------------------------------------------------------------------

    /// Put our own piece on the board before the engine confirms it.
    pub fn pre_apply(&mut self, key: PieceKey) -> Result<Piece, BrainError> {
        let piece = Piece { owner: self.me, key };
        self.board.place(piece)?;
        trace!(seat = %self.me, piece = %key, "pre-applied placement");
        Ok(piece)
    }

    /// Cards bought last turn become playable.
    pub fn new_turn(&mut self) {
        for card in &mut self.our_cards {
            card.fresh = false;
        }
    }

    /// Apply one engine event.
    pub fn apply(&mut self, event: &GameEvent) -> Result<BoardChange, BrainError> {
        match event {
            GameEvent::GameStarted { game, seats } => {
                self.game = Some(*game);
                for (player, seat) in seats {
                    self.players
                        .entry(*player)
                        .and_modify(|f| f.seat = *seat)
                        .or_insert_with(|| PlayerFacts::new(*seat));
                }
                debug!(seat = %self.me, players = self.players.len(), "game started");
            }
            GameEvent::TurnChanged { player } => self.current = Some(*player),
            GameEvent::StateChanged { phase } => self.phase = *phase,
            GameEvent::PiecePlaced { piece } => return self.apply_piece(*piece),
            GameEvent::RobberMoved { hex } => {
                self.board.move_robber(*hex)?;
                return Ok(BoardChange::RobberMoved);
            }
            GameEvent::ResourceDelta { player, change } => self.apply_change(*player, change)?,
            GameEvent::ResourceBatch { changes } => {
                for (player, change) in changes {
                    self.apply_change(*player, change)?;
                }
            }
            GameEvent::CardAction { player, action } => self.apply_card(*player, *action)?,
            GameEvent::SpecialItem { player, item, held } => {
                if *held {
                    self.awards.insert(*item, *player);
                } else if self.awards.get(item) == Some(player) {
                    self.awards.remove(item);
                }
            }
            GameEvent::VictoryPoints { player, points } => {
                self.facts_mut(*player)?.victory_points = *points;
            }
            GameEvent::GameOver { winner } => {
                self.phase = GamePhase::Over;
                self.winner = *winner;
            }
            GameEvent::DiceResult { .. }
            | GameEvent::TradeOfferAnnounced { .. }
            | GameEvent::TradeAccepted { .. }
            | GameEvent::TradeRejected { .. }
            | GameEvent::TradeCleared { .. }
            | GameEvent::RequestDenied { .. }
            | GameEvent::DiscardRequired { .. }
            | GameEvent::RobChoice { .. }
            | GameEvent::Pulse => {}
        }
        Ok(BoardChange::None)
    }

    fn facts_mut(&mut self, player: PlayerNumber) -> Result<&mut PlayerFacts, BrainError> {
        self.players
            .get_mut(&player)
            .ok_or(BrainError::UnknownSeat(player))
    }

    fn apply_piece(&mut self, piece: Piece) -> Result<BoardChange, BrainError> {
        if piece.key == PieceKey::DevCard {
            // Purchases are tracked through card actions.
            return Ok(BoardChange::None);
        }
        let change = if self.board.contains(piece) {
            BoardChange::Confirmed(piece)
        } else {
            let removed = self.clear_spot_for(piece)?;
            if let PieceKey::City(node) = piece.key {
                // The settlement under it was never reported.
                if self.board.building(node).is_none() {
                    self.board.place(Piece {
                        owner: piece.owner,
                        key: PieceKey::Settlement(node),
                    })?;
                    self.facts_mut(piece.owner)?
                        .take_from_supply(PieceType::Settlement);
                }
            }
            self.board.place(piece)?;
            match removed {
                Some(removed) => {
                    warn!(
                        seat = %self.me,
                        piece = %piece.key,
                        owner = %piece.owner,
                        removed_owner = %removed.owner,
                        "engine placement overrides the mirror"
                    );
                    BoardChange::Replaced {
                        placed: piece,
                        removed,
                    }
                }
                None => BoardChange::Placed(piece),
            }
        };
        self.facts_mut(piece.owner)?
            .take_from_supply(piece.key.piece_type());
        Ok(change)
    }

    /// Take off whatever stands where the engine put `piece`, unless it is
    /// the settlement `piece` upgrades.
    fn clear_spot_for(&mut self, piece: Piece) -> Result<Option<Piece>, BrainError> {
        match piece.key {
            PieceKey::Settlement(node) | PieceKey::City(node) => {
                let Some(building) = self.board.building(node).copied() else {
                    return Ok(None);
                };
                let upgrade = matches!(piece.key, PieceKey::City(_))
                    && building.owner == piece.owner
                    && !building.city;
                if upgrade {
                    return Ok(None);
                }
                let owner = building.owner;
                if building.city {
                    self.board.remove(Piece {
                        owner,
                        key: PieceKey::City(node),
                    })?;
                }
                self.board.remove(Piece {
                    owner,
                    key: PieceKey::Settlement(node),
                })?;
                let key = if building.city {
                    PieceKey::City(node)
                } else {
                    PieceKey::Settlement(node)
                };
                Ok(Some(Piece { owner, key }))
            }
            PieceKey::Road(edge) | PieceKey::Ship(edge) => {
                let Some(route) = self.board.route(edge).copied() else {
                    return Ok(None);
                };
                let key = if route.ship {
                    PieceKey::Ship(edge)
                } else {
                    PieceKey::Road(edge)
                };
                let removed = Piece {
                    owner: route.owner,
                    key,
                };
                self.board.remove(removed)?;
                Ok(Some(removed))
            }
            PieceKey::DevCard => Ok(None),
        }
    }

    fn apply_change(&mut self, player: PlayerNumber, change: &ResourceChange) -> Result<(), BrainError> {
        let exact = player == self.me;
        self.facts_mut(player)?.hand.apply(change, exact)
    }

    fn apply_card(&mut self, player: PlayerNumber, action: CardEvent) -> Result<(), BrainError> {
        let me = self.me;
        match action {
            CardEvent::Drawn(card) => {
                self.dev_cards_left = self.dev_cards_left.saturating_sub(1);
                let facts = self.facts_mut(player)?;
                facts.dev_cards = facts.dev_cards.saturating_add(1);
                if let (true, Some(card)) = (player == me, card) {
                    self.our_cards.push(HeldCard { card, fresh: true });
                }
            }
            CardEvent::Played(card) => {
                let facts = self.facts_mut(player)?;
                facts.dev_cards = facts.dev_cards.saturating_sub(1);
                if card == CardType::Knight {
                    facts.knights_played = facts.knights_played.saturating_add(1);
                }
                if player == me {
                    let slot = self
                        .our_cards
                        .iter()
                        .position(|c| c.card == card && !c.fresh)
                        .or_else(|| self.our_cards.iter().position(|c| c.card == card));
                    if let Some(slot) = slot {
                        self.our_cards.remove(slot);
                    }
                }
            }
            CardEvent::Rejected(_) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use settler_types::NodeId;

    use super::*;

    const ME: PlayerNumber = PlayerNumber(0);
    const RIVAL: PlayerNumber = PlayerNumber(1);

    fn started() -> GameMirror {
        let mut mirror = GameMirror::new(ME, Layout::standard(3).unwrap());
        mirror
            .apply(&GameEvent::GameStarted {
                game: GameId::new(),
                seats: BTreeMap::from([(ME, SeatKind::Robot), (RIVAL, SeatKind::Human)]),
            })
            .unwrap();
        mirror
    }

    #[test]
    fn opponent_losses_fall_back_to_unknown_cards() {
        let mut hand = HandKnowledge {
            known: ResourceSet::single(Resource::Ore, 1),
            unknown: 2,
        };
        hand.apply(&ResourceChange::Lose(ResourceSet::single(Resource::Wood, 1)), false)
            .unwrap();
        assert_eq!(hand.unknown, 1);
        hand.apply(&ResourceChange::LoseUnknown(2), false).unwrap();
        assert_eq!(hand.total(), 0);
        assert!(hand.may_hold().is_empty());
    }

    #[test]
    fn our_hand_is_exact() {
        let mut mirror = started();
        mirror
            .apply(&GameEvent::ResourceDelta {
                player: ME,
                change: ResourceChange::Gain(ResourceSet::single(Resource::Clay, 2)),
            })
            .unwrap();
        let overdraw = GameEvent::ResourceDelta {
            player: ME,
            change: ResourceChange::Lose(ResourceSet::single(Resource::Wood, 1)),
        };
        assert!(mirror.apply(&overdraw).is_err());
        assert_eq!(mirror.our_hand().amount(Resource::Clay), 2);
    }

    #[test]
    fn pre_applied_piece_is_confirmed_not_duplicated() {
        let mut mirror = started();
        let key = PieceKey::Settlement(NodeId(10));
        let piece = mirror.pre_apply(key).unwrap();
        let change = mirror.apply(&GameEvent::PiecePlaced { piece }).unwrap();
        assert_eq!(change, BoardChange::Confirmed(piece));
        assert_eq!(mirror.our_supply().get(&PieceType::Settlement), Some(&4));
    }

    #[test]
    fn engine_piece_replaces_a_conflicting_local_one() {
        let mut mirror = started();
        let node = NodeId(10);
        let ours = mirror.pre_apply(PieceKey::Settlement(node)).unwrap();
        let theirs = Piece {
            owner: RIVAL,
            key: PieceKey::Settlement(node),
        };
        let change = mirror.apply(&GameEvent::PiecePlaced { piece: theirs }).unwrap();
        assert_eq!(
            change,
            BoardChange::Replaced {
                placed: theirs,
                removed: ours,
            }
        );
        assert!(mirror.board().contains(theirs));
        assert!(!mirror.board().contains(ours));
        let supply = &mirror.player(RIVAL).unwrap().supply;
        assert_eq!(supply.get(&PieceType::Settlement), Some(&4));
        assert_eq!(mirror.our_supply().get(&PieceType::Settlement), Some(&5));
    }

    #[test]
    fn engine_city_lands_even_without_a_local_settlement() {
        let mut mirror = started();
        let node = NodeId(10);
        let city = Piece {
            owner: RIVAL,
            key: PieceKey::City(node),
        };
        let change = mirror.apply(&GameEvent::PiecePlaced { piece: city }).unwrap();
        assert_eq!(change, BoardChange::Placed(city));
        assert!(mirror.board().contains(city));
        let supply = &mirror.player(RIVAL).unwrap().supply;
        assert_eq!(supply.get(&PieceType::Settlement), Some(&5));
        assert_eq!(supply.get(&PieceType::City), Some(&3));
    }

    #[test]
    fn city_returns_settlement_to_supply() {
        let mut mirror = started();
        let node = NodeId(10);
        for key in [PieceKey::Settlement(node), PieceKey::City(node)] {
            mirror
                .apply(&GameEvent::PiecePlaced { piece: Piece { owner: RIVAL, key } })
                .unwrap();
        }
        let supply = &mirror.player(RIVAL).unwrap().supply;
        assert_eq!(supply.get(&PieceType::Settlement), Some(&5));
        assert_eq!(supply.get(&PieceType::City), Some(&3));
    }

    #[test]
    fn fresh_cards_wait_a_turn() {
        let mut mirror = started();
        mirror
            .apply(&GameEvent::CardAction {
                player: ME,
                action: CardEvent::Drawn(Some(CardType::Knight)),
            })
            .unwrap();
        assert!(!mirror.can_play(CardType::Knight));
        assert_eq!(mirror.dev_cards_left(), 24);
        mirror.new_turn();
        assert!(mirror.can_play(CardType::Knight));
        mirror
            .apply(&GameEvent::CardAction {
                player: ME,
                action: CardEvent::Played(CardType::Knight),
            })
            .unwrap();
        assert!(mirror.our_cards().is_empty());
        assert_eq!(mirror.player(ME).unwrap().knights_played, 1);
    }

    #[test]
    fn events_for_unknown_seats_are_errors() {
        let mut mirror = started();
        let event = GameEvent::VictoryPoints {
            player: PlayerNumber(9),
            points: 3,
        };
        assert!(matches!(
            mirror.apply(&event),
            Err(BrainError::UnknownSeat(PlayerNumber(9)))
        ));
    }
}
