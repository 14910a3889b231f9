//! Trade negotiation with other players and the bank.
//!
//! The [`Negotiator`] proposes offers that close the gap between our hand
//! and the lead step of the build plan, answers offers made to us, and
//! keeps per-player, per-resource willingness beliefs for the current turn.
//!
//! # Offer lifecycle
//!
//! At most one of our offers is outstanding. Each recipient may reject,
//! accept, or stay silent. An explicit reject marks the rejecter unwilling
//! to give every resource we asked for, unless they offered that resource
//! themselves this turn. Silence past the response window counts as a
//! reject for every recipient who never answered. An accept consumes the
//! offer and teaches nothing.
//!
//! # Response window
//!
//! The window is measured in pulses from the offer's creation. It is the
//! human window while any non-responder is a human seat, and the shorter
//! agent window once every non-responder is an agent. The check runs on
//! every pulse against the current non-responders, so the window shrinks
//! retroactively when the last human answers.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use settler_board::PortRatios;
use settler_types::{PlayerNumber, Resource, ResourceSet, SeatKind, TradeOffer};
use tracing::{debug, info};

use crate::config::StrategyConfig;
use crate::planner::BuildPlan;

/// Our answer to an offer addressed to us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferResponse {
    /// Take the offer as made.
    Accept,
    /// Decline.
    Reject,
    /// Propose different terms back to the offerer.
    Counter(TradeOffer),
    /// The offer left a side empty; propose full terms back.
    Complete(TradeOffer),
    /// Not for us, or our own.
    Ignore,
}

/// A trade with the bank or a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankOffer {
    /// What we hand the bank.
    pub give: ResourceSet,
    /// What we receive.
    pub get: ResourceSet,
}

/// What a pulse did to our outstanding offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PulseOutcome {
    /// No offer is outstanding.
    Idle,
    /// Still inside the response window.
    Waiting,
    /// The window passed; these recipients never answered.
    Expired {
        /// Recipients now believed unwilling.
        silent: BTreeSet<PlayerNumber>,
    },
}

/// Read-only view the negotiator needs from the brain.
#[derive(Debug, Clone, Copy)]
pub struct TradeContext<'a> {
    /// Our seat.
    pub me: PlayerNumber,
    /// Our exact hand.
    pub hand: &'a ResourceSet,
    /// The current build plan.
    pub plan: &'a BuildPlan,
    /// Who controls each seat.
    pub seats: &'a BTreeMap<PlayerNumber, SeatKind>,
    /// Per opponent: resources they might hold (known or unknown cards).
    pub may_hold: &'a BTreeMap<PlayerNumber, BTreeSet<Resource>>,
    /// Our bank ratios.
    pub ports: &'a PortRatios,
    /// Current pulse count.
    pub pulse: u64,
}

/// Our offer awaiting answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outstanding {
    /// The offer as sent.
    pub offer: TradeOffer,
    /// Recipients who rejected so far.
    pub responded: BTreeSet<PlayerNumber>,
}

impl Outstanding {
    /// Recipients who have not answered.
    pub fn silent(&self) -> BTreeSet<PlayerNumber> {
        self.offer
            .to
            .difference(&self.responded)
            .copied()
            .collect()
    }
}

/// Trade state for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Negotiator {
    human_window: u64,
    bot_window: u64,
    max_offers: u32,
    unwilling: BTreeMap<PlayerNumber, BTreeSet<Resource>>,
    signaled: BTreeMap<PlayerNumber, BTreeSet<Resource>>,
    outstanding: Option<Outstanding>,
    made: Vec<TradeOffer>,
}

impl Negotiator {
    /// A negotiator with no beliefs.
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            human_window: config.human_response_pulses,
            bot_window: config.bot_response_pulses,
            max_offers: config.max_offers_per_turn,
            unwilling: BTreeMap::new(),
            signaled: BTreeMap::new(),
            outstanding: None,
            made: Vec::new(),
        }
    }

    /// Forget beliefs and offers at the start of a turn.
    pub fn new_turn(&mut self) {
        self.unwilling.clear();
        self.signaled.clear();
        self.outstanding = None;
        self.made.clear();
    }

    /// Whether we believe `player` would give up `resource`.
    pub fn is_willing(&self, player: PlayerNumber, resource: Resource) -> bool {
        !self
            .unwilling
            .get(&player)
            .is_some_and(|set| set.contains(&resource))
    }

    /// Our offer awaiting answers, if any.
    pub const fn outstanding(&self) -> Option<&Outstanding> {
        self.outstanding.as_ref()
    }

    /// Drop our outstanding offer without learning anything.
    pub fn clear_outstanding(&mut self) {
        self.outstanding = None;
    }

    /// Offers made this turn.
    pub fn offers_made(&self) -> usize {
        self.made.len()
    }

    fn already_made(&self, candidate: &TradeOffer) -> bool {
        self.made.iter().any(|m| m.same_terms(candidate))
    }

    fn record(&mut self, offer: &TradeOffer) {
        self.made.push(offer.clone());
    }

    // -------------------------------------------------------------------
    // Proposals
    // -------------------------------------------------------------------

    /// Propose a trade that helps the plan's lead step.
    ///
    /// Returns `None` when there is no gap, nothing to give, no plausible
    /// seller, the per-turn offer limit is reached, or every candidate
    /// offer was already made this turn. A returned offer becomes the
    /// outstanding one.
    pub fn propose_offer(&mut self, ctx: &TradeContext<'_>) -> Option<TradeOffer> {
        if u32::try_from(self.made.len()).unwrap_or(u32::MAX) >= self.max_offers {
            return None;
        }
        let target = ctx.plan.lead_cost();
        let gap = ctx.hand.gap(&target);
        let surplus = ctx.hand.surplus(&target);
        if gap.is_empty() || surplus.is_empty() {
            return None;
        }

        let mut wanted: Vec<(Resource, BTreeSet<PlayerNumber>)> = gap
            .kinds()
            .map(|r| (r, self.sellers(ctx, r)))
            .filter(|(_, sellers)| !sellers.is_empty())
            .collect();
        wanted.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));

        let mut gives: Vec<(Resource, u32)> = surplus.iter().collect();
        gives.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        for (need, sellers) in wanted {
            for (give, _) in &gives {
                let offer = TradeOffer::new(
                    ctx.me,
                    sellers.clone(),
                    ResourceSet::single(*give, 1),
                    ResourceSet::single(need, 1),
                    ctx.pulse,
                );
                if self.already_made(&offer) {
                    continue;
                }
                self.record(&offer);
                info!(
                    seat = %ctx.me,
                    give = %offer.give,
                    get = %offer.get,
                    recipients = offer.to.len(),
                    "proposing trade"
                );
                self.outstanding = Some(Outstanding {
                    offer: offer.clone(),
                    responded: BTreeSet::new(),
                });
                return Some(offer);
            }
        }
        debug!(seat = %ctx.me, "done trading");
        None
    }

    fn sellers(&self, ctx: &TradeContext<'_>, resource: Resource) -> BTreeSet<PlayerNumber> {
        ctx.seats
            .keys()
            .copied()
            .filter(|p| *p != ctx.me)
            .filter(|p| self.is_willing(*p, resource))
            .filter(|p| ctx.may_hold.get(p).is_some_and(|set| set.contains(&resource)))
            .collect()
    }

    /// Remember what the offerer showed it would give up, without
    /// answering. Used when we cannot trade right now.
    pub fn note_offer(&mut self, offer: &TradeOffer) {
        self.signaled
            .entry(offer.from)
            .or_default()
            .extend(offer.give.kinds());
    }

    /// Decide how to answer `offer`.
    pub fn evaluate_offer(&mut self, offer: &TradeOffer, ctx: &TradeContext<'_>) -> OfferResponse {
        if offer.from == ctx.me || !offer.is_offered_to(ctx.me) {
            return OfferResponse::Ignore;
        }
        self.note_offer(offer);

        if ctx.plan.is_empty() {
            return OfferResponse::Reject;
        }
        let target = ctx.plan.lead_cost();
        let gap = ctx.hand.gap(&target);
        let surplus = ctx.hand.surplus(&target);

        if offer.give.is_empty() || offer.get.is_empty() {
            return self
                .complete(offer, &gap, &surplus, ctx)
                .map_or(OfferResponse::Reject, OfferResponse::Complete);
        }

        let helps = offer.give.kinds().any(|r| gap.amount(r) > 0);
        if helps && surplus.contains(&offer.get) {
            return OfferResponse::Accept;
        }
        self.propose_counter(offer, ctx)
            .map_or(OfferResponse::Reject, OfferResponse::Counter)
    }

    /// Fill in the empty side of a one-sided offer.
    fn complete(
        &mut self,
        offer: &TradeOffer,
        gap: &ResourceSet,
        surplus: &ResourceSet,
        ctx: &TradeContext<'_>,
    ) -> Option<TradeOffer> {
        let (give, get) = if offer.get.is_empty() {
            // They give without asking: ask for what helps, pay one surplus.
            let get: ResourceSet = offer
                .give
                .iter()
                .filter_map(|(r, n)| {
                    let take = n.min(gap.amount(r));
                    (take > 0).then_some((r, take))
                })
                .collect();
            (one_of_most(surplus)?, get)
        } else {
            // They ask without giving: pay from surplus, ask one needed unit.
            let give: ResourceSet = offer
                .get
                .iter()
                .filter_map(|(r, n)| {
                    let pay = n.min(surplus.amount(r));
                    (pay > 0).then_some((r, pay))
                })
                .collect();
            (give, one_of_most(gap)?)
        };
        self.counter_offer(ctx, offer.from, give, get)
    }

    /// Propose terms back to the offerer that shrink our gap and cost only
    /// surplus. Returns `None` if no such terms exist or were already made.
    pub fn propose_counter(&mut self, offer: &TradeOffer, ctx: &TradeContext<'_>) -> Option<TradeOffer> {
        let target = ctx.plan.lead_cost();
        let gap = ctx.hand.gap(&target);
        let surplus = ctx.hand.surplus(&target);

        let mut get: ResourceSet = offer
            .give
            .iter()
            .filter_map(|(r, n)| {
                let take = n.min(gap.amount(r));
                (take > 0).then_some((r, take))
            })
            .collect();
        if get.is_empty() {
            let holds = ctx.may_hold.get(&offer.from);
            if let Some(r) = gap
                .kinds()
                .find(|r| holds.is_some_and(|set| set.contains(r)) && self.is_willing(offer.from, *r))
            {
                get.add(r, 1);
            }
        }

        let mut give: ResourceSet = offer
            .get
            .iter()
            .filter_map(|(r, n)| {
                let pay = n.min(surplus.amount(r));
                (pay > 0).then_some((r, pay))
            })
            .collect();
        if give.is_empty() {
            give = one_of_most(&surplus)?;
        }

        if get.is_empty() || (give == offer.get && get == offer.give) {
            return None;
        }
        self.counter_offer(ctx, offer.from, give, get)
    }

    fn counter_offer(
        &mut self,
        ctx: &TradeContext<'_>,
        to: PlayerNumber,
        give: ResourceSet,
        get: ResourceSet,
    ) -> Option<TradeOffer> {
        if give.is_empty() || get.is_empty() {
            return None;
        }
        let offer = TradeOffer::new(ctx.me, BTreeSet::from([to]), give, get, ctx.pulse);
        if self.already_made(&offer) {
            return None;
        }
        self.record(&offer);
        self.outstanding = Some(Outstanding {
            offer: offer.clone(),
            responded: BTreeSet::new(),
        });
        Some(offer)
    }

    /// Trades with the bank that close the whole gap to the lead step,
    /// or `None` if surplus at our ratios cannot cover it.
    pub fn propose_bank_offer(&self, ctx: &TradeContext<'_>) -> Option<BankOffer> {
        let target = ctx.plan.lead_cost();
        let mut hand = ctx.hand.clone();
        if hand.gap(&target).is_empty() {
            return None;
        }
        let mut give = ResourceSet::new();
        let mut get = ResourceSet::new();
        loop {
            let gap = hand.gap(&target);
            let Some(need) = gap.kinds().next() else {
                break;
            };
            let surplus = hand.surplus(&target);
            let (resource, ratio) = surplus
                .iter()
                .map(|(r, n)| (r, n, ctx.ports.ratio(r)))
                .filter(|(_, n, ratio)| *ratio >= 2 && n >= ratio)
                .min_by_key(|(r, _, ratio)| (*ratio, *r))
                .map(|(r, _, ratio)| (r, ratio))?;
            hand.remove(resource, ratio).ok()?;
            hand.add(need, 1);
            give.add(resource, ratio);
            get.add(need, 1);
        }
        debug!(seat = %ctx.me, give = %give, get = %get, "bank trade closes gap");
        Some(BankOffer { give, get })
    }

    // -------------------------------------------------------------------
    // Responses to our offer
    // -------------------------------------------------------------------

    /// `player` rejected. Returns `true` when every recipient has now
    /// answered and the offer was dropped.
    pub fn on_reject(&mut self, player: PlayerNumber) -> bool {
        let Some(outstanding) = self.outstanding.as_mut() else {
            return false;
        };
        if !outstanding.offer.is_offered_to(player) {
            return false;
        }
        outstanding.responded.insert(player);
        let requested: Vec<Resource> = outstanding.offer.get.kinds().collect();
        let finished = outstanding.silent().is_empty();
        self.mark_unwilling(player, &requested);
        if finished {
            self.outstanding = None;
        }
        finished
    }

    /// Someone accepted an offer. If it was ours, it is consumed.
    pub fn on_accept(&mut self, offerer: PlayerNumber, accepter: PlayerNumber) {
        if let Some(outstanding) = &self.outstanding {
            if outstanding.offer.from == offerer && outstanding.offer.is_offered_to(accepter) {
                self.outstanding = None;
            }
        }
    }

    /// Advance the response window to `pulse`.
    pub fn on_pulse(&mut self, pulse: u64, seats: &BTreeMap<PlayerNumber, SeatKind>) -> PulseOutcome {
        let Some(outstanding) = &self.outstanding else {
            return PulseOutcome::Idle;
        };
        let silent = outstanding.silent();
        let human_waiting = silent
            .iter()
            .any(|p| seats.get(p) == Some(&SeatKind::Human));
        let window = if human_waiting {
            self.human_window
        } else {
            self.bot_window
        };
        if pulse.saturating_sub(outstanding.offer.created_pulse) < window {
            return PulseOutcome::Waiting;
        }

        let requested: Vec<Resource> = outstanding.offer.get.kinds().collect();
        for player in &silent {
            self.mark_unwilling(*player, &requested);
        }
        self.outstanding = None;
        info!(silent = silent.len(), window, "trade offer timed out");
        PulseOutcome::Expired { silent }
    }

    fn mark_unwilling(&mut self, player: PlayerNumber, resources: &[Resource]) {
        let signaled = self.signaled.get(&player);
        let fresh: Vec<Resource> = resources
            .iter()
            .copied()
            .filter(|r| !signaled.is_some_and(|set| set.contains(r)))
            .collect();
        self.unwilling.entry(player).or_default().extend(fresh);
    }
}

/// One unit of the resource `set` holds most of.
fn one_of_most(set: &ResourceSet) -> Option<ResourceSet> {
    set.iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(r, _)| ResourceSet::single(r, 1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use settler_types::{NodeId, PieceKey};

    use super::*;
    use crate::tracker::PossiblePiece;

    const ME: PlayerNumber = PlayerNumber(0);
    const BOT_A: PlayerNumber = PlayerNumber(1);
    const BOT_B: PlayerNumber = PlayerNumber(2);
    const HUMAN: PlayerNumber = PlayerNumber(3);

    struct World {
        hand: ResourceSet,
        plan: BuildPlan,
        seats: BTreeMap<PlayerNumber, SeatKind>,
        may_hold: BTreeMap<PlayerNumber, BTreeSet<Resource>>,
        ports: PortRatios,
    }

    impl World {
        fn new() -> Self {
            let mut plan = BuildPlan::new();
            plan.push(PossiblePiece::new(ME, PieceKey::Settlement(NodeId(4)), 6));
            let seats = BTreeMap::from([
                (ME, SeatKind::Robot),
                (BOT_A, SeatKind::Robot),
                (BOT_B, SeatKind::Robot),
                (HUMAN, SeatKind::Human),
            ]);
            let may_hold = [BOT_A, BOT_B, HUMAN]
                .into_iter()
                .map(|p| (p, Resource::ALL.into_iter().collect()))
                .collect();
            Self {
                hand: ResourceSet::from_pairs(&[
                    (Resource::Clay, 1),
                    (Resource::Sheep, 1),
                    (Resource::Wheat, 1),
                    (Resource::Ore, 3),
                ]),
                plan,
                seats,
                may_hold,
                ports: PortRatios::bank(),
            }
        }

        fn ctx(&self, pulse: u64) -> TradeContext<'_> {
            TradeContext {
                me: ME,
                hand: &self.hand,
                plan: &self.plan,
                seats: &self.seats,
                may_hold: &self.may_hold,
                ports: &self.ports,
                pulse,
            }
        }
    }

    fn negotiator() -> Negotiator {
        Negotiator::new(&StrategyConfig::default())
    }

    #[test]
    fn offer_asks_for_the_gap_and_gives_surplus() {
        let world = World::new();
        let mut negotiator = negotiator();
        let offer = negotiator.propose_offer(&world.ctx(0)).unwrap();
        assert_eq!(offer.get, ResourceSet::single(Resource::Wood, 1));
        assert_eq!(offer.give, ResourceSet::single(Resource::Ore, 1));
        assert_eq!(offer.to, BTreeSet::from([BOT_A, BOT_B, HUMAN]));
        assert!(negotiator.outstanding().is_some());
    }

    #[test]
    fn never_offers_an_empty_give_set() {
        let mut world = World::new();
        world.hand = ResourceSet::new();
        assert!(negotiator().propose_offer(&world.ctx(0)).is_none());

        let mut world = World::new();
        world.hand = ResourceSet::from_pairs(&[(Resource::Clay, 1)]);
        let mut negotiator = negotiator();
        for pulse in 0..10 {
            if let Some(offer) = negotiator.propose_offer(&world.ctx(pulse)) {
                assert!(!offer.give.is_empty());
            }
        }
    }

    #[test]
    fn offers_are_not_repeated_within_a_turn() {
        let world = World::new();
        let mut negotiator = negotiator();
        let first = negotiator.propose_offer(&world.ctx(0)).unwrap();
        if let Some(second) = negotiator.propose_offer(&world.ctx(1)) {
            assert!(!second.same_terms(&first));
        }
        negotiator.new_turn();
        let again = negotiator.propose_offer(&world.ctx(2)).unwrap();
        assert!(again.same_terms(&first));
    }

    #[test]
    fn silent_human_times_out_after_human_window() {
        let world = World::new();
        let mut negotiator = negotiator();
        let offer = negotiator.propose_offer(&world.ctx(100)).unwrap();

        assert!(!negotiator.on_reject(BOT_A));
        assert!(!negotiator.on_reject(BOT_B));

        // Past the agent window but the human has not answered.
        assert_eq!(negotiator.on_pulse(110, &world.seats), PulseOutcome::Waiting);
        let expired = negotiator.on_pulse(130, &world.seats);
        assert_eq!(
            expired,
            PulseOutcome::Expired {
                silent: BTreeSet::from([HUMAN])
            }
        );
        assert!(negotiator.outstanding().is_none());
        for resource in offer.get.kinds() {
            assert!(!negotiator.is_willing(HUMAN, resource));
            assert!(!negotiator.is_willing(BOT_A, resource));
        }
        assert_eq!(negotiator.on_pulse(131, &world.seats), PulseOutcome::Idle);
    }

    #[test]
    fn window_shrinks_once_the_human_answers() {
        let world = World::new();
        let mut negotiator = negotiator();
        negotiator.propose_offer(&world.ctx(0)).unwrap();
        assert_eq!(negotiator.on_pulse(6, &world.seats), PulseOutcome::Waiting);
        negotiator.on_reject(HUMAN);
        assert!(matches!(
            negotiator.on_pulse(6, &world.seats),
            PulseOutcome::Expired { .. }
        ));
    }

    #[test]
    fn signalled_willingness_survives_a_reject() {
        let world = World::new();
        let mut negotiator = negotiator();
        let their_offer = TradeOffer::new(
            BOT_A,
            BTreeSet::from([ME]),
            ResourceSet::single(Resource::Wood, 1),
            ResourceSet::single(Resource::Sheep, 2),
            0,
        );
        let _ = negotiator.evaluate_offer(&their_offer, &world.ctx(0));
        negotiator.clear_outstanding();
        negotiator.propose_offer(&world.ctx(1)).unwrap();
        negotiator.on_reject(BOT_A);
        assert!(negotiator.is_willing(BOT_A, Resource::Wood));
    }

    #[test]
    fn helpful_affordable_offer_is_accepted() {
        let world = World::new();
        let mut negotiator = negotiator();
        let offer = TradeOffer::new(
            BOT_B,
            BTreeSet::from([ME]),
            ResourceSet::single(Resource::Wood, 1),
            ResourceSet::single(Resource::Ore, 2),
            0,
        );
        assert_eq!(negotiator.evaluate_offer(&offer, &world.ctx(0)), OfferResponse::Accept);
    }

    #[test]
    fn unaffordable_offer_gets_a_counter() {
        let world = World::new();
        let mut negotiator = negotiator();
        let offer = TradeOffer::new(
            BOT_B,
            BTreeSet::from([ME]),
            ResourceSet::single(Resource::Wood, 1),
            ResourceSet::single(Resource::Clay, 1),
            0,
        );
        let OfferResponse::Counter(counter) = negotiator.evaluate_offer(&offer, &world.ctx(0)) else {
            panic!("Expected a counter offer");
        };
        assert_eq!(counter.get, ResourceSet::single(Resource::Wood, 1));
        assert_eq!(counter.give, ResourceSet::single(Resource::Ore, 1));
        assert_eq!(counter.to, BTreeSet::from([BOT_B]));
    }

    #[test]
    fn offers_not_for_us_are_ignored() {
        let world = World::new();
        let mut negotiator = negotiator();
        let offer = TradeOffer::new(
            BOT_A,
            BTreeSet::from([BOT_B]),
            ResourceSet::single(Resource::Wood, 1),
            ResourceSet::single(Resource::Ore, 1),
            0,
        );
        assert_eq!(negotiator.evaluate_offer(&offer, &world.ctx(0)), OfferResponse::Ignore);
    }

    #[test]
    fn one_sided_offer_is_completed() {
        let world = World::new();
        let mut negotiator = negotiator();
        let gift = TradeOffer::new(
            HUMAN,
            BTreeSet::from([ME]),
            ResourceSet::single(Resource::Wood, 1),
            ResourceSet::new(),
            0,
        );
        let OfferResponse::Complete(done) = negotiator.evaluate_offer(&gift, &world.ctx(0)) else {
            panic!("Expected a completed offer");
        };
        assert_eq!(done.get, ResourceSet::single(Resource::Wood, 1));
        assert!(!done.give.is_empty());
    }

    #[test]
    fn bank_trade_only_when_it_closes_the_gap() {
        let mut world = World::new();
        let negotiator = negotiator();
        assert!(negotiator.propose_bank_offer(&world.ctx(0)).is_none());
        world.hand.add(Resource::Ore, 1);
        let bank = negotiator.propose_bank_offer(&world.ctx(0)).unwrap();
        assert_eq!(bank.give, ResourceSet::single(Resource::Ore, 4));
        assert_eq!(bank.get, ResourceSet::single(Resource::Wood, 1));
    }
}
