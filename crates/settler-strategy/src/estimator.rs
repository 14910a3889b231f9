//! Resource speed estimation.
//!
//! Converts a player's production contacts into a [`ResourceTable`]: how
//! many rolls it takes on average to gain one unit of each resource, and
//! which resources each dice sum yields. [`Estimator::estimate_rolls`]
//! then simulates forward from a hand to a target cost, trading surplus at
//! the player's port ratios after every roll.
//!
//! Probabilities are kept as integer "ways out of 36" so every figure is
//! exact. A result past the roll cutoff is reported as
//! [`RollOutcome::Cutoff`], which callers read as a conservative ETA.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use settler_board::{Contact, PortRatios, dice_ways};
use settler_types::{HexId, PieceType, Resource, ResourceSet, cost_of};
use tracing::trace;

/// Rolls-per-resource value meaning the resource is never produced.
pub const UNREACHABLE_ROLLS: u32 = 55_555;

/// Dice sums that can produce resources (7 never does).
const PRODUCING_SUMS: [u8; 10] = [2, 3, 4, 5, 6, 8, 9, 10, 11, 12];

/// Rolls needed per unit when `ways` out of 36 rolls produce it, rounded
/// to the nearest integer, or [`UNREACHABLE_ROLLS`] for zero ways.
pub fn rolls_for_ways(ways: u32) -> u32 {
    // round(36 / w) == floor((72 + w) / 2w)
    72_u32
        .saturating_add(ways)
        .checked_div(ways.saturating_mul(2))
        .map_or(UNREACHABLE_ROLLS, |rolls| rolls.max(1))
}

// ---------------------------------------------------------------------------
// Resource table
// ---------------------------------------------------------------------------

/// Acquisition rates and per-roll yields for one contact set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTable {
    ways: BTreeMap<Resource, u32>,
    rolls: BTreeMap<Resource, u32>,
    yields: BTreeMap<u8, ResourceSet>,
}

impl ResourceTable {
    /// Build the table for `contacts`, ignoring any contact on `blocked`.
    pub fn from_contacts(contacts: &[Contact], blocked: Option<HexId>) -> Self {
        let mut ways: BTreeMap<Resource, u32> = Resource::ALL.iter().map(|r| (*r, 0)).collect();
        let mut yields: BTreeMap<u8, ResourceSet> = BTreeMap::new();

        for contact in contacts.iter().filter(|c| Some(c.hex) != blocked) {
            let entry = ways.entry(contact.resource).or_insert(0);
            *entry = entry.saturating_add(dice_ways(contact.number).saturating_mul(contact.multiplier));
            if PRODUCING_SUMS.contains(&contact.number) {
                yields
                    .entry(contact.number)
                    .or_default()
                    .add(contact.resource, contact.multiplier);
            }
        }

        let rolls = ways.iter().map(|(r, w)| (*r, rolls_for_ways(*w))).collect();
        Self { ways, rolls, yields }
    }

    /// Expected rolls per unit of `resource`.
    pub fn rolls_per_resource(&self, resource: Resource) -> u32 {
        self.rolls.get(&resource).copied().unwrap_or(UNREACHABLE_ROLLS)
    }

    /// Weighted ways out of 36 that produce `resource`.
    pub fn ways(&self, resource: Resource) -> u32 {
        self.ways.get(&resource).copied().unwrap_or(0)
    }

    /// What a roll of `sum` yields.
    pub fn yield_for(&self, sum: u8) -> ResourceSet {
        self.yields.get(&sum).cloned().unwrap_or_default()
    }

    /// Yield of every producing dice sum, in sum order.
    pub fn yields(&self) -> impl Iterator<Item = (u8, ResourceSet)> + '_ {
        PRODUCING_SUMS.iter().map(|sum| (*sum, self.yield_for(*sum)))
    }

    /// Total weighted ways over all resources; a rough production score.
    pub fn total_ways(&self) -> u32 {
        self.ways.values().fold(0_u32, |acc, w| acc.saturating_add(*w))
    }
}

/// Build a [`ResourceTable`] from a contact set and optional blocked hex.
pub fn recompute(contacts: &[Contact], blocked: Option<HexId>) -> ResourceTable {
    ResourceTable::from_contacts(contacts, blocked)
}

// ---------------------------------------------------------------------------
// Roll estimation
// ---------------------------------------------------------------------------

/// Result of a forward simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollOutcome {
    /// The target was met after `rolls` rolls, holding `resources`.
    Reached {
        /// Rolls taken, never more than the cutoff.
        rolls: u32,
        /// Hand at that point, after trades.
        resources: ResourceSet,
    },
    /// The target was not met within `bound` rolls.
    Cutoff {
        /// The cutoff that was exceeded.
        bound: u32,
    },
}

impl RollOutcome {
    /// Rolls to reach the target, with a cutoff read as its bound.
    pub const fn eta(&self) -> u32 {
        match self {
            Self::Reached { rolls, .. } => *rolls,
            Self::Cutoff { bound } => *bound,
        }
    }

    /// Whether the simulation gave up.
    pub const fn is_cutoff(&self) -> bool {
        matches!(self, Self::Cutoff { .. })
    }
}

/// How resources arrive during a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gains<'a> {
    /// One unit of each resource every `rolls_per_resource` rolls.
    Expected,
    /// Yields of these dice sums, cycled.
    Dice(&'a [u8]),
}

/// A reproducible sequence of two-dice sums.
pub fn seeded_dice(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let a: u8 = rng.random_range(1..=6);
            let b: u8 = rng.random_range(1..=6);
            a.saturating_add(b)
        })
        .collect()
}

/// Trade surplus beyond `target` into missing resources at `ports` ratios
/// until nothing more can be traded.
pub fn trade_surplus(hand: &mut ResourceSet, target: &ResourceSet, ports: &PortRatios) {
    loop {
        let missing = hand.gap(target);
        let Some(need) = missing.kinds().next() else {
            return;
        };
        let surplus = hand.surplus(target);
        let Some((give, ratio)) = surplus
            .iter()
            .map(|(r, n)| (r, n, ports.ratio(r)))
            .find(|(_, n, ratio)| *ratio >= 2 && n >= ratio)
            .map(|(r, _, ratio)| (r, ratio))
        else {
            return;
        };
        if hand.remove(give, ratio).is_err() {
            return;
        }
        hand.add(need, 1);
    }
}

/// Resource table plus a cache of "from nothing" estimates.
///
/// The cache is keyed by piece type and cutoff and is dropped whenever the
/// table is recomputed. Port ratios are expected to change only together
/// with contacts, so they are not part of the key. Equality ignores the
/// cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimator {
    table: ResourceTable,
    #[serde(skip)]
    from_nothing: BTreeMap<(PieceType, u32), u32>,
}

impl PartialEq for Estimator {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl Eq for Estimator {}

impl Default for Estimator {
    fn default() -> Self {
        Self::new(&[], None)
    }
}

impl Estimator {
    /// An estimator for `contacts`.
    pub fn new(contacts: &[Contact], blocked: Option<HexId>) -> Self {
        Self {
            table: recompute(contacts, blocked),
            from_nothing: BTreeMap::new(),
        }
    }

    /// Replace the contact set, dropping cached estimates.
    pub fn recompute(&mut self, contacts: &[Contact], blocked: Option<HexId>) -> &ResourceTable {
        self.table = recompute(contacts, blocked);
        self.from_nothing.clear();
        &self.table
    }

    /// The current table.
    pub const fn table(&self) -> &ResourceTable {
        &self.table
    }

    /// Simulate forward from `current` until it covers `target`.
    ///
    /// Returns [`RollOutcome::Reached`] with zero rolls when `current`
    /// already covers `target`. A dice sequence that is empty never
    /// produces anything.
    pub fn estimate_rolls(
        &self,
        current: &ResourceSet,
        target: &ResourceSet,
        cutoff: u32,
        ports: &PortRatios,
        gains: Gains<'_>,
    ) -> RollOutcome {
        let mut hand = current.clone();
        if hand.contains(target) {
            return RollOutcome::Reached {
                rolls: 0,
                resources: hand,
            };
        }

        let mut dice = match gains {
            Gains::Dice(seq) => Some(seq.iter().copied().cycle()),
            Gains::Expected => None,
        };

        for roll in 1..=cutoff {
            match dice.as_mut() {
                Some(seq) => {
                    let Some(sum) = seq.next() else {
                        break;
                    };
                    hand.add_set(&self.table.yield_for(sum));
                }
                None => {
                    for resource in Resource::ALL {
                        let every = self.table.rolls_per_resource(resource);
                        if every != UNREACHABLE_ROLLS && roll.checked_rem(every) == Some(0) {
                            hand.add(resource, 1);
                        }
                    }
                }
            }
            trade_surplus(&mut hand, target, ports);
            if hand.contains(target) {
                return RollOutcome::Reached {
                    rolls: roll,
                    resources: hand,
                };
            }
        }

        trace!(cutoff, target = %target, "estimate hit cutoff");
        RollOutcome::Cutoff { bound: cutoff }
    }

    /// Rolls to afford `piece` starting from an empty hand, with expected
    /// gains. Cached per cutoff until the next recompute.
    pub fn from_nothing(&mut self, piece: PieceType, cutoff: u32, ports: &PortRatios) -> u32 {
        if let Some(eta) = self.from_nothing.get(&(piece, cutoff)) {
            return *eta;
        }
        let eta = self
            .estimate_rolls(&ResourceSet::new(), &cost_of(piece), cutoff, ports, Gains::Expected)
            .eta();
        self.from_nothing.insert((piece, cutoff), eta);
        eta
    }

    /// Uncached "from nothing" estimate for an arbitrary cost.
    pub fn eta_for_cost(&self, cost: &ResourceSet, cutoff: u32, ports: &PortRatios) -> u32 {
        self.estimate_rolls(&ResourceSet::new(), cost, cutoff, ports, Gains::Expected)
            .eta()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn contact(hex: u8, resource: Resource, number: u8) -> Contact {
        Contact {
            hex: HexId(hex),
            resource,
            number,
            multiplier: 1,
        }
    }

    #[test]
    fn rolls_round_thirty_six_over_ways() {
        for ways in 1..=36_u32 {
            let exact = 36.0 / f64::from(ways);
            let rounded = (exact + 0.5).floor();
            assert!((f64::from(rolls_for_ways(ways)) - rounded).abs() < f64::EPSILON);
        }
        assert_eq!(rolls_for_ways(0), UNREACHABLE_ROLLS);
    }

    #[test]
    fn clay_on_six_and_eight_ore_on_two() {
        let table = recompute(
            &[
                contact(0, Resource::Clay, 6),
                contact(1, Resource::Clay, 8),
                contact(2, Resource::Ore, 2),
            ],
            None,
        );
        // P(6) + P(8) = 10/36, P(2) = 1/36
        assert_eq!(table.rolls_per_resource(Resource::Clay), 4);
        assert_eq!(table.rolls_per_resource(Resource::Ore), 36);
        assert_eq!(table.rolls_per_resource(Resource::Wood), UNREACHABLE_ROLLS);
    }

    #[test]
    fn blocked_hex_is_excluded() {
        let contacts = [contact(0, Resource::Clay, 6), contact(1, Resource::Clay, 8)];
        let table = recompute(&contacts, Some(HexId(0)));
        assert_eq!(table.ways(Resource::Clay), 5);
        assert!(table.yield_for(6).is_empty());
        assert_eq!(table.yield_for(8).amount(Resource::Clay), 1);
    }

    #[test]
    fn adding_a_contact_never_slows_a_resource() {
        let mut contacts = Vec::new();
        let mut previous = recompute(&contacts, None);
        for (hex, number) in [(0, 2), (1, 12), (2, 6), (3, 3), (4, 9), (5, 11)] {
            contacts.push(contact(hex, Resource::Wheat, number));
            let next = recompute(&contacts, None);
            assert!(
                next.rolls_per_resource(Resource::Wheat)
                    <= previous.rolls_per_resource(Resource::Wheat)
            );
            previous = next;
        }
    }

    #[test]
    fn cities_count_twice() {
        let mut city = contact(0, Resource::Ore, 8);
        city.multiplier = 2;
        let table = recompute(&[city], None);
        assert_eq!(table.ways(Resource::Ore), 10);
        assert_eq!(table.yield_for(8).amount(Resource::Ore), 2);
    }

    #[test]
    fn estimate_never_exceeds_cutoff() {
        let target = ResourceSet::from_pairs(&[(Resource::Clay, 1), (Resource::Wood, 1)]);
        let ports = PortRatios::bank();

        let estimator = Estimator::new(
            &[contact(0, Resource::Clay, 6), contact(1, Resource::Wood, 4)],
            None,
        );
        let outcome =
            estimator.estimate_rolls(&ResourceSet::new(), &target, 40, &ports, Gains::Expected);
        assert!(outcome.eta() <= 40);
        assert!(matches!(outcome, RollOutcome::Reached { rolls: 12, .. }));

        let barren = Estimator::default();
        let outcome = barren.estimate_rolls(&ResourceSet::new(), &target, 40, &ports, Gains::Expected);
        assert_eq!(outcome, RollOutcome::Cutoff { bound: 40 });
    }

    #[test]
    fn surplus_is_traded_at_port_ratio() {
        let target = ResourceSet::single(Resource::Wood, 1);
        let hand = ResourceSet::single(Resource::Ore, 4);
        let outcome = Estimator::default().estimate_rolls(
            &hand,
            &target,
            10,
            &PortRatios::bank(),
            Gains::Expected,
        );
        assert_eq!(
            outcome,
            RollOutcome::Reached {
                rolls: 1,
                resources: target,
            }
        );
    }

    #[test]
    fn dice_mode_follows_sequence() {
        let estimator = Estimator::new(&[contact(0, Resource::Sheep, 5)], None);
        let target = ResourceSet::single(Resource::Sheep, 2);
        let outcome = estimator.estimate_rolls(
            &ResourceSet::new(),
            &target,
            40,
            &PortRatios::bank(),
            Gains::Dice(&[7, 5, 3, 5]),
        );
        assert!(matches!(outcome, RollOutcome::Reached { rolls: 4, .. }));

        let seq = seeded_dice(9, 20);
        assert_eq!(seq, seeded_dice(9, 20));
        assert!(seq.iter().all(|s| (2..=12).contains(s)));
    }

    #[test]
    fn from_nothing_is_cached_until_recompute() {
        let ports = PortRatios::bank();
        let mut estimator = Estimator::new(&[contact(0, Resource::Ore, 8)], None);
        let slow = estimator.from_nothing(PieceType::City, 40, &ports);
        assert_eq!(slow, estimator.from_nothing(PieceType::City, 40, &ports));
        estimator.recompute(
            &[
                contact(0, Resource::Ore, 8),
                contact(1, Resource::Ore, 6),
                contact(2, Resource::Wheat, 9),
            ],
            None,
        );
        assert!(estimator.from_nothing(PieceType::City, 40, &ports) <= slow);
    }
}
