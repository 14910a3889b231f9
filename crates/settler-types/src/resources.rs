//! Resource multisets and piece costs.
//!
//! A [`ResourceSet`] is a hand, a cost, a trade side, or a per-roll yield.
//! Internally it is a `BTreeMap<Resource, u32>` with zero entries removed,
//! so two sets with the same counts always compare equal. All mutation uses
//! checked or saturating arithmetic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{PieceType, Resource};
use crate::error::TypeError;

/// A multiset of resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceSet(BTreeMap<Resource, u32>);

impl ResourceSet {
    /// Create an empty set.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build a set from `(resource, amount)` pairs. Repeated kinds add up.
    pub fn from_pairs(pairs: &[(Resource, u32)]) -> Self {
        let mut set = Self::new();
        for &(resource, amount) in pairs {
            set.add(resource, amount);
        }
        set
    }

    /// A set holding `amount` of a single resource.
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut set = Self::new();
        set.add(resource, amount);
        set
    }

    /// Amount of `resource` in the set.
    pub fn amount(&self, resource: Resource) -> u32 {
        self.0.get(&resource).copied().unwrap_or(0)
    }

    /// Total number of cards.
    pub fn total(&self) -> u32 {
        self.0.values().fold(0_u32, |acc, n| acc.saturating_add(*n))
    }

    /// Whether the set holds nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over non-zero `(resource, amount)` entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        self.0.iter().map(|(r, n)| (*r, *n))
    }

    /// Resource kinds with a non-zero amount.
    pub fn kinds(&self) -> impl Iterator<Item = Resource> + '_ {
        self.0.keys().copied()
    }

    /// Add `amount` of `resource`, saturating at `u32::MAX`.
    pub fn add(&mut self, resource: Resource, amount: u32) {
        if amount == 0 {
            return;
        }
        let entry = self.0.entry(resource).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Add every entry of `other`.
    pub fn add_set(&mut self, other: &Self) {
        for (resource, amount) in other.iter() {
            self.add(resource, amount);
        }
    }

    /// Set the amount of `resource` exactly.
    pub fn set(&mut self, resource: Resource, amount: u32) {
        if amount == 0 {
            self.0.remove(&resource);
        } else {
            self.0.insert(resource, amount);
        }
    }

    /// Remove `amount` of `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InsufficientResource`] if the set holds less.
    pub fn remove(&mut self, resource: Resource, amount: u32) -> Result<(), TypeError> {
        let available = self.amount(resource);
        let remaining = available
            .checked_sub(amount)
            .ok_or(TypeError::InsufficientResource {
                resource,
                requested: amount,
                available,
            })?;
        self.set(resource, remaining);
        Ok(())
    }

    /// Remove every entry of `other`. Leaves `self` untouched on failure.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InsufficientResource`] for the first kind that
    /// `self` does not hold enough of.
    pub fn subtract_set(&mut self, other: &Self) -> Result<(), TypeError> {
        if let Some((resource, requested)) = other
            .iter()
            .find(|(resource, amount)| self.amount(*resource) < *amount)
        {
            return Err(TypeError::InsufficientResource {
                resource,
                requested,
                available: self.amount(resource),
            });
        }
        for (resource, amount) in other.iter() {
            self.set(resource, self.amount(resource).saturating_sub(amount));
        }
        Ok(())
    }

    /// Remove up to `amount` of `resource`, returning how many were removed.
    pub fn take_up_to(&mut self, resource: Resource, amount: u32) -> u32 {
        let available = self.amount(resource);
        let taken = available.min(amount);
        self.set(resource, available.saturating_sub(taken));
        taken
    }

    /// Whether `self` holds at least every amount in `other`.
    pub fn contains(&self, other: &Self) -> bool {
        other
            .iter()
            .all(|(resource, amount)| self.amount(resource) >= amount)
    }

    /// What is still missing from `self` to cover `target`.
    pub fn gap(&self, target: &Self) -> Self {
        let mut missing = Self::new();
        for (resource, amount) in target.iter() {
            missing.add(resource, amount.saturating_sub(self.amount(resource)));
        }
        missing
    }

    /// What `self` holds beyond `target` (the part free to trade away).
    pub fn surplus(&self, target: &Self) -> Self {
        let mut extra = Self::new();
        for (resource, amount) in self.iter() {
            extra.add(resource, amount.saturating_sub(target.amount(resource)));
        }
        extra
    }

    /// Multiply every amount by `factor`, saturating.
    pub fn scaled(&self, factor: u32) -> Self {
        let mut out = Self::new();
        for (resource, amount) in self.iter() {
            out.add(resource, amount.saturating_mul(factor));
        }
        out
    }
}

impl FromIterator<(Resource, u32)> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = (Resource, u32)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (resource, amount) in iter {
            set.add(resource, amount);
        }
        set
    }
}

impl core::fmt::Display for ResourceSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return write!(f, "nothing");
        }
        let mut first = true;
        for (resource, amount) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{amount} {}", resource.as_str())?;
            first = false;
        }
        Ok(())
    }
}

/// The resource cost of buying a piece or card.
pub fn cost_of(piece: PieceType) -> ResourceSet {
    match piece {
        PieceType::Road => ResourceSet::from_pairs(&[(Resource::Clay, 1), (Resource::Wood, 1)]),
        PieceType::Settlement => ResourceSet::from_pairs(&[
            (Resource::Clay, 1),
            (Resource::Sheep, 1),
            (Resource::Wheat, 1),
            (Resource::Wood, 1),
        ]),
        PieceType::City => ResourceSet::from_pairs(&[(Resource::Ore, 3), (Resource::Wheat, 2)]),
        PieceType::Ship => ResourceSet::from_pairs(&[(Resource::Sheep, 1), (Resource::Wood, 1)]),
        PieceType::DevCard => ResourceSet::from_pairs(&[
            (Resource::Ore, 1),
            (Resource::Sheep, 1),
            (Resource::Wheat, 1),
        ]),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_entries_are_dropped() {
        let mut set = ResourceSet::single(Resource::Ore, 2);
        set.remove(Resource::Ore, 2).unwrap();
        assert!(set.is_empty());
        assert_eq!(set, ResourceSet::new());
    }

    #[test]
    fn remove_more_than_held_fails() {
        let mut set = ResourceSet::single(Resource::Wood, 1);
        let err = set.remove(Resource::Wood, 2).unwrap_err();
        assert!(matches!(
            err,
            TypeError::InsufficientResource { available: 1, requested: 2, .. }
        ));
        assert_eq!(set.amount(Resource::Wood), 1);
    }

    #[test]
    fn subtract_set_is_all_or_nothing() {
        let mut hand = ResourceSet::from_pairs(&[(Resource::Clay, 1), (Resource::Wood, 0)]);
        assert!(hand.subtract_set(&cost_of(PieceType::Road)).is_err());
        assert_eq!(hand.amount(Resource::Clay), 1);
    }

    #[test]
    fn gap_and_surplus_split_a_hand_against_a_cost() {
        let hand = ResourceSet::from_pairs(&[(Resource::Ore, 4), (Resource::Wheat, 1)]);
        let city = cost_of(PieceType::City);
        assert_eq!(hand.gap(&city), ResourceSet::single(Resource::Wheat, 1));
        assert_eq!(hand.surplus(&city), ResourceSet::single(Resource::Ore, 1));
        assert!(!hand.contains(&city));
    }

    #[test]
    fn settlement_costs_four_distinct_cards() {
        let cost = cost_of(PieceType::Settlement);
        assert_eq!(cost.total(), 4);
        assert_eq!(cost.kinds().count(), 4);
    }

    #[test]
    fn display_lists_amounts() {
        let set = ResourceSet::from_pairs(&[(Resource::Sheep, 2), (Resource::Clay, 1)]);
        assert_eq!(set.to_string(), "1 clay, 2 sheep");
        assert_eq!(ResourceSet::new().to_string(), "nothing");
    }
}
