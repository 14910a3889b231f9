//! Discarding down to the hand limit after a seven.

use settler_types::{Resource, ResourceSet};

/// Chooses which cards to give up.
pub trait DiscardStrategy {
    /// Exactly `count` cards from `hand` (or the whole hand if smaller),
    /// trying to hold on to `keep`.
    fn choose_discard(&self, hand: &ResourceSet, count: u32, keep: &ResourceSet) -> ResourceSet;
}

/// Discards surplus beyond the plan first, most plentiful kind first.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepPlanDiscard;

impl DiscardStrategy for KeepPlanDiscard {
    fn choose_discard(&self, hand: &ResourceSet, count: u32, keep: &ResourceSet) -> ResourceSet {
        let mut left = hand.clone();
        let mut out = ResourceSet::new();
        for _ in 0..count.min(hand.total()) {
            let pick = most_of(&left.surplus(keep)).or_else(|| most_of(&left));
            let Some(resource) = pick else {
                break;
            };
            if left.remove(resource, 1).is_err() {
                break;
            }
            out.add(resource, 1);
        }
        out
    }
}

fn most_of(set: &ResourceSet) -> Option<Resource> {
    set.iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(r, _)| r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surplus_goes_first() {
        let hand = ResourceSet::from_pairs(&[
            (Resource::Ore, 4),
            (Resource::Wheat, 2),
            (Resource::Clay, 1),
            (Resource::Wood, 1),
        ]);
        let keep = ResourceSet::from_pairs(&[(Resource::Clay, 1), (Resource::Wood, 1)]);
        let out = KeepPlanDiscard.choose_discard(&hand, 4, &keep);
        assert_eq!(out.total(), 4);
        assert_eq!(out.amount(Resource::Clay), 0);
        assert_eq!(out.amount(Resource::Wood), 0);
        assert!(hand.contains(&out));
    }

    #[test]
    fn never_discards_more_than_held() {
        let hand = ResourceSet::single(Resource::Sheep, 2);
        let out = KeepPlanDiscard.choose_discard(&hand, 5, &ResourceSet::new());
        assert_eq!(out, hand);
    }
}
