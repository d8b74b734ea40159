//! Ballot numbers
//!
//! A ballot is `(counter, proposer_id)`. The derived ordering compares the
//! counter first and the proposer id second, which makes ballots minted by
//! distinct proposers distinct even when their counters collide.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProposerId;

/// Totally ordered identifier of one consensus round.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Ballot {
    /// Per-proposer monotonic counter. Compared first.
    pub counter: u64,
    /// Proposer that minted the ballot. Breaks counter ties.
    pub proposer_id: ProposerId,
}

impl Ballot {
    /// The minimum ballot, standing for "nothing promised or accepted".
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a new `Ballot`.
    #[must_use]
    pub const fn new(counter: u64, proposer_id: ProposerId) -> Self {
        Self {
            counter,
            proposer_id,
        }
    }

    /// Mints the ballot following `last_counter` for `proposer_id`, or
    /// `None` once the counter space is used up.
    #[must_use]
    pub const fn next(proposer_id: ProposerId, last_counter: u64) -> Option<Self> {
        match last_counter.checked_add(1) {
            Some(counter) => Some(Self::new(counter, proposer_id)),
            None => None,
        }
    }

    /// The counter a proposer must have reached so that the ballot it mints
    /// next outranks `self`.
    #[must_use]
    pub const fn counter_to_outrank(self, proposer_id: ProposerId) -> u64 {
        if proposer_id > self.proposer_id {
            self.counter.saturating_sub(1)
        } else {
            self.counter
        }
    }
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.counter, self.proposer_id)
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::*;

    #[test]
    fn test_counter_dominates() {
        assert!(Ballot::new(2, 1) > Ballot::new(1, 99));
        assert_eq!(Ballot::new(1, 5).cmp(&Ballot::new(2, 0)), Ordering::Less);
    }

    #[test]
    fn test_proposer_breaks_ties() {
        assert!(Ballot::new(3, 2) > Ballot::new(3, 1));
        assert_eq!(Ballot::new(3, 2).cmp(&Ballot::new(3, 2)), Ordering::Equal);
    }

    #[test]
    fn test_zero_is_minimum() {
        assert_eq!(Ballot::ZERO, Ballot::default());
        assert!(Ballot::ZERO < Ballot::new(0, 1));
        assert!(Some(Ballot::ZERO) < Ballot::next(0, 0));
    }

    #[test]
    fn test_next() {
        let ballot = Ballot::next(7, 41).unwrap();

        assert_eq!(ballot, Ballot::new(42, 7));
        assert!(Ballot::next(7, ballot.counter).unwrap() > ballot);
    }

    #[test]
    fn test_next_at_counter_limit() {
        assert_eq!(Ballot::next(3, u64::MAX - 1), Some(Ballot::new(u64::MAX, 3)));
        assert_eq!(Ballot::next(3, u64::MAX), None);
    }

    #[test]
    fn test_distinct_proposers_never_collide() {
        assert_ne!(Ballot::next(1, 10), Ballot::next(2, 10));
    }

    #[test]
    fn test_counter_to_outrank() {
        let seen = Ballot::new(10, 5);

        for proposer_id in [1, 5, 9] {
            let counter = seen.counter_to_outrank(proposer_id);
            assert!(Ballot::next(proposer_id, counter).unwrap() > seen);
        }
        assert_eq!(seen.counter_to_outrank(9), 9);
        assert_eq!(seen.counter_to_outrank(5), 10);
        assert_eq!(Ballot::new(u64::MAX, 1).counter_to_outrank(9), u64::MAX - 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(Ballot::new(12, 3).to_string(), "12.3");
    }
}
