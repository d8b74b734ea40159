//! Majority tallying for one phase of a round
//!
//! A phase is decided as soon as either a majority of the known acceptors
//! granted the request or so many refused or failed that a majority can no
//! longer be reached.

/// Where a phase stands after the replies counted so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum QuorumOutcome {
    /// Neither outcome is certain yet.
    Pending,
    /// A majority granted the request.
    Reached,
    /// A majority can no longer be reached.
    Unreachable,
}

/// Counts grants, refusals and failures against `⌊n/2⌋ + 1`.
#[derive(Clone, Debug)]
pub(crate) struct QuorumTally {
    total: usize,
    quorum: usize,
    granted: usize,
    rejected: usize,
    failed: usize,
}

impl QuorumTally {
    /// Create a tally over `total` acceptors.
    pub(crate) const fn new(total: usize) -> Self {
        Self {
            total,
            quorum: total / 2 + 1,
            granted: 0,
            rejected: 0,
            failed: 0,
        }
    }

    pub(crate) fn grant(&mut self) {
        self.granted += 1;
    }

    pub(crate) fn reject(&mut self) {
        self.rejected += 1;
    }

    pub(crate) fn fail(&mut self) {
        self.failed += 1;
    }

    pub(crate) const fn quorum(&self) -> usize {
        self.quorum
    }

    pub(crate) const fn granted(&self) -> usize {
        self.granted
    }

    pub(crate) const fn rejected(&self) -> usize {
        self.rejected
    }

    pub(crate) const fn failed(&self) -> usize {
        self.failed
    }

    pub(crate) const fn outcome(&self) -> QuorumOutcome {
        if self.granted >= self.quorum {
            QuorumOutcome::Reached
        } else if self.rejected + self.failed > self.total.saturating_sub(self.quorum) {
            QuorumOutcome::Unreachable
        } else {
            QuorumOutcome::Pending
        }
    }
}
