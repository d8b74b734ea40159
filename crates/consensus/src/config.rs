//! Proposer configuration

use std::time::Duration;

/// Smallest cluster that has a majority distinct from the full set.
pub const DEFAULT_MIN_ACCEPTORS: usize = 3;

/// Configuration for a [`Proposer`](crate::Proposer).
#[derive(Debug, Clone)]
pub struct ProposerConfig {
    /// Rounds against fewer known acceptors fail without sending anything.
    pub min_acceptors: usize,
    /// Per-request timeout applied on top of the transport's own. `None`
    /// leaves requests bounded only by the transport.
    pub request_timeout: Option<Duration>,
}

impl Default for ProposerConfig {
    fn default() -> Self {
        Self {
            min_acceptors: DEFAULT_MIN_ACCEPTORS,
            request_timeout: None,
        }
    }
}
