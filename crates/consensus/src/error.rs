//! Error types for the consensus engine
//!
//! Per-acceptor failures never reach the caller of a round individually.
//! They are folded into the quorum tally and only the aggregate outcome is
//! reported through [`ProposeError`].

use std::time::Duration;

use thiserror::Error;

use crate::{AcceptorId, Ballot, ProposerId};

/// Boxed error used where the concrete type belongs to a pluggable component.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A request could not be delivered to an acceptor or its reply could not be
/// understood. A refusal by the acceptor is not a transport error.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The acceptor cannot be reached at the moment.
    #[error("Acceptor {acceptor} is unreachable")]
    Unreachable {
        /// The acceptor that could not be reached
        acceptor: AcceptorId,
    },

    /// Connecting to the acceptor failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// No reply arrived in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The remote side answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status {
        /// The URL that was called
        url: String,
        /// The status code that was returned
        status: u16,
    },

    /// The reply body could not be decoded.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The acceptor failed while handling the request.
    #[error("Acceptor failed: {0}")]
    Acceptor(String),

    /// Any other transport failure.
    #[error("Transport error: {0}")]
    Other(String),
}

/// Errors raised by an acceptor while handling a request.
#[derive(Error, Debug)]
pub enum AcceptorError {
    /// The stable store failed.
    #[error("Store error: {0}")]
    Store(#[source] BoxError),
}

/// Outcome of a failed consensus round.
#[derive(Error, Debug)]
pub enum ProposeError {
    /// Too few acceptors are known to ever form a quorum. No message was sent.
    #[error("Insufficient acceptors: {known} known, at least {required} required")]
    InsufficientAcceptors {
        /// Number of acceptors known to the proposer
        known: usize,
        /// Minimum cluster size
        required: usize,
    },

    /// The prepare phase did not gather a quorum of promises.
    #[error(
        "Prepare quorum missed: {promised}/{required} ({rejected} rejected, {failed} failed)"
    )]
    PrepareQuorum {
        /// Promises received
        promised: usize,
        /// Quorum size
        required: usize,
        /// Acceptors that had already promised a higher ballot
        rejected: usize,
        /// Acceptors that could not be reached
        failed: usize,
    },

    /// The accept phase did not gather a quorum of acknowledgements.
    #[error(
        "Accept quorum missed: {acknowledged}/{required} ({rejected} rejected, {failed} failed)"
    )]
    AcceptQuorum {
        /// Acknowledgements received
        acknowledged: usize,
        /// Quorum size
        required: usize,
        /// Acceptors that had already promised a higher ballot
        rejected: usize,
        /// Acceptors that could not be reached
        failed: usize,
    },

    /// The change function rejected the current state.
    #[error("Change function failed: {0}")]
    ChangeFunction(#[source] BoxError),

    /// Two promises carried the same ballot with different values.
    #[error("Conflicting states accepted under ballot {ballot}")]
    ConflictingState {
        /// The ballot both values were reported under
        ballot: Ballot,
    },

    /// The proposer's ballot counter reached its maximum. No message was
    /// sent.
    #[error("Proposer {proposer} has no ballots left")]
    BallotExhausted {
        /// The proposer whose counter is exhausted
        proposer: ProposerId,
    },

    /// The ballot counter could not be persisted. No message was sent.
    #[error("Counter store error: {0}")]
    CounterStore(#[source] BoxError),
}

/// Errors raised while assembling a node.
#[derive(Error, Debug)]
pub enum NodeError {
    /// The proposer's ballot counter could not be restored.
    #[error("Counter store error: {0}")]
    CounterStore(#[source] BoxError),
}
