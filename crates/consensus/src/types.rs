//! Identifiers and the acceptor reply type shared by every consensus component

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Ballot;

/// Operator-assigned identifier of an acceptor, unique within a cluster.
pub type AcceptorId = u64;

/// Identifier stamped into every ballot a proposer mints.
pub type ProposerId = u64;

/// Identifier of a node. A node's acceptor and proposer share it.
pub type NodeId = u64;

/// A ballot paired with a value, as reported by an acceptor for one key.
///
/// For a granted prepare the ballot is the one the value was accepted under
/// ([`Ballot::ZERO`] when nothing was accepted yet). For a granted accept it
/// is the ballot of the request. For a refusal it is the higher ballot the
/// acceptor already promised.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptorState {
    /// Ballot the acceptor reports.
    pub ballot: Ballot,
    /// Last accepted value, empty for a never-written key.
    pub state: Bytes,
}

impl AcceptorState {
    /// Creates a new `AcceptorState`.
    #[must_use]
    pub fn new(ballot: Ballot, state: impl Into<Bytes>) -> Self {
        Self {
            ballot,
            state: state.into(),
        }
    }

    /// Whether this reply to a prepare of `ballot` is a promise.
    #[must_use]
    pub fn is_promise_for(&self, ballot: Ballot) -> bool {
        self.ballot < ballot
    }

    /// Whether this reply to an accept of `ballot` is an acknowledgement.
    #[must_use]
    pub fn is_ack_for(&self, ballot: Ballot) -> bool {
        self.ballot == ballot
    }
}
