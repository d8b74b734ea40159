//! Leaderless, per-key CASPaxos consensus
//!
//! This crate provides the consensus engine where:
//! - Every key is an independent register, no log is replicated
//! - Proposers run self-contained prepare/accept rounds against majorities
//! - Acceptors keep one promised ballot, one accepted ballot and one value per key
//! - Transports and stable stores are pluggable capabilities
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod acceptor;
pub mod ballot;
pub mod change;
pub mod config;
pub mod counter;
pub mod error;
pub mod membership;
pub mod node;
pub mod proposer;
mod quorum;
pub mod transport;
pub mod types;

// Re-export main types
pub use acceptor::Acceptor;
pub use ballot::Ballot;
pub use config::ProposerConfig;
pub use counter::{CounterStore, StoreCounter};
pub use error::{AcceptorError, BoxError, NodeError, ProposeError, TransportError};
pub use membership::mingle_nodes;
pub use node::Node;
pub use proposer::Proposer;
pub use transport::Transport;
pub use types::{AcceptorId, AcceptorState, NodeId, ProposerId};
