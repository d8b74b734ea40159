//! A node pairs one acceptor with one proposer sharing an id and a store

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use caspaxos_store::StableStore;
use parking_lot::RwLock;
use tracing::info;

use crate::config::ProposerConfig;
use crate::counter::StoreCounter;
use crate::error::{BoxError, NodeError, ProposeError};
use crate::{Acceptor, NodeId, Proposer, Transport};

/// One cluster member.
///
/// Transports registered on a node are the ways other nodes reach its
/// acceptor. [`mingle_nodes`](crate::mingle_nodes) hands them to every
/// proposer in the cluster.
pub struct Node<S: StableStore> {
    id: NodeId,
    acceptor: Arc<Acceptor<S>>,
    proposer: Proposer,
    transports: RwLock<Vec<Arc<dyn Transport>>>,
}

impl<S: StableStore> Node<S> {
    /// Creates a new `Node` with an acceptor on `store` and a proposer whose
    /// ballot counter is restored from, and written ahead to, the same store.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::CounterStore` if the counter cannot be restored.
    pub async fn new(id: NodeId, store: S, config: ProposerConfig) -> Result<Self, NodeError> {
        let counter = Arc::new(StoreCounter::new(store.clone(), id));
        let proposer = Proposer::restore(id, config, counter)
            .await
            .map_err(NodeError::CounterStore)?;

        info!(node = id, counter = proposer.counter(), "node started");

        Ok(Self {
            id,
            acceptor: Arc::new(Acceptor::new(id, store)),
            proposer,
            transports: RwLock::new(Vec::new()),
        })
    }

    /// The node's id, shared by its acceptor and its proposer.
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// The node's acceptor, for wrapping in transports.
    pub fn acceptor(&self) -> Arc<Acceptor<S>> {
        Arc::clone(&self.acceptor)
    }

    /// The node's proposer.
    pub const fn proposer(&self) -> &Proposer {
        &self.proposer
    }

    /// Registers a transport that reaches this node's acceptor. Registering
    /// the same transport twice has no effect.
    pub fn add_transport(&self, transport: Arc<dyn Transport>) {
        let mut transports = self.transports.write();
        if !transports.iter().any(|known| Arc::ptr_eq(known, &transport)) {
            transports.push(transport);
        }
    }

    /// Transports registered on this node.
    pub fn transports(&self) -> Vec<Arc<dyn Transport>> {
        self.transports.read().clone()
    }

    /// Runs a round on `key` through this node's proposer.
    ///
    /// # Errors
    ///
    /// See [`Proposer::propose`].
    pub async fn propose<K, F, E>(&self, key: K, change: F) -> Result<Bytes, ProposeError>
    where
        K: Into<Bytes>,
        F: FnOnce(&[u8], Bytes) -> Result<Bytes, E> + Send,
        E: Into<BoxError>,
    {
        self.proposer.propose(key, change).await
    }
}

impl<S: StableStore> fmt::Debug for Node<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("proposer", &self.proposer)
            .field("transports", &self.transports.read().len())
            .finish_non_exhaustive()
    }
}

impl<S: StableStore> AsRef<Self> for Node<S> {
    fn as_ref(&self) -> &Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use caspaxos_store_memory::MemoryStore;

    #[tokio::test]
    async fn test_new_node_shares_id() {
        let node = Node::new(4, MemoryStore::new(), ProposerConfig::default())
            .await
            .unwrap();

        assert_eq!(node.id(), 4);
        assert_eq!(node.acceptor().id(), 4);
        assert_eq!(node.proposer().id(), 4);
        assert!(node.transports().is_empty());
    }

    #[tokio::test]
    async fn test_new_node_restores_counter() {
        let store = MemoryStore::new();
        store
            .set_counter(b"caspaxos/proposer/2/counter", 17)
            .await
            .unwrap();

        let node = Node::new(2, store, ProposerConfig::default()).await.unwrap();

        assert_eq!(node.proposer().counter(), 17);
    }

    #[tokio::test]
    async fn test_node_without_transports_cannot_propose() {
        let node = Node::new(1, MemoryStore::new(), ProposerConfig::default())
            .await
            .unwrap();

        let result = node.propose("foo", crate::change::read_only()).await;

        assert!(matches!(
            result,
            Err(ProposeError::InsufficientAcceptors { known: 0, .. })
        ));
    }
}
