//! Shared helpers for cluster-level tests

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use caspaxos_consensus::{Node, ProposeError, ProposerConfig, mingle_nodes};
use caspaxos_store_memory::MemoryStore;
use caspaxos_transport_memory::MemoryTransport;

/// A set of mingled nodes reachable through memory transports.
pub struct TestCluster {
    pub nodes: Vec<Arc<Node<MemoryStore>>>,
    pub transports: Vec<MemoryTransport<MemoryStore>>,
}

impl TestCluster {
    /// Nodes `1..=size`, each with its own store.
    pub async fn new(size: u64) -> Self {
        Self::build(size, |_| MemoryStore::new()).await
    }

    /// Nodes `1..=size`, all on one store.
    pub async fn shared(size: u64, store: &MemoryStore) -> Self {
        Self::build(size, |_| store.clone()).await
    }

    pub async fn build(size: u64, mut store_for: impl FnMut(u64) -> MemoryStore) -> Self {
        let mut nodes = Vec::new();
        let mut transports = Vec::new();

        for id in 1..=size {
            let node = Node::new(id, store_for(id), ProposerConfig::default())
                .await
                .unwrap();
            let transport = MemoryTransport::new(node.acceptor());
            node.add_transport(Arc::new(transport.clone()));

            nodes.push(Arc::new(node));
            transports.push(transport);
        }

        mingle_nodes(&nodes);

        Self { nodes, transports }
    }

    pub fn node(&self, id: u64) -> &Node<MemoryStore> {
        &self.nodes[usize::try_from(id - 1).unwrap()]
    }

    pub fn transport(&self, id: u64) -> &MemoryTransport<MemoryStore> {
        &self.transports[usize::try_from(id - 1).unwrap()]
    }

    pub fn total_requests(&self) -> usize {
        self.transports.iter().map(MemoryTransport::request_count).sum()
    }
}

/// Re-runs `round` while it loses to competing ballots. Each lost round
/// fast-forwards the proposer's counter, so a retry outranks what it saw.
pub async fn retry<F, Fut>(mut round: F) -> Bytes
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Bytes, ProposeError>>,
{
    for _ in 0..10 {
        match round().await {
            Ok(value) => return value,
            Err(ProposeError::PrepareQuorum { .. } | ProposeError::AcceptQuorum { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    panic!("round never committed");
}
