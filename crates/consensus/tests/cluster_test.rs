//! Cluster-level behaviour of proposers and acceptors over memory transports

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use bytes::Bytes;
use caspaxos_consensus::change::{read_only, set};
use caspaxos_consensus::{BoxError, Node, ProposeError, ProposerConfig, mingle_nodes};
use caspaxos_store::StableStore;
use caspaxos_store_memory::MemoryStore;
use caspaxos_transport_memory::MemoryTransport;
use common::{TestCluster, retry};
use tracing_test::traced_test;

#[tokio::test]
async fn test_propose_without_acceptors() {
    let node = Node::new(1, MemoryStore::new(), ProposerConfig::default())
        .await
        .unwrap();

    let result = node.propose("foo", read_only()).await;

    assert_matches!(
        result,
        Err(ProposeError::InsufficientAcceptors { known: 0, required: 3 })
    );
}

#[tokio::test]
async fn test_two_acceptors_are_not_enough() {
    let cluster = TestCluster::new(2).await;

    let result = cluster.node(1).propose("foo", set("bar")).await;

    assert_matches!(
        result,
        Err(ProposeError::InsufficientAcceptors { known: 2, required: 3 })
    );
    assert_eq!(cluster.total_requests(), 0);
}

#[tokio::test]
async fn test_read_missing_key_on_shared_store() {
    let store = MemoryStore::new();
    let cluster = TestCluster::shared(4, &store).await;

    let value = cluster.node(2).propose("foo", read_only()).await.unwrap();

    assert_eq!(value, Bytes::new());
}

#[tokio::test]
async fn test_set_then_read_on_shared_store() {
    let store = MemoryStore::new();
    let cluster = TestCluster::shared(4, &store).await;

    let written = cluster.node(1).propose("foo", set("hawking")).await.unwrap();
    let read = cluster.node(1).propose("foo", read_only()).await.unwrap();

    assert_eq!(written, Bytes::from_static(b"hawking"));
    assert_eq!(read, Bytes::from_static(b"hawking"));
    assert_eq!(
        store.get(b"foo").await.unwrap(),
        Some(Bytes::from_static(b"hawking"))
    );
}

#[tokio::test]
async fn test_setting_same_value_is_idempotent() {
    let store = MemoryStore::new();
    let cluster = TestCluster::shared(3, &store).await;

    cluster.node(1).propose("foo", set("bar")).await.unwrap();
    let again = cluster.node(1).propose("foo", set("bar")).await.unwrap();

    assert_eq!(again, Bytes::from_static(b"bar"));
    assert_eq!(cluster.node(1).proposer().counter(), 2);
    assert_eq!(
        store.get(b"foo").await.unwrap(),
        Some(Bytes::from_static(b"bar"))
    );
}

#[tokio::test]
async fn test_read_prepopulated_key() {
    let store = MemoryStore::with_entries([("Bob", "Marley")]);
    let cluster = TestCluster::shared(4, &store).await;

    let value = cluster.node(1).propose("Bob", read_only()).await.unwrap();

    assert_eq!(value, Bytes::from_static(b"Marley"));
    assert_eq!(
        store.get(b"Bob").await.unwrap(),
        Some(Bytes::from_static(b"Marley"))
    );
}

#[tokio::test]
#[traced_test]
async fn test_set_is_visible_from_every_node() {
    let cluster = TestCluster::new(4).await;

    let written = cluster
        .node(1)
        .propose("stephen", set("hawking"))
        .await
        .unwrap();
    assert_eq!(written, Bytes::from_static(b"hawking"));

    for id in 1..=4 {
        let read = retry(|| cluster.node(id).propose("stephen", read_only())).await;
        assert_eq!(read, Bytes::from_static(b"hawking"));
    }
}

#[tokio::test]
async fn test_repeated_reads_agree() {
    let cluster = TestCluster::new(3).await;
    cluster.node(3).propose("foo", set("bar")).await.unwrap();

    let first = retry(|| cluster.node(1).propose("foo", read_only())).await;
    let second = retry(|| cluster.node(2).propose("foo", read_only())).await;

    assert_eq!(first, Bytes::from_static(b"bar"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_keys_are_independent_registers() {
    let cluster = TestCluster::new(3).await;

    cluster.node(1).propose("a", set("1")).await.unwrap();
    cluster.node(2).propose("b", set("2")).await.unwrap();

    assert_eq!(
        retry(|| cluster.node(3).propose("a", read_only())).await,
        Bytes::from_static(b"1")
    );
    assert_eq!(
        retry(|| cluster.node(3).propose("b", read_only())).await,
        Bytes::from_static(b"2")
    );
}

#[tokio::test]
#[traced_test]
async fn test_partition_and_recovery() {
    let cluster = TestCluster::new(5).await;
    cluster.node(1).propose("foo", set("before")).await.unwrap();

    cluster.transport(4).disconnect();
    cluster.transport(5).disconnect();
    let during = cluster.node(1).propose("foo", set("during")).await.unwrap();
    assert_eq!(during, Bytes::from_static(b"during"));

    cluster.transport(3).disconnect();
    let result = cluster.node(2).propose("foo", set("lost")).await;
    assert_matches!(result, Err(ProposeError::PrepareQuorum { required: 3, .. }));

    for id in 3..=5 {
        cluster.transport(id).reconnect();
    }
    let after = retry(|| cluster.node(5).propose("foo", read_only())).await;
    assert_eq!(after, Bytes::from_static(b"during"));
}

#[tokio::test]
async fn test_change_function_failure_commits_nothing() {
    let cluster = TestCluster::new(3).await;
    cluster.node(1).propose("foo", set("kept")).await.unwrap();

    let result = cluster
        .node(2)
        .propose("foo", |_: &[u8], _: Bytes| Err::<Bytes, _>("refused"))
        .await;
    assert_matches!(result, Err(ProposeError::ChangeFunction(_)));

    let value = retry(|| cluster.node(3).propose("foo", read_only())).await;
    assert_eq!(value, Bytes::from_static(b"kept"));
}

/// Adds `token` to a comma separated set unless it is already there.
fn append_once(token: String) -> impl FnOnce(&[u8], Bytes) -> Result<Bytes, BoxError> + Send {
    move |_: &[u8], current: Bytes| {
        let current = std::str::from_utf8(&current)?;
        if current.split(',').any(|t| t == token) {
            return Ok(Bytes::copy_from_slice(current.as_bytes()));
        }
        let next = if current.is_empty() {
            token
        } else {
            format!("{current},{token}")
        };
        Ok(Bytes::from(next))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_proposers_lose_nothing() {
    let cluster = Arc::new(TestCluster::new(3).await);
    let mut tasks = Vec::new();

    for id in 1..=3_u64 {
        for n in 0..5 {
            let cluster = Arc::clone(&cluster);
            tasks.push(tokio::spawn(async move {
                let token = format!("{id}-{n}");
                for attempt in 1..=200_u64 {
                    let result = cluster
                        .node(id)
                        .propose("log", append_once(token.clone()))
                        .await;
                    match result {
                        Ok(_) => return,
                        Err(
                            ProposeError::PrepareQuorum { .. } | ProposeError::AcceptQuorum { .. },
                        ) => {
                            let pause = Duration::from_millis(attempt % 7 * id);
                            tokio::time::sleep(pause).await;
                        }
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
                panic!("{token} never committed");
            }));
        }
    }

    for task in tasks {
        task.await.unwrap();
    }

    let log = retry(|| cluster.node(1).propose("log", read_only())).await;
    let tokens: Vec<_> = std::str::from_utf8(&log)
        .unwrap()
        .split(',')
        .map(str::to_owned)
        .collect();
    let unique: BTreeSet<_> = tokens.iter().cloned().collect();

    assert_eq!(tokens.len(), 15);
    assert_eq!(unique.len(), 15);
}

#[tokio::test]
async fn test_restarted_node_outranks_its_old_ballots() {
    let stores: Vec<_> = (0..3).map(|_| MemoryStore::new()).collect();
    let cluster =
        TestCluster::build(3, |id| stores[usize::try_from(id - 1).unwrap()].clone()).await;

    for _ in 0..3 {
        cluster.node(1).propose("foo", set("old")).await.unwrap();
    }
    let before = cluster.node(1).proposer().counter();

    // Same id and store, fresh process state
    let restarted = Node::new(1, stores[0].clone(), ProposerConfig::default())
        .await
        .unwrap();
    assert_eq!(restarted.proposer().counter(), before);

    restarted
        .proposer()
        .add_acceptors(cluster.nodes.iter().flat_map(|node| node.transports()));
    let value = restarted.propose("foo", set("new")).await.unwrap();

    assert_eq!(value, Bytes::from_static(b"new"));
    assert_eq!(restarted.proposer().counter(), before + 1);
}

#[tokio::test]
async fn test_mingle_is_idempotent() {
    let cluster = TestCluster::new(4).await;

    mingle_nodes(&cluster.nodes);

    for node in &cluster.nodes {
        assert_eq!(node.proposer().acceptors().len(), 4);
    }
}

#[tokio::test]
async fn test_mingle_picks_up_late_transports() {
    let nodes: Vec<_> = bare_nodes(3).await;
    mingle_nodes(&nodes);
    assert!(nodes.iter().all(|node| node.proposer().acceptors().is_empty()));

    for node in &nodes {
        node.add_transport(Arc::new(MemoryTransport::new(node.acceptor())));
    }
    mingle_nodes(&nodes);

    assert!(nodes.iter().all(|node| node.proposer().acceptors().len() == 3));
    nodes[0].propose("foo", set("bar")).await.unwrap();
}

async fn bare_nodes(size: u64) -> Vec<Node<MemoryStore>> {
    let mut nodes = Vec::new();
    for id in 1..=size {
        nodes.push(
            Node::new(id, MemoryStore::new(), ProposerConfig::default())
                .await
                .unwrap(),
        );
    }
    nodes
}
