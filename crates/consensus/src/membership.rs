//! Static cluster assembly

use caspaxos_store::StableStore;
use tracing::debug;

use crate::Node;

/// Makes every node's proposer aware of every node's acceptor, its own
/// included, using the transports registered on each node.
///
/// Acceptors already known to a proposer are skipped, so calling this again
/// after more transports were registered only adds what is new.
pub fn mingle_nodes<S, N>(nodes: &[N])
where
    S: StableStore,
    N: AsRef<Node<S>>,
{
    for node in nodes {
        let node = node.as_ref();
        for peer in nodes {
            let added = node
                .proposer()
                .add_acceptors(peer.as_ref().transports());
            if added > 0 {
                debug!(node = node.id(), peer = peer.as_ref().id(), added, "acceptors added");
            }
        }
    }
}
