//! In-memory transport implementation for testing
//!
//! This transport calls an acceptor living in the same process, with a
//! switch to make it unreachable and a count of the requests it carried.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::fmt::{self, Debug};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use caspaxos_consensus::{Acceptor, AcceptorId, AcceptorState, Ballot, Transport, TransportError};
use caspaxos_store::StableStore;
use tracing::debug;

/// Memory transport implementation
///
/// Clones share the reachability switch and the request counter.
pub struct MemoryTransport<S: StableStore> {
    acceptor: Arc<Acceptor<S>>,
    reachable: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
}

impl<S: StableStore> MemoryTransport<S> {
    /// Create a new memory transport reaching `acceptor`
    #[must_use]
    pub fn new(acceptor: Arc<Acceptor<S>>) -> Self {
        Self {
            acceptor,
            reachable: Arc::new(AtomicBool::new(true)),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every following request fail with `TransportError::Unreachable`
    pub fn disconnect(&self) {
        debug!(acceptor = self.acceptor.id(), "memory transport disconnected");
        self.reachable.store(false, Ordering::SeqCst);
    }

    /// Undo [`disconnect`](Self::disconnect)
    pub fn reconnect(&self) {
        debug!(acceptor = self.acceptor.id(), "memory transport reconnected");
        self.reachable.store(true, Ordering::SeqCst);
    }

    /// Whether requests currently reach the acceptor
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    /// Requests attempted through this transport, delivered or not
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<(), TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if self.is_connected() {
            Ok(())
        } else {
            Err(TransportError::Unreachable {
                acceptor: self.acceptor.id(),
            })
        }
    }
}

impl<S: StableStore> Clone for MemoryTransport<S> {
    fn clone(&self) -> Self {
        Self {
            acceptor: Arc::clone(&self.acceptor),
            reachable: Arc::clone(&self.reachable),
            requests: Arc::clone(&self.requests),
        }
    }
}

impl<S: StableStore> Debug for MemoryTransport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("acceptor", &self.acceptor.id())
            .field("connected", &self.is_connected())
            .field("requests", &self.request_count())
            .finish()
    }
}

#[async_trait]
impl<S: StableStore> Transport for MemoryTransport<S> {
    fn acceptor_id(&self) -> AcceptorId {
        self.acceptor.id()
    }

    async fn prepare(&self, ballot: Ballot, key: Bytes) -> Result<AcceptorState, TransportError> {
        self.begin()?;

        self.acceptor
            .prepare(ballot, &key)
            .await
            .map_err(|e| TransportError::Acceptor(e.to_string()))
    }

    async fn accept(
        &self,
        ballot: Ballot,
        key: Bytes,
        state: Bytes,
    ) -> Result<AcceptorState, TransportError> {
        self.begin()?;

        self.acceptor
            .accept(ballot, &key, state)
            .await
            .map_err(|e| TransportError::Acceptor(e.to_string()))
    }
}
