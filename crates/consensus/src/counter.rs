//! Durable ballot counters
//!
//! A proposer that restarts must never mint a ballot it already used, so the
//! counter is written ahead of every round when a counter store is attached.

use std::fmt;

use async_trait::async_trait;
use caspaxos_store::StableStore;
use tokio::sync::Mutex;

use crate::ProposerId;
use crate::error::BoxError;

/// Persists a proposer's ballot counter.
#[async_trait]
pub trait CounterStore: fmt::Debug + Send + Sync + 'static {
    /// Load the last persisted counter, zero if none.
    async fn load(&self) -> Result<u64, BoxError>;

    /// Persist `counter`. Values lower than one already persisted are ignored.
    async fn persist(&self, counter: u64) -> Result<(), BoxError>;
}

/// [`CounterStore`] writing into a [`StableStore`] under
/// `caspaxos/proposer/{id}/counter`.
pub struct StoreCounter<S: StableStore> {
    store: S,
    key: Vec<u8>,
    persisted: Mutex<u64>,
}

impl<S: StableStore> StoreCounter<S> {
    /// Creates a new `StoreCounter` for `proposer_id`.
    pub fn new(store: S, proposer_id: ProposerId) -> Self {
        Self {
            store,
            key: format!("caspaxos/proposer/{proposer_id}/counter").into_bytes(),
            persisted: Mutex::new(0),
        }
    }
}

impl<S: StableStore> fmt::Debug for StoreCounter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCounter")
            .field("key", &String::from_utf8_lossy(&self.key))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: StableStore> CounterStore for StoreCounter<S> {
    async fn load(&self) -> Result<u64, BoxError> {
        let mut persisted = self.persisted.lock().await;
        let counter = self.store.get_counter(&self.key).await?;
        *persisted = counter;
        Ok(counter)
    }

    async fn persist(&self, counter: u64) -> Result<(), BoxError> {
        // Held across the write so concurrent rounds cannot regress the value.
        let mut persisted = self.persisted.lock().await;
        if counter <= *persisted {
            return Ok(());
        }

        self.store.set_counter(&self.key, counter).await?;
        *persisted = counter;
        Ok(())
    }
}
