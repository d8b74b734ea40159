//! In-memory (single process) implementation of the acceptor stable store
//! for tests and local clusters.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use caspaxos_store::StableStore;
use tokio::sync::Mutex;

/// In-memory stable store.
///
/// Clones share the same underlying maps.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<Vec<u8>, Bytes>>>,
    counters: Arc<Mutex<HashMap<Vec<u8>, u64>>>,
}

impl MemoryStore {
    /// Creates a new, empty `MemoryStore`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `MemoryStore` pre-populated with the given values.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Vec<u8>>,
        V: Into<Bytes>,
    {
        let values = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        Self {
            values: Arc::new(Mutex::new(values)),
            counters: Arc::default(),
        }
    }
}

#[async_trait]
impl StableStore for MemoryStore {
    type Error = Error;

    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>, Self::Error> {
        let values = self.values.lock().await;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &[u8], value: Bytes) -> Result<(), Self::Error> {
        self.values.lock().await.insert(key.to_vec(), value);
        Ok(())
    }

    async fn get_counter(&self, key: &[u8]) -> Result<u64, Self::Error> {
        let counters = self.counters.lock().await;
        Ok(counters.get(key).copied().unwrap_or_default())
    }

    async fn set_counter(&self, key: &[u8], value: u64) -> Result<(), Self::Error> {
        self.counters.lock().await.insert(key.to_vec(), value);
        Ok(())
    }
}
