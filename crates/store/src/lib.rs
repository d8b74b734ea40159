//! Abstract interface for the durable map backing acceptors and proposer
//! ballot counters.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

/// Marker trait for `StableStore` errors
pub trait StableStoreError: Debug + Error + Send + Sync + 'static {}

/// A trait representing a durable key-value store with separate byte and
/// counter namespaces.
///
/// Implementations must provide read-your-writes consistency for a single
/// process. Callers that need a read-modify-write to be atomic (the acceptor
/// does) serialize access to a key themselves.
///
/// # Required Methods
/// - `get`: Retrieves the bytes stored under a key, `None` if absent.
/// - `set`: Stores bytes under a key.
/// - `get_counter`: Retrieves the counter stored under a key, zero if absent.
/// - `set_counter`: Stores a counter under a key.
#[async_trait]
pub trait StableStore: Clone + Send + Sync + 'static {
    /// The error type for store operations.
    type Error: StableStoreError;

    /// Retrieves the bytes stored under `key`.
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>, Self::Error>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &[u8], value: Bytes) -> Result<(), Self::Error>;

    /// Retrieves the counter stored under `key`. Absent counters read as zero.
    async fn get_counter(&self, key: &[u8]) -> Result<u64, Self::Error>;

    /// Stores the counter `value` under `key`.
    async fn set_counter(&self, key: &[u8], value: u64) -> Result<(), Self::Error>;
}
