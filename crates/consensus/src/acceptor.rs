//! Acceptor state machine
//!
//! For every key the acceptor keeps the highest ballot it promised, the
//! ballot of the last value it accepted, and that value. Values live in the
//! stable store under the key itself, ballots live in the counter namespace
//! under keys scoped by the acceptor id, so several acceptors can share one
//! store without observing each other's promises.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use caspaxos_store::{StableStore, StableStoreError};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::AcceptorError;
use crate::{AcceptorId, AcceptorState, Ballot};

#[derive(Clone, Copy, Debug)]
enum Slot {
    Promised,
    Accepted,
}

impl Slot {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Promised => "promised",
            Self::Accepted => "accepted",
        }
    }
}

/// One replica guarding its copy of every key's state.
pub struct Acceptor<S: StableStore> {
    id: AcceptorId,
    store: S,
    key_locks: DashMap<Bytes, Arc<Mutex<()>>>,
}

impl<S: StableStore> fmt::Debug for Acceptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acceptor")
            .field("id", &self.id)
            .field("locked_keys", &self.key_locks.len())
            .finish_non_exhaustive()
    }
}

impl<S: StableStore> Acceptor<S> {
    /// Creates a new `Acceptor` backed by `store`.
    pub fn new(id: AcceptorId, store: S) -> Self {
        Self {
            id,
            store,
            key_locks: DashMap::new(),
        }
    }

    /// The acceptor's id.
    pub const fn id(&self) -> AcceptorId {
        self.id
    }

    /// The backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Handles a prepare for `key`.
    ///
    /// A ballot strictly greater than the current promise is promised and the
    /// reply carries the last accepted ballot and value. Otherwise the reply
    /// carries the current promise, which is greater than or equal to
    /// `ballot`, and nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `AcceptorError::Store` if the store fails.
    pub async fn prepare(
        &self,
        ballot: Ballot,
        key: &[u8],
    ) -> Result<AcceptorState, AcceptorError> {
        let _guard = self.lock_key(key).await;

        let promised = self.load_ballot(Slot::Promised, key).await?;
        let state = self.load_state(key).await?;

        if ballot <= promised {
            debug!(acceptor = self.id, %ballot, %promised, "prepare rejected");
            return Ok(AcceptorState::new(promised, state));
        }

        let accepted = self.load_ballot(Slot::Accepted, key).await?;
        self.store_ballot(Slot::Promised, key, ballot).await?;

        debug!(acceptor = self.id, %ballot, %accepted, "promised");
        Ok(AcceptorState::new(accepted, state))
    }

    /// Handles an accept of `state` for `key`.
    ///
    /// A ballot greater than or equal to the current promise seals `state`
    /// under `ballot` and the reply echoes both. Otherwise the reply carries
    /// the current, strictly greater promise and nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `AcceptorError::Store` if the store fails.
    pub async fn accept(
        &self,
        ballot: Ballot,
        key: &[u8],
        state: Bytes,
    ) -> Result<AcceptorState, AcceptorError> {
        let _guard = self.lock_key(key).await;

        let promised = self.load_ballot(Slot::Promised, key).await?;

        if ballot < promised {
            let current = self.load_state(key).await?;
            debug!(acceptor = self.id, %ballot, %promised, "accept rejected");
            return Ok(AcceptorState::new(promised, current));
        }

        self.store
            .set(key, state.clone())
            .await
            .map_err(store_error)?;
        self.store_ballot(Slot::Accepted, key, ballot).await?;
        self.store_ballot(Slot::Promised, key, ballot).await?;

        debug!(acceptor = self.id, %ballot, len = state.len(), "accepted");
        Ok(AcceptorState::new(ballot, state))
    }

    async fn lock_key(&self, key: &[u8]) -> KeyGuard<'_> {
        let key = Bytes::copy_from_slice(key);
        let lock = self.key_locks.entry(key.clone()).or_default().clone();

        KeyGuard {
            locks: &self.key_locks,
            key,
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn load_state(&self, key: &[u8]) -> Result<Bytes, AcceptorError> {
        let state = self.store.get(key).await.map_err(store_error)?;
        Ok(state.unwrap_or_default())
    }

    async fn load_ballot(&self, slot: Slot, key: &[u8]) -> Result<Ballot, AcceptorError> {
        let (counter_key, proposer_key) = self.ballot_keys(slot, key);

        let counter = self
            .store
            .get_counter(&counter_key)
            .await
            .map_err(store_error)?;
        let proposer_id = self
            .store
            .get_counter(&proposer_key)
            .await
            .map_err(store_error)?;

        Ok(Ballot::new(counter, proposer_id))
    }

    async fn store_ballot(
        &self,
        slot: Slot,
        key: &[u8],
        ballot: Ballot,
    ) -> Result<(), AcceptorError> {
        let (counter_key, proposer_key) = self.ballot_keys(slot, key);

        self.store
            .set_counter(&counter_key, ballot.counter)
            .await
            .map_err(store_error)?;
        self.store
            .set_counter(&proposer_key, ballot.proposer_id)
            .await
            .map_err(store_error)
    }

    fn ballot_keys(&self, slot: Slot, key: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let prefix = format!("caspaxos/acceptor/{}/{}", self.id, slot.as_str());

        (
            [prefix.as_bytes(), b"/counter/", key].concat(),
            [prefix.as_bytes(), b"/proposer/", key].concat(),
        )
    }
}

/// Holds one key's lock. The map entry is removed on drop unless another
/// request is holding or waiting for the same lock.
struct KeyGuard<'a> {
    locks: &'a DashMap<Bytes, Arc<Mutex<()>>>,
    key: Bytes,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn store_error<E: StableStoreError>(error: E) -> AcceptorError {
    AcceptorError::Store(Box::new(error))
}
