use caspaxos_store::StableStoreError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
#[error("Store error")]
pub struct Error;

impl StableStoreError for Error {}
