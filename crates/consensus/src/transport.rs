//! Transport abstraction between proposers and acceptors.
//!
//! This module provides a pluggable interface for delivering prepare and
//! accept requests, allowing the same round to run against in-process
//! acceptors or acceptors on other machines.

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::{AcceptorId, AcceptorState, Ballot};

/// Delivers requests to one acceptor.
///
/// An acceptor refusing a ballot is a successful call returning the
/// acceptor's higher ballot. `Err` is reserved for requests that could not be
/// delivered or whose reply could not be understood.
#[async_trait]
pub trait Transport: Debug + Send + Sync + 'static {
    /// The acceptor this transport reaches.
    fn acceptor_id(&self) -> AcceptorId;

    /// Ask the acceptor to promise `ballot` for `key`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request cannot be completed.
    async fn prepare(&self, ballot: Ballot, key: Bytes) -> Result<AcceptorState, TransportError>;

    /// Ask the acceptor to accept `state` under `ballot` for `key`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request cannot be completed.
    async fn accept(
        &self,
        ballot: Ballot,
        key: Bytes,
        state: Bytes,
    ) -> Result<AcceptorState, TransportError>;
}
