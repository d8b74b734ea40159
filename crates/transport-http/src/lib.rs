//! HTTP transport between proposers and acceptors.
//!
//! Requests are JSON `POST`s to `{base}/caspaxos/prepare` and
//! `{base}/caspaxos/accept`; both answer `200` with the acceptor's
//! [`AcceptorState`](caspaxos_consensus::AcceptorState) as JSON. Anything
//! else is a transport failure.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod client;
mod config;
mod error;
mod messages;
mod server;

pub use client::HttpTransport;
pub use config::{DEFAULT_ACCEPT_PATH, DEFAULT_PREPARE_PATH, DEFAULT_TIMEOUT, HttpTransportConfig};
pub use error::Error;
pub use messages::{AcceptRequest, PrepareRequest};
pub use server::{HttpAcceptorServer, acceptor_router};
