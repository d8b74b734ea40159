use thiserror::Error;

/// Errors that can occur in this crate.
///
/// Failures of individual requests are reported to the proposer as
/// [`TransportError`](caspaxos_consensus::TransportError) instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The server has already been started.
    #[error("The server has already been started")]
    AlreadyStarted,

    /// Failed to bind to address.
    #[error("Failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The acceptor URL is not usable.
    #[error("Invalid acceptor URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
