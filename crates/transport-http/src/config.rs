use std::time::Duration;

/// Per-request timeout of the client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Path prepare requests are posted to.
pub const DEFAULT_PREPARE_PATH: &str = "/caspaxos/prepare";

/// Path accept requests are posted to.
pub const DEFAULT_ACCEPT_PATH: &str = "/caspaxos/accept";

/// Configuration shared by [`HttpTransport`](crate::HttpTransport) and
/// [`acceptor_router`](crate::acceptor_router).
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Time allowed for one request, connection included.
    pub timeout: Duration,
    /// Path prepare requests are posted to.
    pub prepare_path: String,
    /// Path accept requests are posted to.
    pub accept_path: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            prepare_path: DEFAULT_PREPARE_PATH.to_string(),
            accept_path: DEFAULT_ACCEPT_PATH.to_string(),
        }
    }
}
