use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use caspaxos_consensus::{AcceptorId, AcceptorState, Ballot, Transport, TransportError};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::HttpTransportConfig;
use crate::error::Error;
use crate::messages::{AcceptRequest, PrepareRequest};

/// Reaches one acceptor served by an [`HttpAcceptorServer`](crate::HttpAcceptorServer).
#[derive(Clone, Debug)]
pub struct HttpTransport {
    acceptor_id: AcceptorId,
    prepare_url: Url,
    accept_url: Url,
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a new `HttpTransport` for the acceptor served at `base_url`.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The endpoint URLs cannot be built from `base_url`
    /// - The HTTP client cannot be built
    pub fn new(
        acceptor_id: AcceptorId,
        base_url: &Url,
        config: &HttpTransportConfig,
    ) -> Result<Self, Error> {
        let base = base_url.as_str().trim_end_matches('/');
        let prepare_url = Url::parse(&format!("{base}{}", config.prepare_path))?;
        let accept_url = Url::parse(&format!("{base}{}", config.accept_path))?;

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            acceptor_id,
            prepare_url,
            accept_url,
            client,
            timeout: config.timeout,
        })
    }

    async fn post<T: Serialize + Sync>(
        &self,
        url: &Url,
        body: &T,
    ) -> Result<AcceptorState, TransportError> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(acceptor = self.acceptor_id, %url, %status, "acceptor answered with an error");
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.request_error(e))?;

        serde_json::from_slice(&body).map_err(|e| TransportError::MalformedResponse(e.to_string()))
    }

    fn request_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if error.is_connect() {
            TransportError::ConnectionFailed(error.to_string())
        } else {
            TransportError::Other(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn acceptor_id(&self) -> AcceptorId {
        self.acceptor_id
    }

    async fn prepare(&self, ballot: Ballot, key: Bytes) -> Result<AcceptorState, TransportError> {
        self.post(&self.prepare_url, &PrepareRequest { ballot, key })
            .await
    }

    async fn accept(
        &self,
        ballot: Ballot,
        key: Bytes,
        state: Bytes,
    ) -> Result<AcceptorState, TransportError> {
        self.post(&self.accept_url, &AcceptRequest { ballot, key, state })
            .await
    }
}
