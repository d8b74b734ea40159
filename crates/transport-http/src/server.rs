use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use caspaxos_consensus::{Acceptor, AcceptorError, AcceptorState};
use caspaxos_store::StableStore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

use crate::config::HttpTransportConfig;
use crate::error::Error;
use crate::messages::{AcceptRequest, PrepareRequest};

/// Builds the routes serving `acceptor` at the configured paths.
pub fn acceptor_router<S: StableStore>(
    acceptor: Arc<Acceptor<S>>,
    config: &HttpTransportConfig,
) -> Router {
    Router::new()
        .route(&config.prepare_path, post(prepare::<S>))
        .route(&config.accept_path, post(accept::<S>))
        .with_state(acceptor)
}

async fn prepare<S: StableStore>(
    State(acceptor): State<Arc<Acceptor<S>>>,
    Json(request): Json<PrepareRequest>,
) -> Result<Json<AcceptorState>, HandlerError> {
    let reply = acceptor.prepare(request.ballot, &request.key).await?;
    Ok(Json(reply))
}

async fn accept<S: StableStore>(
    State(acceptor): State<Arc<Acceptor<S>>>,
    Json(request): Json<AcceptRequest>,
) -> Result<Json<AcceptorState>, HandlerError> {
    let reply = acceptor
        .accept(request.ballot, &request.key, request.state)
        .await?;
    Ok(Json(reply))
}

struct HandlerError(AcceptorError);

impl From<AcceptorError> for HandlerError {
    fn from(error: AcceptorError) -> Self {
        Self(error)
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        error!("acceptor failed: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

/// Serves one acceptor over HTTP.
pub struct HttpAcceptorServer {
    listen_addr: SocketAddr,
    router: Router,
    shutdown_token: CancellationToken,
    task_tracker: TaskTracker,
}

impl HttpAcceptorServer {
    /// Creates a new instance of `HttpAcceptorServer`.
    pub fn new<S: StableStore>(
        listen_addr: SocketAddr,
        acceptor: Arc<Acceptor<S>>,
        config: &HttpTransportConfig,
    ) -> Self {
        Self {
            listen_addr,
            router: acceptor_router(acceptor, config),
            shutdown_token: CancellationToken::new(),
            task_tracker: TaskTracker::new(),
        }
    }

    /// Binds the listen address and starts serving in the background.
    /// Returns the bound address, which differs from the configured one when
    /// port `0` was requested.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The server was already started
    /// - The listen address cannot be bound
    pub async fn start(&self) -> Result<SocketAddr, Error> {
        if self.task_tracker.is_closed() {
            return Err(Error::AlreadyStarted);
        }

        let listener = tokio::net::TcpListener::bind(self.listen_addr).await?;
        let local_addr = listener.local_addr()?;

        let router = self.router.clone();
        let shutdown_token = self.shutdown_token.clone();

        self.task_tracker.spawn(async move {
            tokio::select! {
                e = axum::serve(listener, router).into_future() => {
                    info!("acceptor http server exited {:?}", e);
                }
                () = shutdown_token.cancelled() => {}
            };
        });

        self.task_tracker.close();

        info!(%local_addr, "acceptor http server listening");
        Ok(local_addr)
    }

    /// Stops serving and waits for the server task to finish.
    pub async fn shutdown(&self) {
        info!("acceptor http server shutting down...");

        self.shutdown_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("acceptor http server shutdown");
    }
}
