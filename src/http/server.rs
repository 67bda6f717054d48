//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID)
//! - Bind server to listener
//! - Publish reloaded config to request handlers
//! - Dispatch uploads to the relay orchestrator
//!
//! # Design Decisions
//! - Handlers read one config snapshot per request through ArcSwap
//! - Listener, body limit, inbound timeout and concurrency are fixed at
//!   startup; reloads change the upstream side only

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RelayConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::{configuration_error_response, outcome_response};
use crate::http::upload::read_submission;
use crate::relay::RelayOrchestrator;
use crate::submission::Spooler;

const INDEX_HTML: &str = include_str!("../../static/index.html");
const MAIN_JS: &str = include_str!("../../static/main.js");

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<RelayConfig>>,
    pub orchestrator: Arc<RelayOrchestrator>,
}

/// HTTP server for the upload relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: RelayConfig, orchestrator: RelayOrchestrator) -> Self {
        let state = AppState {
            config: Arc::new(ArcSwap::from_pointee(config)),
            orchestrator: Arc::new(orchestrator),
        };
        let router = Self::build_router(&state.config.load(), state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(index_handler).post(upload_handler))
            .route("/static/main.js", get(script_handler))
            .route("/mock-api", post(mock_api_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
            .layer(TimeoutLayer::new(config.timeouts.request()))
            .layer(ConcurrencyLimitLayer::new(config.listener.max_concurrent_requests))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id(request.headers()),
                    )
                }),
            )
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// Handle to the live configuration.
    pub fn config_handle(&self) -> Arc<ArcSwap<RelayConfig>> {
        self.state.config.clone()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configs arriving on `config_updates` replace the live snapshot; the
    /// server drains in-flight requests and returns once `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let handle = self.state.config.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                tracing::info!(
                    api_client = %config.upstream.api_client,
                    api_url = %config.upstream.api_url,
                    "Applying reloaded configuration"
                );
                handle.store(Arc::new(config));
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        MAIN_JS,
    )
}

async fn upload_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let config = state.config.load_full();
    let spooler = Spooler::from_config(&config);

    let raw = match read_submission(request, &spooler).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable upload request");
            return e.into_response();
        }
    };

    match state.orchestrator.relay(&config, raw).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => configuration_error_response(&e),
    }
}

/// Stand-in downstream endpoint: drains the body and acknowledges it.
async fn mock_api_handler(body: Body) -> impl IntoResponse {
    let mut stream = body.into_data_stream();
    let mut received = 0usize;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => received += bytes.len(),
            Err(e) => {
                tracing::warn!(error = %e, "Mock API body read failed");
                return (StatusCode::BAD_REQUEST, "Bad Request");
            }
        }
    }
    tracing::debug!(bytes = received, "Mock API received upload");
    (StatusCode::OK, "OK")
}
