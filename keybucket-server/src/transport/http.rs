//! HTTP/JSON transport
//!
//! # API Endpoints
//!
//! ## POST /consume
//!
//! Take tokens from a key's bucket.
//!
//! ### Request Body
//!
//! ```json
//! {
//!   "key": "user:123",
//!   "quantity": 1
//! }
//! ```
//!
//! - `quantity` is optional (defaults to 1)
//!
//! ### Responses
//!
//! - `200 OK`: tokens taken, body is a [`ConsumeResponse`]
//! - `429 Too Many Requests`: bucket too low, same body plus a `Retry-After`
//!   header in whole seconds
//! - `400 Bad Request`: empty or oversized key, or a quantity above capacity
//!
//! Both `200` and `429` carry `x-ratelimit-limit` and `x-ratelimit-remaining`.
//!
//! ## GET /health
//!
//! Health check endpoint. Returns "OK" with 200 status.
//!
//! ## GET /metrics
//!
//! Counters in Prometheus text format.

use crate::limiter::Limiter;
use crate::metrics::{Metrics, StoreSnapshot};
use crate::types::{ConsumeRequest, ConsumeResponse, ErrorResponse};
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use keybucket::{Clock, Decision, SystemClock};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Shared state behind every request
pub struct AppState<C = SystemClock> {
    pub limiter: Limiter<C>,
    pub metrics: Metrics,
    pub max_key_len: usize,
}

impl<C: Clock> AppState<C> {
    pub fn new(limiter: Limiter<C>, max_key_len: usize) -> Self {
        AppState {
            limiter,
            metrics: Metrics::new(),
            max_key_len,
        }
    }
}

/// HTTP transport implementation
pub struct HttpTransport {
    addr: SocketAddr,
}

impl HttpTransport {
    /// `host` must be an IP address literal
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;
        Ok(Self { addr })
    }

    /// Serve until Ctrl-C
    pub async fn start<C: Clock + 'static>(self, state: Arc<AppState<C>>) -> Result<()> {
        let app = router(state);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        tracing::info!("HTTP server listening on {}", self.addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the router for the given state
pub fn router<C: Clock + 'static>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/consume", post(handle_consume::<C>))
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(handle_metrics::<C>))
        .with_state(state)
}

async fn handle_consume<C: Clock + 'static>(
    State(state): State<Arc<AppState<C>>>,
    Json(req): Json<ConsumeRequest>,
) -> Response {
    if req.key.is_empty() {
        return reject(&state, "key must not be empty".to_string());
    }
    if req.key.len() > state.max_key_len {
        return reject(&state, format!("key exceeds {} bytes", state.max_key_len));
    }

    match state.limiter.consume(&req.key, req.quantity.unwrap_or(1)) {
        Ok(decision) => {
            state.metrics.record_decision(decision.allowed);
            decision_response(decision)
        }
        Err(e) => reject(&state, e.to_string()),
    }
}

async fn handle_metrics<C: Clock + 'static>(
    State(state): State<Arc<AppState<C>>>,
) -> impl IntoResponse {
    let body = state.metrics.export_prometheus(StoreSnapshot {
        tracked_keys: state.limiter.len(),
        evicted_total: state.limiter.evicted_total(),
    });
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

fn decision_response(decision: Decision) -> Response {
    let status = if decision.allowed {
        StatusCode::OK
    } else {
        StatusCode::TOO_MANY_REQUESTS
    };

    let mut response = (status, Json(ConsumeResponse::from(decision))).into_response();
    let headers = response.headers_mut();
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    if !decision.allowed {
        headers.insert(
            header::RETRY_AFTER,
            HeaderValue::from(retry_after_secs(decision.retry_after)),
        );
    }
    response
}

fn reject<C>(state: &AppState<C>, error: String) -> Response {
    state.metrics.record_rejected();
    tracing::debug!("Rejected request: {}", error);
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
}

/// Whole seconds for `Retry-After`, rounded up so clients never retry early
fn retry_after_secs(wait: Duration) -> u64 {
    wait.as_millis().div_ceil(1000) as u64
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
