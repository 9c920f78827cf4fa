//! # Issue Bridge HTTP Service
//!
//! HTTP server that receives GitHub issue webhooks and turns opened issues
//! into Asana tasks.
//!
//! This service provides:
//! - The webhook endpoint (signature validation, dispatch, response shaping)
//! - A health check endpoint
//! - Request logging with correlation IDs

pub mod config;
pub mod errors;
pub mod responses;

pub use config::{LoggingConfig, ServerConfig, ServiceConfig, WebhookConfig};
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};
pub use responses::{HealthResponse, WebhookResponse};

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Router,
};
use bytes::Bytes;
use issue_bridge_core::{
    dispatcher::{DispatchOutcome, WebhookDispatcher},
    webhook::{WebhookHeaders, WebhookRequest},
};
use std::{collections::HashMap, future::IntoFuture, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

/// Header used to correlate log lines for one request
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Webhook dispatcher wired to the GitHub and Asana clients
    pub dispatcher: Arc<WebhookDispatcher>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ServiceConfig, dispatcher: WebhookDispatcher) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
///
/// The webhook route accepts every method so that signature verification
/// runs before the method check, matching the dispatcher's ordering.
pub fn create_router(state: AppState) -> Router {
    let webhook_path = state.config.webhooks.endpoint_path.clone();

    Router::new()
        .route(&webhook_path, any(handle_webhook))
        .route("/health", get(handle_health_check))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start HTTP server
///
/// The configuration is validated before anything is bound.
pub async fn start_server(
    config: ServiceConfig,
    dispatcher: WebhookDispatcher,
) -> Result<(), ServiceError> {
    config.validate()?;

    let address = format!("{}:{}", config.server.host, config.server.port);
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);

    let app = create_router(AppState::new(config, dispatcher));

    let listener =
        tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: address.clone(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", address);

    // Fires once a shutdown signal has been received so the drain can be bounded.
    let (draining_tx, mut draining_rx) = tokio::sync::watch::channel(false);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!(
            "Initiating graceful shutdown with {}s timeout",
            shutdown_timeout.as_secs()
        );
        let _ = draining_tx.send(true);
    })
    .into_future();

    let drain_deadline = async move {
        while !*draining_rx.borrow_and_update() {
            if draining_rx.changed().await.is_err() {
                // The server finished without a signal; nothing to bound.
                std::future::pending::<()>().await;
            }
        }
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!("Graceful shutdown timed out; dropping in-flight requests");
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Handle GitHub webhook requests
///
/// Responses:
/// - `201 Created` with the Asana result when an opened issue was processed
/// - `200 OK` with `{"status": "ignored"}` for every other event
/// - `400` / `405` via [`WebhookHandlerError`]
#[instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookHandlerError> {
    info!("Received webhook request");

    let header_map: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_lowercase(),
                v.to_str().unwrap_or("").to_string(),
            )
        })
        .collect();

    let webhook_request = WebhookRequest::new(
        method.as_str(),
        WebhookHeaders::from_http_headers(&header_map),
        body,
    );

    let response = match state.dispatcher.dispatch(&webhook_request).await? {
        DispatchOutcome::Ignored => {
            (StatusCode::OK, Json(WebhookResponse::ignored())).into_response()
        }
        DispatchOutcome::TaskSubmitted { task, .. } => {
            if !task.is_created() {
                warn!("Asana task creation failed; reporting error inline");
            }
            (StatusCode::CREATED, Json(WebhookResponse::submitted(task))).into_response()
        }
    };

    Ok(response)
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Basic health check endpoint
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
///
/// This middleware:
/// - Extracts or generates correlation IDs for request tracking
/// - Logs request start and completion with structured fields
/// - Propagates correlation ID through response headers
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());

    request.extensions_mut().insert(correlation_id.clone());

    info!(
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
        "Request started"
    );

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
