//! Error types for the HTTP service

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use issue_bridge_core::{webhook::WebhookError, ValidationError};
use tracing::warn;

/// Webhook handler errors with HTTP status code mapping
///
/// Every variant is a permanent client error; upstream failures never reach
/// this type because the dispatcher folds them into its outcome.
///
/// - `400 Bad Request`: invalid signature or malformed payload
/// - `405 Method Not Allowed`: authenticated request that is not a `POST`
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    #[error(transparent)]
    Rejected(#[from] WebhookError),
}

impl WebhookHandlerError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Rejected(WebhookError::InvalidSignature) => StatusCode::BAD_REQUEST,
            Self::Rejected(WebhookError::MethodNotAllowed { .. }) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Rejected(WebhookError::InvalidPayload(_)) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message returned to the webhook sender.
    ///
    /// Parser details stay in the server log.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::Rejected(WebhookError::InvalidSignature) => "Invalid signature",
            Self::Rejected(WebhookError::MethodNotAllowed { .. }) => {
                "Only POST requests are allowed"
            }
            Self::Rejected(WebhookError::InvalidPayload(_)) => "Invalid payload",
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(error = %self, status = status.as_u16(), "Rejecting webhook request");

        let body = serde_json::json!({
            "error": self.client_message(),
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }

        response
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration loading failed: {0}")]
    Loading(#[from] config::ConfigError),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
