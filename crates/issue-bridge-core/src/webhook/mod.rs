//! # Webhook Module
//!
//! Inbound GitHub webhook model: the raw request, the headers the bridge
//! cares about, the issue payload and HMAC signature verification.

mod signature;

pub use signature::{
    compute_signature, verify_signature, HmacSignatureVerifier, SignatureVerifier,
    SIGNATURE_PREFIX,
};

use bytes::Bytes;
use serde::Deserialize;
use std::collections::HashMap;

/// Header carrying the HMAC-SHA256 signature of the request body.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Header carrying the GitHub event name (`issues`, `push`, ...).
pub const EVENT_HEADER: &str = "x-github-event";

/// Header carrying the unique GitHub delivery ID.
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// The only webhook action that produces an Asana task.
pub const OPENED_ACTION: &str = "opened";

// ============================================================================
// Core Types
// ============================================================================

/// Raw HTTP request data for one webhook delivery
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub method: String,
    pub headers: WebhookHeaders,
    pub body: Bytes,
}

impl WebhookRequest {
    /// Create new webhook request
    pub fn new(method: impl Into<String>, headers: WebhookHeaders, body: Bytes) -> Self {
        Self {
            method: method.into(),
            headers,
            body,
        }
    }

    /// Get signature from headers if present
    pub fn signature(&self) -> Option<&str> {
        self.headers.signature.as_deref()
    }

    /// Returns `true` for `POST` requests.
    pub fn is_post(&self) -> bool {
        self.method == "POST"
    }
}

/// GitHub-specific HTTP headers used while processing a delivery.
///
/// Unlike a full webhook intake service the bridge only requires the
/// signature; the event and delivery headers are kept for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub signature: Option<String>,   // X-Hub-Signature-256
    pub event_type: Option<String>,  // X-GitHub-Event
    pub delivery_id: Option<String>, // X-GitHub-Delivery
}

impl WebhookHeaders {
    /// Extract the relevant headers from a lower-cased header map.
    pub fn from_http_headers(headers: &HashMap<String, String>) -> Self {
        let lookup = |name: &str| {
            headers
                .get(name)
                .filter(|value| !value.is_empty())
                .cloned()
        };

        Self {
            signature: lookup(SIGNATURE_HEADER),
            event_type: lookup(EVENT_HEADER),
            delivery_id: lookup(DELIVERY_HEADER),
        }
    }
}

// ============================================================================
// Payload Types
// ============================================================================

/// Top-level shape of a GitHub webhook body.
///
/// Both fields stay raw JSON until the action is known, so non-qualifying
/// events are ignored whatever their shape. `issue` is `Some(Value::Null)`
/// for an explicit `null` and `None` only when the key is absent.
#[derive(Debug, Clone, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    action: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "present_value")]
    issue: Option<serde_json::Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// The parts of a GitHub issue the bridge consumes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assignee: Option<IssueUser>,
}

impl Issue {
    /// Issue body, with a missing or null body read as empty.
    pub fn notes(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    /// Login of the assignee, if the issue has one.
    pub fn assignee_login(&self) -> Option<&str> {
        self.assignee
            .as_ref()
            .map(|user| user.login.as_str())
            .filter(|login| !login.is_empty())
    }
}

/// GitHub user reference embedded in an issue payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueUser {
    pub login: String,
}

/// Classification of a parsed webhook body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// An `issues` event with `action == "opened"`.
    IssueOpened(Issue),

    /// Anything else; produces no side effects.
    Ignored,
}

impl WebhookEvent {
    /// Parse and classify a webhook body.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::InvalidPayload`] when the body is not JSON, or
    /// when an opened event carries an issue (including `null`) without the
    /// expected shape.
    pub fn from_payload(body: &[u8]) -> Result<Self, WebhookError> {
        let payload: WebhookPayload = serde_json::from_slice(body)?;

        let action = payload.action.as_ref().and_then(serde_json::Value::as_str);

        match (action, payload.issue) {
            (Some(OPENED_ACTION), Some(issue)) => {
                let issue: Issue = serde_json::from_value(issue)?;
                Ok(Self::IssueOpened(issue))
            }
            _ => Ok(Self::Ignored),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Request-level webhook failures.
///
/// Each variant is terminal for the request and is reported to the sender
/// as a 4xx response. Upstream failures are deliberately absent: they are
/// absorbed by the resolver and the task creator.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Only POST requests are allowed (got {method})")]
    MethodNotAllowed { method: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
