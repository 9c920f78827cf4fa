//! # Issue Bridge Core
//!
//! Core business logic for the Issue Bridge webhook service.
//!
//! This crate contains the domain logic for receiving GitHub issue webhooks,
//! validating their signatures, resolving assignee emails through the GitHub
//! API and creating matching tasks in Asana.
//!
//! ## Architecture
//!
//! The core follows the same layering as the rest of the workspace:
//! - Business logic depends only on trait abstractions ([`github::UserResolver`],
//!   [`asana::TaskCreator`], [`webhook::SignatureVerifier`])
//! - HTTP-backed implementations are injected at runtime
//! - The HTTP framework lives in `issue-bridge-api`; nothing here depends on it
//!
//! ## Usage
//!
//! ```rust
//! use issue_bridge_core::webhook::{compute_signature, verify_signature};
//!
//! let body = br#"{"action":"opened"}"#;
//! let signature = compute_signature(b"secret", body);
//! assert!(verify_signature(body, Some(&signature), b"secret"));
//! ```

use serde::Deserialize;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Secrets
// ============================================================================

/// A string credential (token or shared secret) that must never be logged.
///
/// The inner value is wiped from memory when the last copy is dropped and
/// the `Debug` implementation always prints `<REDACTED>`.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a raw secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw secret value.
    ///
    /// Only call this at the point where the secret is handed to a
    /// cryptographic primitive or written into an outbound header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` when no secret has been configured.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<REDACTED>")
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error type for input and configuration validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },
}

/// Parse `value` as an absolute URL, reporting failures against `field`.
pub(crate) fn validate_url(field: &str, value: &str) -> Result<url::Url, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    url::Url::parse(value).map_err(|e| ValidationError::InvalidFormat {
        field: field.to_string(),
        message: e.to_string(),
    })
}

/// Fail with [`ValidationError::Required`] when `secret` is blank.
pub(crate) fn require_secret(field: &str, secret: &SecretString) -> Result<(), ValidationError> {
    if secret.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Module declarations
// ============================================================================

/// Inbound webhook model and signature verification
pub mod webhook;

/// Failures talking to the GitHub and Asana REST APIs
pub mod upstream;

/// GitHub user lookups
pub mod github;

/// Asana task creation
pub mod asana;

/// Request orchestration from verified webhook to Asana task
pub mod dispatcher;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
