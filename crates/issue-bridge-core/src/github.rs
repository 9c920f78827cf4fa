//! GitHub user lookups.
//!
//! Webhook payloads only carry the assignee's login, so the bridge asks the
//! GitHub REST API for the user's public email before creating the task.

use crate::upstream::{build_http_client, UpstreamError};
use crate::{require_secret, validate_url, SecretString, ValidationError};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

const SERVICE: &str = "github";

/// Default public GitHub REST endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// User agent sent on outbound requests unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = concat!("issue-bridge/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Configuration
// ============================================================================

/// GitHub settings: API access for user lookups and the webhook secret.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubClientConfig {
    /// Base URL of the REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Token sent as `Authorization: token <token>`
    #[serde(default)]
    pub token: SecretString,

    /// Shared secret used to sign webhook deliveries
    #[serde(default)]
    pub webhook_secret: SecretString,

    /// `User-Agent` header; GitHub rejects requests without one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional request timeout. No timeout when unset.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for GithubClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token: SecretString::default(),
            webhook_secret: SecretString::default(),
            user_agent: default_user_agent(),
            timeout_seconds: None,
        }
    }
}

impl GithubClientConfig {
    /// Check that every required value is present and well-formed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_url("github.api_base_url", &self.api_base_url)?;
        require_secret("github.token", &self.token)?;
        require_secret("github.webhook_secret", &self.webhook_secret)?;

        if self.user_agent.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "github.user_agent".to_string(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Types
// ============================================================================

/// Subset of the `GET /users/{username}` response used by the bridge
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubUser {
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl GithubUser {
    /// The user's public email, if they have published a non-empty one.
    pub fn public_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

/// Interface for mapping a GitHub login to an email address.
///
/// Absence is an expected outcome: most users keep their email private, and
/// lookup failures are reported the same way after being logged.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserResolver: Send + Sync {
    /// Resolve the public email for `username`, if any.
    async fn resolve_email(&self, username: &str) -> Option<String>;
}

// ============================================================================
// GithubUserClient
// ============================================================================

/// [`UserResolver`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GithubUserClient {
    http_client: reqwest::Client,
    base_url: url::Url,
    token: SecretString,
}

impl GithubUserClient {
    /// Build a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Configuration`] when the base URL cannot be
    /// used to build request URLs or the HTTP client cannot be created.
    pub fn new(config: &GithubClientConfig) -> Result<Self, UpstreamError> {
        let base_url =
            url::Url::parse(&config.api_base_url).map_err(|e| UpstreamError::Configuration {
                service: SERVICE,
                message: format!("invalid api_base_url: {}", e),
            })?;

        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::Configuration {
                service: SERVICE,
                message: format!("api_base_url '{}' cannot be a base URL", base_url),
            });
        }

        let http_client =
            build_http_client(SERVICE, &config.user_agent, config.timeout_seconds)?;

        Ok(Self {
            http_client,
            base_url,
            token: config.token.clone(),
        })
    }

    /// URL of the user resource, with the login percent-encoded as a path segment.
    pub fn user_url(&self, username: &str) -> url::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("users").push(username);
        }
        url
    }

    /// Fetch the user record for `username`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if:
    /// - The request cannot be sent
    /// - GitHub answers with anything other than `200 OK`
    /// - The response body cannot be parsed
    #[instrument(skip(self))]
    pub async fn fetch_user(&self, username: &str) -> Result<GithubUser, UpstreamError> {
        let url = self.user_url(username);

        let response = self
            .http_client
            .get(url)
            .header(AUTHORIZATION, format!("token {}", self.token.expose()))
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(UpstreamError::UnexpectedStatus {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<GithubUser>()
            .await
            .map_err(|e| UpstreamError::InvalidResponse {
                service: SERVICE,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl UserResolver for GithubUserClient {
    #[instrument(skip(self))]
    async fn resolve_email(&self, username: &str) -> Option<String> {
        match self.fetch_user(username).await {
            Ok(user) => match user.public_email() {
                Some(email) => {
                    debug!(username = %username, "Resolved public email for GitHub user");
                    Some(email.to_string())
                }
                None => {
                    info!(username = %username, "No public email available for GitHub user");
                    None
                }
            },
            Err(e) => {
                warn!(
                    username = %username,
                    error = %e,
                    status = ?e.status(),
                    transient = e.is_transient(),
                    "Failed to fetch user data from GitHub"
                );
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
