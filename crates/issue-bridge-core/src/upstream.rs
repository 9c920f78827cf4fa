//! Failures talking to the GitHub and Asana REST APIs.
//!
//! These errors never reach the webhook sender. The resolver converts them
//! into "no email" and the task creator into an inline error payload.

/// Error talking to an upstream REST API.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The upstream answered with a status other than the expected one.
    #[error("{service} returned HTTP {status}: {message}")]
    UnexpectedStatus {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The request never completed (connection, TLS, timeout).
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The response body could not be decoded.
    #[error("{service} returned an unreadable response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    /// The client could not be constructed from its configuration.
    #[error("{service} client configuration is invalid: {message}")]
    Configuration {
        service: &'static str,
        message: String,
    },
}

impl UpstreamError {
    /// Name of the upstream service the error came from.
    pub fn service(&self) -> &'static str {
        match self {
            Self::UnexpectedStatus { service, .. }
            | Self::Transport { service, .. }
            | Self::InvalidResponse { service, .. }
            | Self::Configuration { service, .. } => service,
        }
    }

    /// HTTP status returned by the upstream, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if the failure is plausibly temporary.
    ///
    /// Nothing in the bridge retries, but the classification is logged so
    /// operators can tell outages from misconfiguration.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Transport { .. } => true,
            Self::InvalidResponse { .. } => false,
            Self::Configuration { .. } => false,
        }
    }
}

/// Build a shared `reqwest` client with an optional request timeout.
pub(crate) fn build_http_client(
    service: &'static str,
    user_agent: &str,
    timeout_seconds: Option<u64>,
) -> Result<reqwest::Client, UpstreamError> {
    let mut builder = reqwest::Client::builder().user_agent(user_agent);
    if let Some(seconds) = timeout_seconds {
        builder = builder.timeout(std::time::Duration::from_secs(seconds));
    }

    builder.build().map_err(|e| UpstreamError::Configuration {
        service,
        message: e.to_string(),
    })
}

#[cfg(test)]
#[path = "upstream_tests.rs"]
mod tests;
