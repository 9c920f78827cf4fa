//! Startup wiring: logging and the dispatcher's collaborators.

use anyhow::Context;
use issue_bridge_api::{LoggingConfig, ServiceConfig};
use issue_bridge_core::{
    asana::AsanaTaskClient,
    dispatcher::WebhookDispatcher,
    github::GithubUserClient,
    upstream::UpstreamError,
    webhook::HmacSignatureVerifier,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub(crate) fn default_filter(level: &str) -> String {
    format!(
        "issue_bridge_service={level},issue_bridge_api={level},issue_bridge_core={level},tower_http=debug"
    )
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
pub(crate) fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter(&logging.level))
            .with_context(|| format!("invalid logging.level '{}'", logging.level))?,
    };

    let json_layer = logging
        .json_format
        .then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!logging.json_format).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")
}

/// Build the dispatcher from validated configuration.
pub(crate) fn build_dispatcher(config: &ServiceConfig) -> Result<WebhookDispatcher, UpstreamError> {
    let verifier = HmacSignatureVerifier::new(config.github.webhook_secret.clone());
    let resolver = GithubUserClient::new(&config.github)?;
    let creator = AsanaTaskClient::new(config.asana.clone())?;

    Ok(WebhookDispatcher::new(
        Arc::new(verifier),
        Arc::new(resolver),
        Arc::new(creator),
    ))
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
