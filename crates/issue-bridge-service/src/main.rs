//! # Issue Bridge Service
//!
//! Binary entry point for the Issue Bridge HTTP service.
//!
//! This executable:
//! - Loads configuration from files and the environment
//! - Initializes structured logging
//! - Builds the GitHub and Asana clients and the webhook dispatcher
//! - Starts the HTTP server from issue-bridge-api

mod startup;

use clap::Parser;
use issue_bridge_api::{start_server, LoggingConfig, ServiceConfig, ServiceError};
use std::path::PathBuf;
use tracing::{error, info};

/// Receive GitHub issue webhooks and create matching Asana tasks.
#[derive(Debug, Parser)]
#[command(name = "issue-bridge", version, about)]
struct Args {
    /// Configuration file applied on top of the default locations
    #[arg(short, long, env = "IB_CONFIG_FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // -------------------------------------------------------------------------
    // Load configuration
    //
    // Logging settings live in the configuration, so a load failure is
    // reported through a subscriber built from the default logging settings.
    // -------------------------------------------------------------------------
    let config = match ServiceConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let _ = startup::init_tracing(&LoggingConfig::default());
            error!(error = %e, "Failed to load configuration; aborting");
            std::process::exit(3);
        }
    };

    if let Err(e) = startup::init_tracing(&config.logging) {
        eprintln!("Failed to initialize logging: {:#}", e);
        std::process::exit(3);
    }

    info!("Starting Issue Bridge Service");

    if let Err(e) = config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    let dispatcher = match startup::build_dispatcher(&config) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!(error = %e, "Failed to build upstream clients; aborting");
            std::process::exit(3);
        }
    };

    info!(
        host = %config.server.host,
        port = config.server.port,
        endpoint = %config.webhooks.endpoint_path,
        github_api = %config.github.api_base_url,
        asana_task_url = %config.asana.task_url,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(config, dispatcher).await {
        error!("Server stopped with error: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }
}
