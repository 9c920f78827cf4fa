//! Response types for the API.

use chrono::{DateTime, Utc};
use issue_bridge_core::asana::TaskCreation;
use serde::Serialize;

/// Webhook processing response
///
/// Ignored events serialize as `{"status": "ignored"}`. Processed events
/// also carry the Asana result under `asana_task`, with `status` set to
/// `"success"` or `"failed"` depending on whether Asana created the task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asana_task: Option<TaskCreation>,
}

impl WebhookResponse {
    pub fn ignored() -> Self {
        Self {
            status: "ignored",
            asana_task: None,
        }
    }

    pub fn submitted(task: TaskCreation) -> Self {
        let status = if task.is_created() {
            "success"
        } else {
            "failed"
        };
        Self {
            status,
            asana_task: Some(task),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        }
    }
}
