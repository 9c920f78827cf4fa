//! Common test utilities for issue-bridge integration tests
//!
//! This module provides:
//! - A router wired to real GitHub and Asana clients pointed at mock servers
//! - Signed request builders
//! - Response helpers

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request},
    response::Response,
    Router,
};
use issue_bridge_api::{create_router, AppState, ServiceConfig};
use issue_bridge_core::{
    asana::AsanaTaskClient,
    dispatcher::WebhookDispatcher,
    github::GithubUserClient,
    webhook::{compute_signature, HmacSignatureVerifier},
    SecretString,
};
use std::sync::Arc;
use wiremock::MockServer;

pub const WEBHOOK_SECRET: &str = "integration-webhook-secret";
pub const GITHUB_TOKEN: &str = "ghp_integration";
pub const ASANA_TOKEN: &str = "asana_integration";
pub const WORKSPACE_ID: &str = "1200000000000001";
pub const PROJECT_ID: &str = "1200000000000002";
pub const ASANA_TASKS_PATH: &str = "/api/1.0/tasks";

// ============================================================================
// Test Harness
// ============================================================================

/// A full router plus the mock upstreams it talks to.
pub struct TestHarness {
    pub github: MockServer,
    pub asana: MockServer,
    pub app: Router,
}

impl TestHarness {
    pub async fn start() -> Self {
        let github = MockServer::start().await;
        let asana = MockServer::start().await;

        let mut config = ServiceConfig::default();
        config.github.api_base_url = github.uri();
        config.github.token = SecretString::new(GITHUB_TOKEN);
        config.github.webhook_secret = SecretString::new(WEBHOOK_SECRET);
        config.asana.access_token = SecretString::new(ASANA_TOKEN);
        config.asana.workspace_id = WORKSPACE_ID.to_string();
        config.asana.project_id = PROJECT_ID.to_string();
        config.asana.task_url = format!("{}{}", asana.uri(), ASANA_TASKS_PATH);
        config
            .validate()
            .expect("integration configuration should be valid");

        let dispatcher = WebhookDispatcher::new(
            Arc::new(HmacSignatureVerifier::new(config.github.webhook_secret.clone())),
            Arc::new(GithubUserClient::new(&config.github).expect("github client")),
            Arc::new(AsanaTaskClient::new(config.asana.clone()).expect("asana client")),
        );

        let app = create_router(AppState::new(config, dispatcher));

        Self { github, asana, app }
    }
}

// ============================================================================
// Request Builders
// ============================================================================

/// A request signed with [`WEBHOOK_SECRET`].
pub fn signed_request(method: &str, event: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-GitHub-Event", event)
        .header("X-GitHub-Delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958")
        .header(
            "X-Hub-Signature-256",
            compute_signature(WEBHOOK_SECRET.as_bytes(), body.as_bytes()),
        )
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Payload of an `issues.opened` delivery.
pub fn opened_issue_payload(title: &str, body: Option<&str>, assignee: Option<&str>) -> String {
    serde_json::json!({
        "action": "opened",
        "issue": {
            "number": 42,
            "title": title,
            "body": body,
            "assignee": assignee.map(|login| serde_json::json!({"login": login})),
        },
        "repository": {"full_name": "octo-org/octo-repo"},
    })
    .to_string()
}

// ============================================================================
// Response Helpers
// ============================================================================

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Today's date in the form Asana expects for `due_on`.
pub fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}
