//! Tests for webhook routing and response shaping in the HTTP layer.

use super::*;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request},
};
use issue_bridge_core::{
    asana::{TaskCreation, TaskCreator},
    github::UserResolver,
    webhook::{compute_signature, HmacSignatureVerifier, Issue},
    SecretString,
};
use std::sync::Mutex;
use tower::ServiceExt;

const SECRET: &str = "api-test-secret";

// ============================================================================
// Test doubles
// ============================================================================

/// Resolver that records requested usernames and returns a preset email.
struct RecordingResolver {
    email: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingResolver {
    fn returning(email: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            email: email.map(str::to_string),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserResolver for RecordingResolver {
    async fn resolve_email(&self, username: &str) -> Option<String> {
        self.calls.lock().unwrap().push(username.to_string());
        self.email.clone()
    }
}

/// Creator that records its inputs and returns a preset result.
struct RecordingCreator {
    result: TaskCreation,
    calls: Mutex<Vec<(Issue, Option<String>)>>,
}

impl RecordingCreator {
    fn returning(result: TaskCreation) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(Issue, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskCreator for RecordingCreator {
    async fn create_task(&self, issue: &Issue, assignee_email: Option<String>) -> TaskCreation {
        self.calls
            .lock()
            .unwrap()
            .push((issue.clone(), assignee_email));
        self.result.clone()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn asana_task() -> serde_json::Value {
    serde_json::json!({"data": {"gid": "12345", "name": "Bug"}})
}

fn test_router(resolver: Arc<RecordingResolver>, creator: Arc<RecordingCreator>) -> Router {
    let dispatcher = WebhookDispatcher::new(
        Arc::new(HmacSignatureVerifier::new(SecretString::new(SECRET))),
        resolver,
        creator,
    );
    create_router(AppState::new(ServiceConfig::default(), dispatcher))
}

fn signed_request(method: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-GitHub-Event", "issues")
        .header(
            "X-Hub-Signature-256",
            compute_signature(SECRET.as_bytes(), body.as_bytes()),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

const OPENED_WITH_ASSIGNEE: &str =
    r#"{"action":"opened","issue":{"title":"Bug","body":"desc","assignee":{"login":"alice"}}}"#;

// ============================================================================
// Webhook endpoint tests
// ============================================================================

mod webhook_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_opened_issue_returns_201_with_asana_task() {
        let resolver = RecordingResolver::returning(Some("alice@example.com"));
        let creator = RecordingCreator::returning(TaskCreation::Created(asana_task()));
        let app = test_router(resolver.clone(), creator.clone());

        let response = app
            .oneshot(signed_request("POST", OPENED_WITH_ASSIGNEE))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status": "success", "asana_task": asana_task()})
        );

        assert_eq!(resolver.calls(), vec!["alice".to_string()]);
        let calls = creator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.title, "Bug");
        assert_eq!(calls[0].1.as_deref(), Some("alice@example.com"));
    }

    /// Asana failures keep the 201 status and surface inline.
    #[tokio::test]
    async fn test_asana_failure_returns_201_with_inline_error() {
        let resolver = RecordingResolver::returning(None);
        let creator = RecordingCreator::returning(TaskCreation::Failed {
            error: "asana returned HTTP 500: Server Error".to_string(),
        });
        let app = test_router(resolver, creator);

        let response = app
            .oneshot(signed_request("POST", OPENED_WITH_ASSIGNEE))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["status"], "failed");
        assert_eq!(
            body["asana_task"]["error"],
            "asana returned HTTP 500: Server Error"
        );
    }

    #[tokio::test]
    async fn test_non_opened_event_returns_ignored() {
        let resolver = RecordingResolver::returning(None);
        let creator = RecordingCreator::returning(TaskCreation::Created(asana_task()));
        let app = test_router(resolver.clone(), creator.clone());

        let response = app
            .oneshot(signed_request(
                "POST",
                r#"{"action":"labeled","issue":{"title":"Bug"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status": "ignored"})
        );
        assert!(resolver.calls().is_empty());
        assert!(creator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_signature_returns_400() {
        let creator = RecordingCreator::returning(TaskCreation::Created(asana_task()));
        let app = test_router(RecordingResolver::returning(None), creator.clone());

        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .body(Body::from(OPENED_WITH_ASSIGNEE))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid signature");
        assert!(creator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400_without_outbound_calls() {
        let resolver = RecordingResolver::returning(None);
        let creator = RecordingCreator::returning(TaskCreation::Created(asana_task()));
        let app = test_router(resolver.clone(), creator.clone());

        let response = app
            .oneshot(signed_request("POST", "{\"action\": opened"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid payload");
        assert!(resolver.calls().is_empty());
        assert!(creator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_signed_get_returns_405() {
        let app = test_router(
            RecordingResolver::returning(None),
            RecordingCreator::returning(TaskCreation::Created(asana_task())),
        );

        let response = app.oneshot(signed_request("GET", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");
    }

    /// An unsigned GET fails signature verification before the method check.
    #[tokio::test]
    async fn test_unsigned_get_returns_400() {
        let app = test_router(
            RecordingResolver::returning(None),
            RecordingCreator::returning(TaskCreation::Created(asana_task())),
        );

        let request = Request::builder()
            .method("GET")
            .uri("/webhook")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_custom_endpoint_path_is_used() {
        let dispatcher = WebhookDispatcher::new(
            Arc::new(HmacSignatureVerifier::new(SecretString::new(SECRET))),
            RecordingResolver::returning(None),
            RecordingCreator::returning(TaskCreation::Created(asana_task())),
        );
        let mut config = ServiceConfig::default();
        config.webhooks.endpoint_path = "/hooks/github".to_string();
        let app = create_router(AppState::new(config, dispatcher));

        let body = r#"{"action":"closed"}"#;
        let request = Request::builder()
            .method("POST")
            .uri("/hooks/github")
            .header(
                "X-Hub-Signature-256",
                compute_signature(SECRET.as_bytes(), body.as_bytes()),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}

// ============================================================================
// Server startup tests
// ============================================================================

mod start_server_tests {
    use super::*;

    /// An unvalidated configuration is refused before any socket is bound.
    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_bind() {
        let dispatcher = WebhookDispatcher::new(
            Arc::new(HmacSignatureVerifier::new(SecretString::new(SECRET))),
            RecordingResolver::returning(None),
            RecordingCreator::returning(TaskCreation::Created(asana_task())),
        );
        let mut config = ServiceConfig::default();
        config.server.host = "256.256.256.256".to_string();

        let result = start_server(config, dispatcher).await;

        assert!(
            matches!(result, Err(ServiceError::Configuration(_))),
            "unexpected result: {:?}",
            result
        );
    }
}

// ============================================================================
// Health and middleware tests
// ============================================================================

mod health_and_middleware_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_reports_healthy() {
        let app = test_router(
            RecordingResolver::returning(None),
            RecordingCreator::returning(TaskCreation::Created(asana_task())),
        );

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_correlation_id_is_propagated() {
        let app = test_router(
            RecordingResolver::returning(None),
            RecordingCreator::returning(TaskCreation::Created(asana_task())),
        );

        let request = Request::builder()
            .uri("/health")
            .header(CORRELATION_ID_HEADER, "test-correlation-123")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(
            response.headers().get(CORRELATION_ID_HEADER).unwrap(),
            "test-correlation-123"
        );
    }

    #[tokio::test]
    async fn test_correlation_id_is_generated_when_absent() {
        let app = test_router(
            RecordingResolver::returning(None),
            RecordingCreator::returning(TaskCreation::Created(asana_task())),
        );

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        let generated = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(uuid::Uuid::parse_str(generated).is_ok());
    }
}
