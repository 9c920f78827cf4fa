//! # Webhook Dispatcher
//!
//! Top-level entry point for one webhook delivery. The dispatcher runs the
//! whole pipeline in order and stops at the first terminal outcome:
//!
//! 1. Verify the signature ([`WebhookError::InvalidSignature`])
//! 2. Require `POST` ([`WebhookError::MethodNotAllowed`])
//! 3. Parse the body ([`WebhookError::InvalidPayload`])
//! 4. Ignore anything that is not an opened issue ([`DispatchOutcome::Ignored`])
//! 5. Resolve the assignee email, then create the Asana task
//!    ([`DispatchOutcome::TaskSubmitted`])
//!
//! Upstream failures in step 5 never surface as errors; they are folded
//! into the outcome by the resolver and the creator.

use crate::asana::{TaskCreation, TaskCreator};
use crate::github::UserResolver;
use crate::webhook::{SignatureVerifier, WebhookError, WebhookEvent, WebhookRequest};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Terminal outcome of an authenticated, well-formed delivery
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The event is not an opened issue; nothing was called.
    Ignored,

    /// A task creation was attempted for an opened issue.
    TaskSubmitted {
        assignee_email: Option<String>,
        task: TaskCreation,
    },
}

/// Orchestrates verification, parsing, email resolution and task creation.
#[derive(Clone)]
pub struct WebhookDispatcher {
    verifier: Arc<dyn SignatureVerifier>,
    resolver: Arc<dyn UserResolver>,
    creator: Arc<dyn TaskCreator>,
}

impl WebhookDispatcher {
    pub fn new(
        verifier: Arc<dyn SignatureVerifier>,
        resolver: Arc<dyn UserResolver>,
        creator: Arc<dyn TaskCreator>,
    ) -> Self {
        Self {
            verifier,
            resolver,
            creator,
        }
    }

    /// Process one webhook delivery.
    ///
    /// # Errors
    ///
    /// Returns a [`WebhookError`] for every request-level rejection. These
    /// are raised before any outbound call is made.
    #[instrument(skip_all, fields(
        method = %request.method,
        event_type = request.headers.event_type.as_deref().unwrap_or("-"),
        delivery_id = request.headers.delivery_id.as_deref().unwrap_or("-"),
    ))]
    pub async fn dispatch(&self, request: &WebhookRequest) -> Result<DispatchOutcome, WebhookError> {
        if !self.verifier.verify(&request.body, request.signature()) {
            warn!("Rejecting webhook with missing or invalid signature");
            return Err(WebhookError::InvalidSignature);
        }

        if !request.is_post() {
            return Err(WebhookError::MethodNotAllowed {
                method: request.method.clone(),
            });
        }

        let issue = match WebhookEvent::from_payload(&request.body)? {
            WebhookEvent::IssueOpened(issue) => issue,
            WebhookEvent::Ignored => {
                debug!("Ignoring webhook that is not an opened issue");
                return Ok(DispatchOutcome::Ignored);
            }
        };

        info!(title = %issue.title, "Processing issue creation event");

        let assignee_email = match issue.assignee_login() {
            Some(login) => self.resolver.resolve_email(login).await,
            None => None,
        };

        let task = self
            .creator
            .create_task(&issue, assignee_email.clone())
            .await;

        info!(
            created = task.is_created(),
            has_assignee_email = assignee_email.is_some(),
            "Finished processing issue creation event"
        );

        Ok(DispatchOutcome::TaskSubmitted {
            assignee_email,
            task,
        })
    }
}

impl std::fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookDispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
