//! Asana task creation.
//!
//! Every qualifying GitHub issue becomes one Asana task in the configured
//! workspace and project, due on the day it was created.

use crate::github::DEFAULT_USER_AGENT;
use crate::upstream::{build_http_client, UpstreamError};
use crate::webhook::Issue;
use crate::{require_secret, validate_url, SecretString, ValidationError};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

const SERVICE: &str = "asana";

/// Default Asana task-creation endpoint.
pub const DEFAULT_TASK_URL: &str = "https://app.asana.com/api/1.0/tasks";

/// Assignee used when no email could be resolved: the token's own user.
pub const DEFAULT_ASSIGNEE: &str = "me";

// ============================================================================
// Configuration
// ============================================================================

/// Asana settings: credentials and where new tasks are filed.
#[derive(Debug, Clone, Deserialize)]
pub struct AsanaClientConfig {
    /// Personal access token sent as a bearer token
    #[serde(default)]
    pub access_token: SecretString,

    /// Workspace GID
    #[serde(default)]
    pub workspace_id: String,

    /// Project GID every task is added to
    #[serde(default)]
    pub project_id: String,

    /// Task-creation endpoint
    #[serde(default = "default_task_url")]
    pub task_url: String,

    /// Optional request timeout. No timeout when unset.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn default_task_url() -> String {
    DEFAULT_TASK_URL.to_string()
}

impl Default for AsanaClientConfig {
    fn default() -> Self {
        Self {
            access_token: SecretString::default(),
            workspace_id: String::new(),
            project_id: String::new(),
            task_url: default_task_url(),
            timeout_seconds: None,
        }
    }
}

impl AsanaClientConfig {
    /// Check that every required value is present and well-formed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_secret("asana.access_token", &self.access_token)?;

        for (field, value) in [
            ("asana.workspace_id", &self.workspace_id),
            ("asana.project_id", &self.project_id),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: field.to_string(),
                });
            }
        }

        validate_url("asana.task_url", &self.task_url)?;
        Ok(())
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST /tasks`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRequest {
    pub data: TaskData,
}

/// Fields of the task to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskData {
    pub name: String,
    pub notes: String,
    pub workspace: String,
    pub projects: Vec<String>,
    pub assignee: String,
    /// Serialized as `YYYY-MM-DD`
    pub due_on: NaiveDate,
}

impl TaskData {
    /// Translate an issue into task fields.
    ///
    /// Falls back to [`DEFAULT_ASSIGNEE`] when `assignee_email` is `None`.
    pub fn for_issue(
        issue: &Issue,
        assignee_email: Option<&str>,
        config: &AsanaClientConfig,
        today: NaiveDate,
    ) -> Self {
        Self {
            name: issue.title.clone(),
            notes: issue.notes().to_string(),
            workspace: config.workspace_id.clone(),
            projects: vec![config.project_id.clone()],
            assignee: assignee_email.unwrap_or(DEFAULT_ASSIGNEE).to_string(),
            due_on: today,
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Outcome of a task-creation attempt.
///
/// Serializes to the Asana response for [`TaskCreation::Created`] and to
/// `{"error": "..."}` for [`TaskCreation::Failed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskCreation {
    /// Asana accepted the task; the response body is passed through untouched.
    Created(serde_json::Value),

    /// The request failed or Asana rejected it.
    Failed { error: String },
}

impl TaskCreation {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

impl From<UpstreamError> for TaskCreation {
    fn from(error: UpstreamError) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }
}

/// Interface for filing a task that tracks a GitHub issue.
///
/// Implementations never fail: upstream problems are logged and reported
/// through [`TaskCreation::Failed`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskCreator: Send + Sync {
    async fn create_task(&self, issue: &Issue, assignee_email: Option<String>) -> TaskCreation;
}

// ============================================================================
// AsanaTaskClient
// ============================================================================

/// [`TaskCreator`] backed by the Asana REST API.
#[derive(Debug, Clone)]
pub struct AsanaTaskClient {
    http_client: reqwest::Client,
    config: AsanaClientConfig,
}

impl AsanaTaskClient {
    /// Build a client from validated configuration.
    pub fn new(config: AsanaClientConfig) -> Result<Self, UpstreamError> {
        let http_client = build_http_client(SERVICE, DEFAULT_USER_AGENT, config.timeout_seconds)?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// The configuration this client files tasks with.
    pub fn config(&self) -> &AsanaClientConfig {
        &self.config
    }

    /// Submit `request` and return the created task as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if:
    /// - The request cannot be sent
    /// - Asana answers with anything other than `201 Created`
    /// - The response body is not JSON
    #[instrument(skip_all, fields(task_name = %request.data.name))]
    pub async fn submit(&self, request: &TaskRequest) -> Result<serde_json::Value, UpstreamError> {
        let response = self
            .http_client
            .post(&self.config.task_url)
            .bearer_auth(self.config.access_token.expose())
            .json(request)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if status != StatusCode::CREATED {
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
            .json::<serde_json::Value>()
            .await
            .map_err(|e| UpstreamError::InvalidResponse {
                service: SERVICE,
                message: e.to_string(),
            })
    }

    /// Create a task due on `due_on`, folding every failure into
    /// [`TaskCreation::Failed`].
    #[instrument(skip(self, issue), fields(title = %issue.title))]
    pub async fn create_task_due_on(
        &self,
        issue: &Issue,
        assignee_email: Option<&str>,
        due_on: NaiveDate,
    ) -> TaskCreation {
        let request = TaskRequest {
            data: TaskData::for_issue(issue, assignee_email, &self.config, due_on),
        };

        match self.submit(&request).await {
            Ok(task) => {
                info!(assignee = %request.data.assignee, "Task created successfully on Asana");
                TaskCreation::Created(task)
            }
            Err(e @ UpstreamError::Transport { .. }) => {
                error!(error = %e, "Error while sending task to Asana");
                e.into()
            }
            Err(e) => {
                warn!(
                    error = %e,
                    status = ?e.status(),
                    "Failed to create task on Asana"
                );
                e.into()
            }
        }
    }
}

#[async_trait]
impl TaskCreator for AsanaTaskClient {
    async fn create_task(&self, issue: &Issue, assignee_email: Option<String>) -> TaskCreation {
        // Due date is the server-local date at call time.
        let today = chrono::Local::now().date_naive();
        self.create_task_due_on(issue, assignee_email.as_deref(), today)
            .await
    }
}

#[cfg(test)]
#[path = "asana_tests.rs"]
mod tests;
