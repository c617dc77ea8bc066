//! Client for the external task-creation API
//!
//! Panel discussions, transcripts, and audio renders are produced by an
//! external service; creation calls return a task handle which the caller
//! polls through `task_status` (or `await_task`). Every call is bearer-token
//! authenticated; a non-2xx response surfaces as `Error::Api` with the
//! status, status text, and whatever detail body the service returned.

use std::time::Duration;

use dayside_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const USER_AGENT: &str = concat!("dayside/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Login credentials for `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Request body for `POST /panel/discussion`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscussionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panelist_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub source_ids: Vec<Uuid>,
}

/// Request body for `POST /panel/transcript`.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptRequest {
    pub panel_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Request body for `POST /panel/audio`.
#[derive(Debug, Clone, Serialize)]
pub struct AudioRequest {
    pub panel_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

/// Request body for `POST /organization/{id}/user`.
#[derive(Debug, Clone, Serialize)]
pub struct OrgUserRequest {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub acl_group_ids: Vec<Uuid>,
}

/// Handle returned by every creation endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
}

/// Task lifecycle as reported by `GET /system/task_status/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Status snapshot of one task.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatus {
    pub task_id: String,
    pub state: TaskState,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Bearer-authenticated client for the task-creation API.
pub struct TaskClient {
    http: reqwest::Client,
    base_url: String,
    bearer: String,
}

impl TaskClient {
    pub fn new(base_url: impl Into<String>, bearer: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: build_http()?,
            base_url: normalize(base_url.into()),
            bearer: bearer.into(),
        })
    }

    /// Authenticate against `POST /auth/login` and return a client carrying
    /// the issued token.
    pub async fn login(base_url: &str, credentials: &Credentials) -> Result<Self> {
        let base_url = normalize(base_url.to_string());
        let http = build_http()?;
        let response = http
            .post(format!("{base_url}/auth/login"))
            .json(credentials)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let login: LoginResponse = read_json(response).await?;
        Ok(Self {
            http,
            base_url,
            bearer: login.access_token,
        })
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        tracing::debug!(path, "task API request");
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.bearer)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        read_json(response).await
    }

    /// Create a user within an organization.
    pub async fn create_org_user(
        &self,
        organization_id: Uuid,
        request: &OrgUserRequest,
    ) -> Result<TaskHandle> {
        self.post_json(&format!("/organization/{organization_id}/user"), request)
            .await
    }

    /// Kick off panel discussion generation.
    pub async fn create_discussion(&self, request: &DiscussionRequest) -> Result<TaskHandle> {
        self.post_json("/panel/discussion", request).await
    }

    /// Kick off transcript generation for a panel.
    pub async fn create_transcript(&self, request: &TranscriptRequest) -> Result<TaskHandle> {
        self.post_json("/panel/transcript", request).await
    }

    /// Kick off audio rendering for a panel.
    pub async fn create_audio(&self, request: &AudioRequest) -> Result<TaskHandle> {
        self.post_json("/panel/audio", request).await
    }

    /// Current status of a task.
    pub async fn task_status(&self, task_id: &str) -> Result<TaskStatus> {
        tracing::debug!(task_id, "task status request");
        let response = self
            .http
            .get(format!("{}/system/task_status/{task_id}", self.base_url))
            .bearer_auth(&self.bearer)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        read_json(response).await
    }

    /// Poll `task_status` until the task reaches a terminal state or
    /// `deadline` elapses.
    pub async fn await_task(
        &self,
        task_id: &str,
        poll_interval: Duration,
        deadline: Duration,
    ) -> Result<TaskStatus> {
        let started = std::time::Instant::now();
        loop {
            let status = self.task_status(task_id).await?;
            if status.state.is_terminal() {
                return Ok(status);
            }
            if started.elapsed() >= deadline {
                return Err(Error::Internal(format!(
                    "task {task_id} did not finish within {deadline:?}"
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

fn normalize(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

fn build_http() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| Error::Transport(e.to_string()))
}

async fn read_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
    let status = response.status();
    if !status.is_success() {
        let message = status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
        let details = response
            .text()
            .await
            .ok()
            .and_then(|body| serde_json::from_str(&body).ok());
        return Err(Error::api(status.as_u16(), message, details));
    }
    response
        .json()
        .await
        .map_err(|e| Error::Transport(format!("invalid response body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_state_parses_lowercase() {
        let status: TaskStatus = serde_json::from_value(json!({
            "task_id": "t-1",
            "state": "running"
        }))
        .unwrap();
        assert_eq!(status.state, TaskState::Running);
        assert!(!status.state.is_terminal());
        assert!(status.result.is_none());
    }

    #[test]
    fn discussion_request_drops_absent_fields() {
        let request = DiscussionRequest {
            topic: "rate hikes".to_string(),
            ..Default::default()
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"topic": "rate hikes"}));
    }

    #[test]
    fn terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Pending.is_terminal());
    }
}
