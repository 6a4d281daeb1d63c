// crates/client/src/http.rs
//! `HttpJobClient` — REST calls against the assistant backend's job API.
//!
//! Thin typed wrapper: no retry, no state. Transient-failure policy lives in
//! the poller; this layer only maps HTTP responses onto the `ApiError`
//! taxonomy and normalizes backend status vocabulary into the closed
//! `JobState` set.

use async_trait::async_trait;
use db_assistant_core::{ApiError, ClientConfig, JobApi};
use db_assistant_types::{JobKind, JobResult, JobState, JobStatus};
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StartResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    state: String,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Error body the backend returns alongside non-2xx statuses. Field naming
/// varies between endpoints, so both spellings are accepted.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpJobClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpJobClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let mut config = config;
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self { client, config })
    }

    /// Request an AI-generated insights report over a completed job, with
    /// optional free-text context steering the narrative. The payload is
    /// returned opaque, like any other job result; callers that want the
    /// structured fields decode an `InsightsReport` from it.
    pub async fn generate_insights(
        &self,
        job_id: &str,
        context: Option<&str>,
    ) -> Result<JobResult, ApiError> {
        let url = format!("{}/api/insights/{}", self.config.base_url, job_id);
        let body = match context {
            Some(context) => serde_json::json!({ "context": context }),
            None => serde_json::json!({}),
        };
        let response = self
            .client
            .post(&url)
            .timeout(self.config.result_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let value: serde_json::Value = response
                .json()
                .await
                .map_err(|e| ApiError::Backend(format!("invalid insights body: {e}")))?;
            return Ok(JobResult(value));
        }
        Err(self.map_failure(status, response, job_id).await)
    }

    fn job_url(&self, kind: JobKind, rest: &str) -> String {
        if rest.is_empty() {
            format!("{}/api/jobs/{}", self.config.base_url, kind.as_str())
        } else {
            format!("{}/api/jobs/{}/{}", self.config.base_url, kind.as_str(), rest)
        }
    }

    async fn map_failure(
        &self,
        status: StatusCode,
        response: reqwest::Response,
        job_id: &str,
    ) -> ApiError {
        let message = Self::failure_message(status, response).await;
        match status {
            StatusCode::SERVICE_UNAVAILABLE => ApiError::ServiceUnavailable(message),
            StatusCode::NOT_FOUND => ApiError::NotFound {
                job_id: job_id.to_string(),
            },
            StatusCode::CONFLICT | StatusCode::TOO_EARLY => ApiError::NotReady {
                job_id: job_id.to_string(),
            },
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation(message)
            }
            _ => ApiError::Backend(format!("unexpected status {status}: {message}")),
        }
    }

    async fn failure_message(status: StatusCode, response: reqwest::Response) -> String {
        match response.json::<ErrorBody>().await {
            Ok(body) => body
                .detail
                .or(body.error)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        }
    }
}

/// Collapse backend status vocabulary into the closed lifecycle set. Kinds
/// differ in what they report ("processing" from the AutoML trainer,
/// "queued" from the pipeline runner); unknown strings are a backend
/// contract violation, not a transient condition.
fn normalize_state(raw: &str) -> Result<JobState, ApiError> {
    match raw {
        "pending" | "queued" | "submitted" | "created" => Ok(JobState::Pending),
        "running" | "processing" | "in_progress" | "started" => Ok(JobState::Running),
        "completed" | "succeeded" | "success" | "done" => Ok(JobState::Completed),
        "failed" | "error" => Ok(JobState::Failed),
        "cancelled" | "canceled" => Ok(JobState::Cancelled),
        other => Err(ApiError::Backend(format!("unknown job state: {other}"))),
    }
}

impl StatusResponse {
    fn into_status(self) -> Result<JobStatus, ApiError> {
        let state = normalize_state(&self.state)?;
        let mut status = JobStatus::new(state);
        status.progress = self.progress.map(|p| p.clamp(0.0, 100.0).round() as u8);
        status.detail = self.detail;
        status.error = self.error;
        Ok(status)
    }
}

#[async_trait]
impl JobApi for HttpJobClient {
    async fn start(&self, kind: JobKind, request: serde_json::Value) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.job_url(kind, ""))
            .timeout(self.config.start_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: StartResponse = response
                .json()
                .await
                .map_err(|e| ApiError::Backend(format!("invalid start body: {e}")))?;
            tracing::debug!(kind = %kind, job_id = %body.job_id, "Job started");
            return Ok(body.job_id);
        }
        Err(self.map_failure(status, response, "").await)
    }

    async fn status(&self, kind: JobKind, job_id: &str) -> Result<JobStatus, ApiError> {
        let response = self
            .client
            .get(self.job_url(kind, &format!("{job_id}/status")))
            .timeout(self.config.status_timeout)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: StatusResponse = response
                .json()
                .await
                .map_err(|e| ApiError::Backend(format!("invalid status body: {e}")))?;
            return body.into_status();
        }
        Err(self.map_failure(status, response, job_id).await)
    }

    async fn result(&self, kind: JobKind, job_id: &str) -> Result<JobResult, ApiError> {
        let response = self
            .client
            .get(self.job_url(kind, &format!("{job_id}/result")))
            .timeout(self.config.result_timeout)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let value: serde_json::Value = response
                .json()
                .await
                .map_err(|e| ApiError::Backend(format!("invalid result body: {e}")))?;
            return Ok(JobResult(value));
        }
        Err(self.map_failure(status, response, job_id).await)
    }

    async fn cancel(&self, kind: JobKind, job_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.job_url(kind, &format!("{job_id}/cancel")))
            .timeout(self.config.cancel_timeout)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(self.map_failure(status, response, job_id).await)
    }
}
