// crates/core/src/api.rs
//! `JobApi` trait defining the interface to the backend job service.

use async_trait::async_trait;
use db_assistant_types::{JobKind, JobResult, JobStatus};
use thiserror::Error;

/// Errors returned by job API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("capability unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("unknown job: {job_id}")]
    NotFound { job_id: String },

    #[error("result not ready for job: {job_id}")]
    NotReady { job_id: String },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("unexpected backend response: {0}")]
    Backend(String),
}

impl ApiError {
    /// True for failures worth retrying on the next poll tick (transport
    /// errors and timeouts). Everything else is definitive.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Request(_))
    }
}

/// Interface to the backend job service for one request's worth of work.
///
/// Implementations include:
/// - `HttpJobClient` — REST calls against the assistant backend
/// - test doubles driving the poller and session store in unit tests
///
/// A push-based transport (streaming status updates) can implement this
/// same seam without changing the session store's contract.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Start a new job of the given kind. The request payload shape is
    /// kind-specific and passed through uninterpreted.
    ///
    /// Returns the backend-assigned job id.
    async fn start(&self, kind: JobKind, request: serde_json::Value) -> Result<String, ApiError>;

    /// Fetch the current status of a job.
    async fn status(&self, kind: JobKind, job_id: &str) -> Result<JobStatus, ApiError>;

    /// Fetch the result payload. Valid only once the job has completed;
    /// fails with [`ApiError::NotReady`] otherwise.
    async fn result(&self, kind: JobKind, job_id: &str) -> Result<JobResult, ApiError>;

    /// Request cancellation. Best-effort: the caller treats the job as
    /// cancelled locally regardless of this call's outcome.
    async fn cancel(&self, kind: JobKind, job_id: &str) -> Result<(), ApiError>;
}
