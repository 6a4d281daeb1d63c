// crates/types/src/job.rs
//! Data model for remote backend jobs.
//!
//! A "job" is a long-running unit of work (AutoML training run, generative
//! data-model pipeline, forecast generation) executed entirely by the backend
//! and tracked client-side by an opaque identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of backend job. Each kind has an independent lifecycle and is
/// tracked concurrently with the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    #[serde(rename = "automl")]
    AutoMl,
    Gdm,
    Forecast,
}

impl JobKind {
    /// All kinds, in a stable order. Used to restore persisted references
    /// and to pre-build one poller per kind.
    pub const ALL: [JobKind; 3] = [JobKind::AutoMl, JobKind::Gdm, JobKind::Forecast];

    /// Stable string tag, used for storage namespacing and endpoint paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::AutoMl => "automl",
            JobKind::Gdm => "gdm",
            JobKind::Forecast => "forecast",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a job. Backend vocabularies that differ ("processing",
/// "queued", ...) are collapsed into this closed set at the client boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// True iff no further transition can occur from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

/// Reference to a started job: the backend-assigned identifier plus the kind
/// it belongs to (the kind selects which endpoints to poll).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRef {
    pub job_id: String,
    pub kind: JobKind,
}

impl JobRef {
    pub fn new(kind: JobKind, job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
        }
    }
}

/// Point-in-time status of a job as reported by the backend, stamped with the
/// client-side observation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    /// 0-100 completion estimate, when the backend provides one.
    pub progress: Option<u8>,
    /// Human-readable current-step description.
    pub detail: Option<String>,
    /// Failure message, populated when `state` is `Failed`.
    pub error: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl JobStatus {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            progress: None,
            detail: None,
            error: None,
            observed_at: Utc::now(),
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let mut status = Self::new(JobState::Failed);
        status.error = Some(message.into());
        status
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Completed-job payload. The shape depends on the job kind (model metrics,
/// forecast narrative, insights report); the tracking core stores it without
/// interpreting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobResult(pub serde_json::Value);

impl JobResult {
    /// Decode the payload into a concrete shape, e.g. [`crate::InsightsReport`].
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_job_kind_tags() {
        assert_eq!(JobKind::AutoMl.as_str(), "automl");
        assert_eq!(JobKind::Gdm.as_str(), "gdm");
        assert_eq!(JobKind::Forecast.as_str(), "forecast");
        assert_eq!(JobKind::ALL.len(), 3);
    }

    #[test]
    fn test_job_kind_serde_snake_case() {
        assert_eq!(serde_json::to_string(&JobKind::AutoMl).unwrap(), "\"automl\"");
        let kind: JobKind = serde_json::from_str("\"gdm\"").unwrap();
        assert_eq!(kind, JobKind::Gdm);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[test]
    fn test_progress_clamped() {
        let status = JobStatus::new(JobState::Running).with_progress(250);
        assert_eq!(status.progress, Some(100));
    }

    #[test]
    fn test_failed_status_carries_message() {
        let status = JobStatus::failed("training diverged");
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.error.as_deref(), Some("training diverged"));
        assert!(status.is_terminal());
    }

    #[test]
    fn test_job_result_decode() {
        #[derive(serde::Deserialize)]
        struct Metrics {
            r2: f64,
        }
        let result = JobResult(serde_json::json!({"r2": 0.93, "rmse": 1.2}));
        let metrics: Metrics = result.decode().unwrap();
        assert!((metrics.r2 - 0.93).abs() < f64::EPSILON);
    }
}
