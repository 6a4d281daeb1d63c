// crates/core/src/testutil.rs
//! Scriptable `JobApi` double shared by the poller and session tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::api::{ApiError, JobApi};
use async_trait::async_trait;
use db_assistant_types::{JobKind, JobResult, JobStatus};

/// Fake backend: responses are queued up front, calls are recorded.
///
/// When a gate is installed, every `status` call parks on it until the test
/// fires `notify_one`, simulating a slow network response.
#[derive(Default)]
pub struct FakeApi {
    start_queue: Mutex<VecDeque<Result<String, ApiError>>>,
    status_queue: Mutex<VecDeque<Result<JobStatus, ApiError>>>,
    result_queue: Mutex<VecDeque<Result<JobResult, ApiError>>>,
    cancel_queue: Mutex<VecDeque<Result<(), ApiError>>>,
    status_gate: Mutex<Option<Arc<Notify>>>,
    pub status_calls: AtomicUsize,
    pub start_calls: Mutex<Vec<(JobKind, serde_json::Value)>>,
    pub cancel_calls: Mutex<Vec<(JobKind, String)>>,
    pub result_calls: Mutex<Vec<(JobKind, String)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_start(self, response: Result<String, ApiError>) -> Self {
        self.start_queue.lock().unwrap().push_back(response);
        self
    }

    pub fn push_status(self, response: Result<JobStatus, ApiError>) -> Self {
        self.status_queue.lock().unwrap().push_back(response);
        self
    }

    pub fn push_result(self, response: Result<JobResult, ApiError>) -> Self {
        self.result_queue.lock().unwrap().push_back(response);
        self
    }

    pub fn push_cancel(self, response: Result<(), ApiError>) -> Self {
        self.cancel_queue.lock().unwrap().push_back(response);
        self
    }

    pub fn gated(self, gate: Arc<Notify>) -> Self {
        *self.status_gate.lock().unwrap() = Some(gate);
        self
    }
}

#[async_trait]
impl JobApi for FakeApi {
    async fn start(&self, kind: JobKind, request: serde_json::Value) -> Result<String, ApiError> {
        self.start_calls.lock().unwrap().push((kind, request));
        self.start_queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Backend("unexpected start call".into())))
    }

    async fn status(&self, _kind: JobKind, _job_id: &str) -> Result<JobStatus, ApiError> {
        let gate = self.status_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status_queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Backend("status queue exhausted".into())))
    }

    async fn result(&self, kind: JobKind, job_id: &str) -> Result<JobResult, ApiError> {
        self.result_calls
            .lock()
            .unwrap()
            .push((kind, job_id.to_string()));
        self.result_queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Backend("unexpected result call".into())))
    }

    async fn cancel(&self, kind: JobKind, job_id: &str) -> Result<(), ApiError> {
        self.cancel_calls
            .lock()
            .unwrap()
            .push((kind, job_id.to_string()));
        self.cancel_queue.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}
