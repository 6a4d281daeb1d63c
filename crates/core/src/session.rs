// crates/core/src/session.rs
//! Single source of truth for active jobs and their observed state.
//!
//! `AssistantSession` owns one poller per job kind, persists the last
//! started job id through a [`RefStore`], and publishes cloneable snapshots
//! to subscribers through a watch channel. Presentation layers read
//! snapshots and request mutations through the action methods; nothing else
//! mutates session state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::api::{ApiError, JobApi};
use crate::config::PollConfig;
use crate::poller::{JobPoller, StatusSink};
use crate::refstore::RefStore;
use db_assistant_types::{JobKind, JobRef, JobResult, JobState, JobStatus};

/// Observed state for one job kind.
#[derive(Debug, Clone, Default)]
pub struct JobTrack {
    pub job: Option<JobRef>,
    pub status: Option<JobStatus>,
    pub result: Option<JobResult>,
    /// Last user-visible error message (failed start, failed result fetch).
    pub error: Option<String>,
}

impl JobTrack {
    fn is_terminal(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.is_terminal())
    }
}

/// Immutable snapshot of every track, published on each state change.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    tracks: HashMap<JobKind, JobTrack>,
}

impl SessionSnapshot {
    pub fn track(&self, kind: JobKind) -> Option<&JobTrack> {
        self.tracks.get(&kind)
    }
}

/// Assistant session store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AssistantSession {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn JobApi>,
    refs: Arc<dyn RefStore>,
    pollers: HashMap<JobKind, JobPoller>,
    tracks: Mutex<HashMap<JobKind, JobTrack>>,
    watch_tx: watch::Sender<SessionSnapshot>,
}

impl AssistantSession {
    pub fn new(api: Arc<dyn JobApi>, refs: Arc<dyn RefStore>) -> Self {
        Self::with_poll_configs(api, refs, PollConfig::for_kind)
    }

    /// Build with custom per-kind polling policies.
    pub fn with_poll_configs(
        api: Arc<dyn JobApi>,
        refs: Arc<dyn RefStore>,
        config_for: impl Fn(JobKind) -> PollConfig,
    ) -> Self {
        let pollers = JobKind::ALL
            .into_iter()
            .map(|kind| (kind, JobPoller::with_config(kind, config_for(kind))))
            .collect();
        let tracks: HashMap<JobKind, JobTrack> = JobKind::ALL
            .into_iter()
            .map(|kind| (kind, JobTrack::default()))
            .collect();
        let (watch_tx, _) = watch::channel(SessionSnapshot {
            tracks: tracks.clone(),
        });
        Self {
            inner: Arc::new(Inner {
                api,
                refs,
                pollers,
                tracks: Mutex::new(tracks),
                watch_tx,
            }),
        }
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.watch_tx.subscribe()
    }

    /// Current state of all tracks.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot()
    }

    /// Start a new job of `kind`, replacing any job previously tracked for
    /// that kind (its poll is abandoned and its reference overwritten).
    ///
    /// On failure the error message is recorded and previous job state is
    /// left untouched; nothing is persisted and no poller starts.
    pub async fn start_job(
        &self,
        kind: JobKind,
        request: serde_json::Value,
    ) -> Result<JobRef, ApiError> {
        match self.inner.api.start(kind, request).await {
            Ok(job_id) => {
                tracing::info!(kind = %kind, job_id = %job_id, "Started job");
                let job = JobRef::new(kind, job_id.clone());
                self.inner.refs.save(kind, &job_id);
                let job_for_track = job.clone();
                self.inner.mutate(kind, move |track| {
                    *track = JobTrack {
                        job: Some(job_for_track),
                        status: Some(JobStatus::new(JobState::Pending)),
                        result: None,
                        error: None,
                    };
                });
                Inner::begin_poll(&self.inner, kind, job_id);
                Ok(job)
            }
            Err(e) => {
                tracing::error!(kind = %kind, error = %e, "Failed to start job");
                let message = e.to_string();
                self.inner.mutate(kind, move |track| track.error = Some(message));
                Err(e)
            }
        }
    }

    /// Cancel the active job of `kind`.
    ///
    /// The cancel request is fired best-effort in the background; the job is
    /// marked cancelled locally and its poll stopped immediately, so the UI
    /// reflects the cancel even if the network call is still pending or
    /// eventually fails. No-op when no non-terminal job is tracked.
    pub fn cancel_job(&self, kind: JobKind) {
        let job_id = {
            let Some(tracks) = self.inner.lock_tracks() else {
                return;
            };
            match tracks.get(&kind) {
                Some(track) if !track.is_terminal() => {
                    track.job.as_ref().map(|j| j.job_id.clone())
                }
                _ => None,
            }
        };
        let Some(job_id) = job_id else { return };

        self.inner.stop_poll(kind);

        let api = Arc::clone(&self.inner.api);
        let id_for_cancel = job_id.clone();
        tokio::spawn(async move {
            if let Err(e) = api.cancel(kind, &id_for_cancel).await {
                tracing::warn!(
                    kind = %kind,
                    job_id = %id_for_cancel,
                    error = %e,
                    "Cancel request failed; job already marked cancelled locally"
                );
            }
        });

        self.inner.mutate(kind, |track| {
            track.status = Some(JobStatus::new(JobState::Cancelled));
        });
        tracing::info!(kind = %kind, job_id = %job_id, "Cancelled job");
    }

    /// Forget the job tracked for `kind`: stops the poll, clears the
    /// persisted reference and the in-memory track. Idempotent.
    pub fn reset_job(&self, kind: JobKind) {
        self.inner.stop_poll(kind);
        self.inner.refs.clear(kind);
        self.inner.mutate(kind, |track| *track = JobTrack::default());
    }

    /// Reconcile a persisted job reference with the backend.
    ///
    /// Issues a single status check for the saved id, if any: a still-running
    /// job resumes polling; a job that completed while the user was away gets
    /// its status and result surfaced without a poll; an id the backend no
    /// longer recognizes is cleared. On a transient error the reference is
    /// kept and nothing is recorded.
    pub async fn restore(&self, kind: JobKind) {
        let Some(job_id) = self.inner.refs.load(kind) else {
            return;
        };
        match self.inner.api.status(kind, &job_id).await {
            Ok(status) => {
                let job = JobRef::new(kind, job_id.clone());
                let completed = status.state == JobState::Completed;
                let still_running = !status.state.is_terminal();
                self.inner.mutate(kind, move |track| {
                    *track = JobTrack {
                        job: Some(job),
                        status: Some(status),
                        result: None,
                        error: None,
                    };
                });
                if completed {
                    match self.inner.api.result(kind, &job_id).await {
                        Ok(result) => self.inner.apply_result(kind, &job_id, result),
                        Err(e) => {
                            tracing::warn!(kind = %kind, job_id = %job_id, error = %e, "Result fetch failed during restore");
                            let message = format!("result fetch failed: {e}");
                            self.inner.mutate(kind, move |track| track.error = Some(message));
                        }
                    }
                } else if still_running {
                    tracing::info!(kind = %kind, job_id = %job_id, "Resuming poll for restored job");
                    Inner::begin_poll(&self.inner, kind, job_id);
                }
            }
            Err(ApiError::NotFound { .. }) => {
                tracing::info!(kind = %kind, job_id = %job_id, "Clearing stale job reference");
                self.inner.refs.clear(kind);
            }
            Err(e) => {
                // Keep the reference; a later restore can still reconcile.
                tracing::warn!(kind = %kind, job_id = %job_id, error = %e, "Could not reconcile persisted job");
            }
        }
    }

    /// Reconcile every kind's persisted reference.
    pub async fn restore_all(&self) {
        for kind in JobKind::ALL {
            self.restore(kind).await;
        }
    }

    /// Persist the last active UI tab.
    pub fn set_active_tab(&self, tab: &str) {
        self.inner.refs.save_tab(tab);
    }

    /// The persisted last active UI tab, if any.
    pub fn active_tab(&self) -> Option<String> {
        self.inner.refs.load_tab()
    }
}

impl Inner {
    fn lock_tracks(&self) -> Option<MutexGuard<'_, HashMap<JobKind, JobTrack>>> {
        match self.tracks.lock() {
            Ok(guard) => Some(guard),
            Err(e) => {
                tracing::error!(error = %e, "Session track lock poisoned");
                None
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        match self.lock_tracks() {
            Some(tracks) => SessionSnapshot {
                tracks: tracks.clone(),
            },
            None => SessionSnapshot::default(),
        }
    }

    fn mutate(&self, kind: JobKind, f: impl FnOnce(&mut JobTrack)) {
        if let Some(mut tracks) = self.lock_tracks() {
            f(tracks.entry(kind).or_default());
        }
        self.publish();
    }

    fn publish(&self) {
        self.watch_tx.send_replace(self.snapshot());
    }

    fn stop_poll(&self, kind: JobKind) {
        if let Some(poller) = self.pollers.get(&kind) {
            poller.stop();
        }
    }
}

// Poller integration. These are associated functions taking `&Arc<Inner>`
// because the status sink and the result fetch task need an owned handle
// back into the session.
impl Inner {
    fn begin_poll(inner: &Arc<Inner>, kind: JobKind, job_id: String) {
        let Some(poller) = inner.pollers.get(&kind) else {
            return;
        };
        let sink_inner = Arc::clone(inner);
        let sink: StatusSink = Arc::new(move |kind: JobKind, job_id: &str, status: JobStatus| {
            Inner::apply_status(&sink_inner, kind, job_id, status);
        });
        poller.start(Arc::clone(&inner.api), job_id, sink);
    }

    fn apply_status(inner: &Arc<Inner>, kind: JobKind, job_id: &str, status: JobStatus) {
        let fetch = {
            let Some(mut tracks) = inner.lock_tracks() else {
                return;
            };
            let track = tracks.entry(kind).or_default();
            // Updates for an abandoned or reset job are discarded, and a
            // terminal track is immutable.
            let current = track.job.as_ref().map(|j| j.job_id.as_str());
            if current != Some(job_id) || track.is_terminal() {
                return;
            }
            let completed = status.state == JobState::Completed;
            track.status = Some(status);
            completed
        };
        inner.publish();
        if fetch {
            Inner::fetch_result(inner, kind, job_id.to_string());
        }
    }

    fn apply_result(&self, kind: JobKind, job_id: &str, result: JobResult) {
        if let Some(mut tracks) = self.lock_tracks() {
            let track = tracks.entry(kind).or_default();
            if track.job.as_ref().map(|j| j.job_id.as_str()) == Some(job_id) {
                track.result = Some(result);
            }
        }
        self.publish();
    }

    fn fetch_result(inner: &Arc<Inner>, kind: JobKind, job_id: String) {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            match inner.api.result(kind, &job_id).await {
                Ok(result) => inner.apply_result(kind, &job_id, result),
                Err(e) => {
                    tracing::warn!(kind = %kind, job_id = %job_id, error = %e, "Result fetch failed");
                    let message = format!("result fetch failed: {e}");
                    inner.mutate(kind, move |track| track.error = Some(message));
                }
            }
        });
    }
}
