// crates/core/src/poller.rs
//! Fixed-interval status polling for a single job kind.

use std::sync::{Arc, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::JobApi;
use crate::config::PollConfig;
use db_assistant_types::{JobKind, JobStatus};

/// Callback invoked with each status the poller observes, in completion
/// order. Never invoked after [`JobPoller::stop`].
pub type StatusSink = Arc<dyn Fn(JobKind, &str, JobStatus) + Send + Sync>;

/// Drives repeated status checks for one active job until a terminal state
/// is observed or the poll is stopped.
///
/// One instance per job kind; instances are fully independent. At most one
/// poll runs per instance: starting a new poll stops the previous one. At
/// most one status request is in flight at any time — each tick awaits its
/// request before the next delay begins, so a slow backend cannot pile up
/// requests.
pub struct JobPoller {
    kind: JobKind,
    config: PollConfig,
    current: Mutex<Option<CancellationToken>>,
}

impl JobPoller {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            config: PollConfig::for_kind(kind),
            current: Mutex::new(None),
        }
    }

    pub fn with_config(kind: JobKind, config: PollConfig) -> Self {
        Self {
            kind,
            config,
            current: Mutex::new(None),
        }
    }

    /// Begin polling `job_id`, replacing any poll already in progress.
    ///
    /// The first status check fires immediately; subsequent checks follow at
    /// the configured interval. Statuses are published through `sink` until
    /// a terminal state arrives or [`stop`](Self::stop) is called. A stale
    /// in-flight request outliving `stop` is discarded, never published.
    pub fn start(&self, api: Arc<dyn JobApi>, job_id: String, sink: StatusSink) {
        let token = CancellationToken::new();
        self.replace_token(Some(token.clone()));

        let kind = self.kind;
        let config = self.config.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut consecutive_errors: u32 = 0;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let outcome = api.status(kind, &job_id).await;
                // The stop/reset may have raced the request; a late response
                // must never be published.
                if token.is_cancelled() {
                    break;
                }

                match outcome {
                    Ok(status) => {
                        consecutive_errors = 0;
                        let terminal = status.is_terminal();
                        sink(kind, &job_id, status);
                        if terminal {
                            break;
                        }
                    }
                    Err(e) if e.is_transient() => {
                        consecutive_errors += 1;
                        tracing::warn!(
                            kind = %kind,
                            job_id = %job_id,
                            error = %e,
                            attempt = consecutive_errors,
                            "Transient error polling job status"
                        );
                        if consecutive_errors >= config.max_consecutive_errors {
                            sink(
                                kind,
                                &job_id,
                                JobStatus::failed(format!(
                                    "status polling gave up after {consecutive_errors} attempts: {e}"
                                )),
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        // Definitive: the backend no longer recognizes the
                        // job or answered with something unusable.
                        tracing::error!(kind = %kind, job_id = %job_id, error = %e, "Job status check failed");
                        sink(kind, &job_id, JobStatus::failed(e.to_string()));
                        break;
                    }
                }
            }

            // Mark the poll finished so is_polling() reflects natural
            // termination, not just explicit stops.
            token.cancel();
        });
    }

    /// Stop the active poll, if any. Idempotent.
    pub fn stop(&self) {
        self.replace_token(None);
    }

    /// True while a poll is running for this instance.
    pub fn is_polling(&self) -> bool {
        match self.current.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|t| !t.is_cancelled()),
            Err(_) => false,
        }
    }

    fn replace_token(&self, next: Option<CancellationToken>) {
        match self.current.lock() {
            Ok(mut guard) => {
                if let Some(prev) = guard.take() {
                    prev.cancel();
                }
                *guard = next;
            }
            Err(e) => tracing::error!(kind = %self.kind, error = %e, "Poller token lock poisoned"),
        }
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
