// crates/core/src/lib.rs
//! Client-side tracking core for long-running backend jobs.
//!
//! Provides:
//! - `JobApi` — the seam between the tracking core and the job transport
//! - `RefStore` — durable last-job-reference storage (file or in-memory)
//! - `JobPoller` — fixed-interval status polling with clean cancellation
//! - `AssistantSession` — single source of truth for active jobs

pub mod api;
pub mod config;
pub mod poller;
pub mod refstore;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use api::{ApiError, JobApi};
pub use config::{ClientConfig, PollConfig};
pub use poller::{JobPoller, StatusSink};
pub use refstore::{FileRefStore, MemoryRefStore, RefStore};
pub use session::{AssistantSession, JobTrack, SessionSnapshot};
