// crates/core/src/refstore.rs
//! Durable storage for the last started job reference per kind.
//!
//! This is a non-critical convenience feature (it lets a restarted UI pick up
//! a job started before the restart), so every operation is best-effort:
//! storage failures are logged and treated as "no value", never surfaced to
//! callers.

use db_assistant_types::JobKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Pluggable key-value store for job references and the last active UI tab.
pub trait RefStore: Send + Sync {
    /// Remember `job_id` as the last started job of `kind`, overwriting any
    /// prior value for that kind.
    fn save(&self, kind: JobKind, job_id: &str);

    /// The last saved id for `kind`, if any.
    fn load(&self, kind: JobKind) -> Option<String>;

    /// Forget the stored id for `kind`.
    fn clear(&self, kind: JobKind);

    /// Remember the last active UI tab.
    fn save_tab(&self, tab: &str);

    /// The last active UI tab, if any.
    fn load_tab(&self) -> Option<String>;
}

/// On-disk contents of the reference file. No schema versioning; an
/// unreadable file is treated as empty.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredRefs {
    #[serde(default)]
    refs: HashMap<String, String>,
    #[serde(default)]
    active_tab: Option<String>,
}

/// File-backed store: one small JSON document under the user data dir.
pub struct FileRefStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileRefStore {
    /// Store backed by the default location,
    /// `<data_dir>/db-assistant/refs.json`. Returns `None` when the
    /// platform has no data directory.
    pub fn default_location() -> Option<Self> {
        dirs::data_dir().map(|d| Self::at(d.join("db-assistant").join("refs.json")))
    }

    /// Store backed by an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read(&self) -> StoredRefs {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(refs) => refs,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Unparseable reference file, treating as empty");
                    StoredRefs::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredRefs::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Cannot read reference file, treating as empty");
                StoredRefs::default()
            }
        }
    }

    fn write(&self, refs: &StoredRefs) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "Cannot create reference store directory");
                return;
            }
        }
        let json = match serde_json::to_string_pretty(refs) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot serialize job references");
                return;
            }
        };
        // Write-then-rename so a crash mid-write never corrupts the file.
        let tmp = self.path.with_extension("json.tmp");
        if let Err(e) = std::fs::write(&tmp, json) {
            tracing::warn!(path = %tmp.display(), error = %e, "Cannot write reference file");
            return;
        }
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Cannot replace reference file");
        }
    }

    fn update(&self, mutate: impl FnOnce(&mut StoredRefs)) {
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::warn!(error = %e, "Reference store lock poisoned, skipping write");
                return;
            }
        };
        let mut refs = self.read();
        mutate(&mut refs);
        self.write(&refs);
    }
}

impl RefStore for FileRefStore {
    fn save(&self, kind: JobKind, job_id: &str) {
        self.update(|refs| {
            refs.refs.insert(kind.as_str().to_string(), job_id.to_string());
        });
    }

    fn load(&self, kind: JobKind) -> Option<String> {
        self.read().refs.get(kind.as_str()).cloned()
    }

    fn clear(&self, kind: JobKind) {
        self.update(|refs| {
            refs.refs.remove(kind.as_str());
        });
    }

    fn save_tab(&self, tab: &str) {
        self.update(|refs| {
            refs.active_tab = Some(tab.to_string());
        });
    }

    fn load_tab(&self) -> Option<String> {
        self.read().active_tab
    }
}

/// In-memory store for tests and embedders that opt out of persistence.
#[derive(Default)]
pub struct MemoryRefStore {
    inner: Mutex<StoredRefs>,
}

impl MemoryRefStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut StoredRefs) -> T) -> Option<T> {
        match self.inner.lock() {
            Ok(mut inner) => Some(f(&mut inner)),
            Err(e) => {
                tracing::warn!(error = %e, "Memory reference store lock poisoned");
                None
            }
        }
    }
}

impl RefStore for MemoryRefStore {
    fn save(&self, kind: JobKind, job_id: &str) {
        self.with_inner(|inner| {
            inner.refs.insert(kind.as_str().to_string(), job_id.to_string());
        });
    }

    fn load(&self, kind: JobKind) -> Option<String> {
        self.with_inner(|inner| inner.refs.get(kind.as_str()).cloned())
            .flatten()
    }

    fn clear(&self, kind: JobKind) {
        self.with_inner(|inner| {
            inner.refs.remove(kind.as_str());
        });
    }

    fn save_tab(&self, tab: &str) {
        self.with_inner(|inner| {
            inner.active_tab = Some(tab.to_string());
        });
    }

    fn load_tab(&self) -> Option<String> {
        self.with_inner(|inner| inner.active_tab.clone()).flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryRefStore::new();
        assert_eq!(store.load(JobKind::AutoMl), None);

        store.save(JobKind::AutoMl, "abc123");
        store.save(JobKind::Gdm, "def456");
        assert_eq!(store.load(JobKind::AutoMl).as_deref(), Some("abc123"));
        assert_eq!(store.load(JobKind::Gdm).as_deref(), Some("def456"));
        assert_eq!(store.load(JobKind::Forecast), None);

        store.clear(JobKind::AutoMl);
        assert_eq!(store.load(JobKind::AutoMl), None);
        assert_eq!(store.load(JobKind::Gdm).as_deref(), Some("def456"));
    }

    #[test]
    fn test_save_overwrites_previous_id() {
        let store = MemoryRefStore::new();
        store.save(JobKind::AutoMl, "old");
        store.save(JobKind::AutoMl, "new");
        assert_eq!(store.load(JobKind::AutoMl).as_deref(), Some("new"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.json");

        let store = FileRefStore::at(&path);
        store.save(JobKind::Forecast, "fc-42");
        store.save_tab("forecasts");
        drop(store);

        let reopened = FileRefStore::at(&path);
        assert_eq!(reopened.load(JobKind::Forecast).as_deref(), Some("fc-42"));
        assert_eq!(reopened.load_tab().as_deref(), Some("forecasts"));
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRefStore::at(dir.path().join("refs.json"));
        store.save(JobKind::AutoMl, "abc");
        store.clear(JobKind::AutoMl);
        store.clear(JobKind::AutoMl);
        assert_eq!(store.load(JobKind::AutoMl), None);
    }

    #[test]
    fn test_file_store_corrupt_file_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileRefStore::at(&path);
        assert_eq!(store.load(JobKind::AutoMl), None);

        // Saving over the corrupt file works.
        store.save(JobKind::AutoMl, "abc");
        assert_eq!(store.load(JobKind::AutoMl).as_deref(), Some("abc"));
    }

    #[test]
    fn test_file_store_unwritable_directory_is_swallowed() {
        // A path whose parent is a file cannot be created; all operations
        // must degrade to "no value" without panicking.
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let store = FileRefStore::at(blocker.join("refs.json"));
        store.save(JobKind::AutoMl, "abc");
        assert_eq!(store.load(JobKind::AutoMl), None);
    }
}
