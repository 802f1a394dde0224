//! Post-hoc execution trace, keyed by slash-separated paths.
//!
//! Instrumentation wrappers create one [`ExecutionLogEntry`] per monitored
//! invocation; the entry's path is the concatenation of its ancestors'
//! names joined by `/`. Entries are append-only and exist purely for
//! observability — nothing in the dispatch path reads them back to make
//! decisions.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct EntryInner {
    path: String,
    created_at: DateTime<Utc>,
    fields: Mutex<BTreeMap<String, serde_json::Value>>,
}

/// Handle to one traced invocation.
///
/// Cloning the handle shares the underlying entry.
#[derive(Debug, Clone)]
pub struct ExecutionLogEntry {
    inner: Arc<EntryInner>,
}

impl ExecutionLogEntry {
    fn new(path: String) -> Self {
        Self {
            inner: Arc::new(EntryInner {
                path,
                created_at: Utc::now(),
                fields: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Full `/`-joined path of this entry.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// When the entry was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Record a diagnostic field. Write-once per key: recording a key that
    /// is already present is a no-op, keeping entries append-only.
    pub fn record(&self, key: &str, value: impl Into<serde_json::Value>) {
        let mut fields = self.lock_fields();
        fields.entry(key.to_string()).or_insert_with(|| value.into());
    }

    /// Snapshot of the recorded fields.
    pub fn fields(&self) -> BTreeMap<String, serde_json::Value> {
        self.lock_fields().clone()
    }

    fn lock_fields(&self) -> MutexGuard<'_, BTreeMap<String, serde_json::Value>> {
        self.inner
            .fields
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tree of trace entries for one top-level invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<ExecutionLogEntry>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entry named `name` under `parent_path` and return its
    /// handle. An empty parent path yields a root entry whose path is just
    /// `name`.
    pub fn new_entry(&self, parent_path: &str, name: &str) -> ExecutionLogEntry {
        let path = if parent_path.is_empty() {
            name.to_string()
        } else {
            format!("{parent_path}/{name}")
        };
        let entry = ExecutionLogEntry::new(path);
        self.lock_entries().push(entry.clone());
        entry
    }

    /// Find an entry by its full path.
    pub fn find(&self, path: &str) -> Option<ExecutionLogEntry> {
        self.lock_entries()
            .iter()
            .find(|entry| entry.path() == path)
            .cloned()
    }

    /// All entry paths, in creation order.
    pub fn entry_paths(&self) -> Vec<String> {
        self.lock_entries()
            .iter()
            .map(|entry| entry.path().to_string())
            .collect()
    }

    fn lock_entries(&self) -> MutexGuard<'_, Vec<ExecutionLogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_join_with_slash() {
        let log = ExecutionLog::new();
        let root = log.new_entry("", "agent");
        let controller = log.new_entry(root.path(), "controller");
        let llm = log.new_entry(controller.path(), "llm");

        assert_eq!(root.path(), "agent");
        assert_eq!(controller.path(), "agent/controller");
        assert_eq!(llm.path(), "agent/controller/llm");
        assert_eq!(
            log.entry_paths(),
            vec!["agent", "agent/controller", "agent/controller/llm"]
        );
    }

    #[test]
    fn test_record_is_write_once() {
        let log = ExecutionLog::new();
        let entry = log.new_entry("", "controller");
        entry.record("attempts", 1);
        entry.record("attempts", 99);
        assert_eq!(entry.fields()["attempts"], 1);
    }

    #[test]
    fn test_find_returns_shared_handle() {
        let log = ExecutionLog::new();
        let entry = log.new_entry("", "agent");
        entry.record("state", "done");

        let found = log.find("agent").unwrap();
        assert_eq!(found.fields()["state"], "done");
        assert!(log.find("missing").is_none());
    }
}
