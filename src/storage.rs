//! Storage layer for taskpad
//!
//! Two pieces:
//! - [`KeyValueStore`]: a durable local key-value backend holding text
//!   values. [`FileStore`] keeps one file per key; [`MemoryStore`] lives in
//!   memory and can simulate a storage quota.
//! - [`TaskRepository`]: the persistence adapter. It reads and writes the
//!   task collection under a single key and never raises towards the store:
//!   corrupt data loads as an empty collection and failed writes are logged.
//!
//! # Directory Structure (file backend)
//!
//! ```text
//! <data dir>/
//!   todo-app-tasks.json           # JSON array of tasks
//!   todo-app-tasks.json.lock      # write lock
//!   todo-app-tasks.lock           # held by a CLI command from hydrate to exit
//!   todo-app-tasks-session.json   # pending undo record for the CLI
//! ```

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::task::{validate_record, RecordCheck, Task};
use crate::undo::UndoAction;

/// Key the task collection is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "todo-app-tasks";

const SESSION_SUFFIX: &str = "-session";

/// A durable local key-value store of text values.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Keys become file names, so keep them to a safe alphabet.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("storage key cannot be empty".to_string()));
    }
    let valid = key
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
    if !valid || key.starts_with('.') {
        return Err(Error::InvalidArgument(format!(
            "invalid storage key '{key}': use letters, digits, '-', '_' or '.'"
        )));
    }
    Ok(())
}

// =============================================================================
// File backend
// =============================================================================

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File holding the value for `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Exclusive lock on `<key>.lock` for a whole read-modify-write run.
    ///
    /// Separate from the per-write `<key>.json.lock`, so `set` still works
    /// while the guard is held.
    pub fn lock_key(&self, key: &str) -> Result<FileLock> {
        validate_key(key)?;
        FileLock::acquire(self.dir.join(format!("{key}.lock")), DEFAULT_LOCK_TIMEOUT_MS)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        lock::write_atomic_locked(&path, value.as_bytes(), DEFAULT_LOCK_TIMEOUT_MS)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        lock::remove_locked(&path, DEFAULT_LOCK_TIMEOUT_MS)
    }
}

// =============================================================================
// Memory backend
// =============================================================================

/// In-memory backend. Counts reads and can enforce a byte quota over all
/// stored values, failing writes the way a full browser store would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    quota: Option<usize>,
    reads: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(limit: usize) -> Self {
        Self {
            quota: Some(limit),
            ..Self::default()
        }
    }

    /// Seed a raw value, bypassing the quota.
    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Number of `get` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn used_without(&self, key: &str) -> usize {
        self.values
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(limit) = self.quota {
            let needed = self.used_without(key) + key.len() + value.len();
            if needed > limit {
                return Err(Error::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

// =============================================================================
// Persistence adapter
// =============================================================================

/// Pending undo record persisted between CLI invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default)]
    pub last_action: Option<UndoAction>,
}

/// Reads and writes the task collection under one key.
///
/// Holds no task data between calls.
#[derive(Debug)]
pub struct TaskRepository<S> {
    backend: S,
    key: String,
}

impl<S: KeyValueStore> TaskRepository<S> {
    pub fn new(backend: S, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn with_default_key(backend: S) -> Self {
        Self::new(backend, DEFAULT_STORAGE_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn session_key(&self) -> String {
        format!("{}{}", self.key, SESSION_SUFFIX)
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    /// Load every valid task. Missing, corrupt or non-array data yields an
    /// empty collection; invalid elements are dropped one by one.
    pub fn load(&self) -> Vec<Task> {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to read task storage");
                return Vec::new();
            }
        };

        let elements = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Array(elements)) => elements,
            Ok(_) => {
                debug!(key = %self.key, "stored tasks are not an array; ignoring");
                return Vec::new();
            }
            Err(err) => {
                debug!(key = %self.key, error = %err, "stored tasks are not valid JSON; ignoring");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            match validate_record(element) {
                RecordCheck::Valid(task) => {
                    if seen.insert(task.id) {
                        tasks.push(task);
                    } else {
                        debug!(index, id = %task.id, "dropping duplicate task id");
                    }
                }
                RecordCheck::Rejected(reason) => {
                    debug!(index, %reason, "dropping invalid task record");
                }
            }
        }
        tasks
    }

    /// Overwrite the stored collection, reporting failures.
    pub fn try_save(&mut self, tasks: &[Task]) -> Result<()> {
        let json = serde_json::to_string(tasks)?;
        self.backend.set(&self.key, &json)
    }

    /// Best-effort save: failures are logged and swallowed.
    pub fn save(&mut self, tasks: &[Task]) {
        if let Err(err) = self.try_save(tasks) {
            warn!(key = %self.key, error = %err, "failed to persist tasks");
        }
    }

    /// Load the session record; anything unreadable is an empty session.
    pub fn load_session(&self) -> SessionRecord {
        let key = self.session_key();
        match self.backend.get(&key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                debug!(key = %key, error = %err, "ignoring unreadable session record");
                SessionRecord::default()
            }),
            Ok(None) => SessionRecord::default(),
            Err(err) => {
                warn!(key = %key, error = %err, "failed to read session record");
                SessionRecord::default()
            }
        }
    }

    /// Best-effort save of the session record.
    pub fn save_session(&mut self, record: &SessionRecord) {
        let key = self.session_key();
        let result = serde_json::to_string(record)
            .map_err(Error::from)
            .and_then(|json| self.backend.set(&key, &json));
        if let Err(err) = result {
            warn!(key = %key, error = %err, "failed to persist session record");
        }
    }
}

impl TaskRepository<FileStore> {
    /// Hold the task key for a whole hydrate-mutate-persist run, so
    /// overlapping processes cannot overwrite each other's changes.
    pub fn lock(&self) -> Result<FileLock> {
        self.backend.lock_key(&self.key)
    }
}
