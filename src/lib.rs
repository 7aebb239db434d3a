//! taskpad - local task tracking library
//!
//! This library provides the core of the taskpad CLI: a task collection
//! persisted to a key/value backend, mutated through a single store with a
//! one-step undo, and read through derived views.
//!
//! # Core Concepts
//!
//! - **Tasks**: title, optional description, pending/completed status and
//!   creation/update/completion timestamps
//! - **Repository**: tolerant load and best-effort save of the collection
//! - **Store**: every mutation goes through [`store::TaskStore`], which
//!   persists after each change and records the most recent undo action
//! - **Views**: filter, search and stable sort over the collection
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.taskpad.toml`
//! - `error`: Error types and result aliases
//! - `events`: JSONL store event stream
//! - `lock`: File locking and atomic writes
//! - `output`: Human and JSON output envelopes
//! - `storage`: Key/value backends and the task repository
//! - `store`: The task store
//! - `task`: Task records and record validation
//! - `undo`: Undo actions and policy
//! - `view`: Filtering, searching and sorting

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod lock;
pub mod output;
pub mod storage;
pub mod store;
pub mod task;
pub mod undo;
pub mod view;

pub use error::{Error, Result};
pub use storage::{FileStore, KeyValueStore, MemoryStore, TaskRepository};
pub use store::{Clock, SystemClock, TaskStore};
pub use task::{Task, TaskId, TaskPatch, TaskStatus};
pub use undo::{UndoAction, UndoKind, UndoPolicy};
pub use view::{compute_view, Filter, SortBy, SortOrder, ViewCriteria};
