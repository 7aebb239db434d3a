//! Store change events.
//!
//! Every state change in the task store is announced to registered
//! listeners as a [`StoreEvent`]. The CLI can forward them as JSON lines to
//! stdout or a file via [`EventSink`].

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::task::TaskId;

pub const EVENT_SCHEMA_VERSION: &str = "taskpad.event.v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(EventDestination::Stdout);
            }
            Some(EventDestination::File(PathBuf::from(trimmed)))
        })
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            EventDestination::Stdout => Ok(EventSink::stdout()),
            EventDestination::File(path) => EventSink::file(path),
        }
    }
}

/// What changed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Hydrated,
    TaskCreated,
    TaskUpdated,
    TaskToggled,
    TaskDeleted,
    /// A deleted task was put back by undo.
    TaskRestored,
    /// An update was rolled back by undo.
    TaskReverted,
    UndoCleared,
    FilterChanged,
    SearchChanged,
    SortingChanged,
}

/// A single store notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreEvent {
    pub schema_version: &'static str,
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

impl StoreEvent {
    pub fn new(event: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            event,
            timestamp,
            task_id: None,
        }
    }

    pub fn for_task(event: EventKind, task_id: TaskId, timestamp: DateTime<Utc>) -> Self {
        Self {
            task_id: Some(task_id),
            ..Self::new(event, timestamp)
        }
    }
}

/// Event sink that writes JSONL output to a destination.
pub struct EventSink {
    writer: Box<dyn Write + Send>,
}

impl EventSink {
    pub fn stdout() -> Self {
        Self {
            writer: Box::new(std::io::stdout()),
        }
    }

    /// Append to a file, creating it if necessary.
    pub fn file(path: &Path) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: Box::new(file),
        })
    }

    /// Write a single event as JSONL.
    pub fn emit(&mut self, event: &StoreEvent) -> Result<()> {
        let serialized = serde_json::to_vec(event)?;
        self.writer.write_all(&serialized)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn destination_parsing() {
        assert_eq!(EventDestination::parse(None), None);
        assert_eq!(EventDestination::parse(Some("  ")), None);
        assert_eq!(EventDestination::parse(Some("-")), Some(EventDestination::Stdout));
        assert_eq!(
            EventDestination::parse(Some("events.jsonl")),
            Some(EventDestination::File(PathBuf::from("events.jsonl")))
        );
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("events.jsonl");
        let id = TaskId::new();

        let mut sink = EventDestination::File(path.clone()).open().unwrap();
        sink.emit(&StoreEvent::for_task(EventKind::TaskCreated, id, Utc::now()))
            .unwrap();
        sink.emit(&StoreEvent::new(EventKind::FilterChanged, Utc::now()))
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "task_created");
        assert_eq!(lines[0]["task_id"], id.to_string());
        assert_eq!(lines[0]["schema_version"], EVENT_SCHEMA_VERSION);
        assert!(lines[1].get("task_id").is_none());
    }
}
