//! Task records and validation of persisted task data.
//!
//! A [`Task`] is the unit the store tracks. Persisted records are untrusted:
//! [`validate_record`] turns each raw JSON element into either a valid task or
//! a rejection, so one bad element never spoils the rest of the collection.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unique, immutable task identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First eight hex digits, enough to address a task from the CLI.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| Error::InvalidArgument(format!("malformed task id '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    /// Label used for persistence and for status ordering.
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(Error::InvalidArgument(format!(
                "invalid status '{other}': must be pending or completed"
            ))),
        }
    }
}

/// A single tracked to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Build a pending task. Returns `None` when the title is blank.
    pub fn new(title: &str, description: Option<&str>, now: DateTime<Utc>) -> Option<Self> {
        let title = non_blank(title)?;
        Some(Self {
            id: TaskId::new(),
            title,
            description: description.and_then(non_blank),
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Apply the fields present in `patch`.
    ///
    /// A blank title keeps the current one; a blank description clears it.
    pub fn apply_patch(&mut self, patch: &TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title.as_deref() {
            if let Some(title) = non_blank(title) {
                self.title = title;
            }
        }
        if let Some(description) = patch.description.as_deref() {
            self.description = non_blank(description);
        }
        self.touch(now);
    }

    /// Flip between pending and completed, maintaining `completed_at`.
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.status = self.status.flipped();
        self.completed_at = match self.status {
            TaskStatus::Completed => Some(now),
            TaskStatus::Pending => None,
        };
        self.touch(now);
    }

    /// Case-insensitive substring match on title or description.
    /// `needle` must already be lowercased.
    pub fn matches_query(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(needle))
                .unwrap_or(false)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        // Keep updated_at >= created_at even if the clock went backwards.
        self.updated_at = now.max(self.created_at);
    }
}

/// Partial update for [`Task::apply_patch`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            title: None,
            description: Some(description.into()),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// =============================================================================
// Validation of persisted records
// =============================================================================

/// Outcome of validating one persisted element.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordCheck {
    Valid(Task),
    Rejected(Rejection),
}

/// Why a persisted element was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Not an object, a required field is missing, or a field has the wrong type.
    Shape(String),
    MalformedId(String),
    BlankTitle,
    BadTimestamp { field: &'static str, value: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Shape(reason) => write!(f, "invalid shape: {reason}"),
            Rejection::MalformedId(id) => write!(f, "malformed id '{id}'"),
            Rejection::BlankTitle => f.write_str("blank title"),
            Rejection::BadTimestamp { field, value } => {
                write!(f, "unparsable {field} '{value}'")
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTask {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    status: TaskStatus,
    created_at: String,
    updated_at: String,
    #[serde(default)]
    completed_at: Option<String>,
}

/// Validate and normalize one persisted element.
///
/// Normalization keeps the task invariants: `completed_at` is dropped from
/// pending tasks and filled from `updated_at` for completed ones, and
/// `updated_at` is never earlier than `created_at`.
pub fn validate_record(value: serde_json::Value) -> RecordCheck {
    let raw: RawTask = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(err) => return RecordCheck::Rejected(Rejection::Shape(err.to_string())),
    };

    let id = match Uuid::parse_str(&raw.id) {
        Ok(uuid) => TaskId(uuid),
        Err(_) => return RecordCheck::Rejected(Rejection::MalformedId(raw.id)),
    };

    let title = match non_blank(&raw.title) {
        Some(title) => title,
        None => return RecordCheck::Rejected(Rejection::BlankTitle),
    };

    let created_at = match parse_timestamp("createdAt", &raw.created_at) {
        Ok(ts) => ts,
        Err(rejection) => return RecordCheck::Rejected(rejection),
    };
    let updated_at = match parse_timestamp("updatedAt", &raw.updated_at) {
        Ok(ts) => ts.max(created_at),
        Err(rejection) => return RecordCheck::Rejected(rejection),
    };
    let completed_at = match raw.completed_at.as_deref() {
        Some(value) => match parse_timestamp("completedAt", value) {
            Ok(ts) => Some(ts),
            Err(rejection) => return RecordCheck::Rejected(rejection),
        },
        None => None,
    };

    let completed_at = match raw.status {
        TaskStatus::Pending => None,
        TaskStatus::Completed => Some(completed_at.unwrap_or(updated_at)),
    };

    RecordCheck::Valid(Task {
        id,
        title,
        description: raw.description.as_deref().and_then(non_blank),
        status: raw.status,
        created_at,
        updated_at,
        completed_at,
    })
}

fn parse_timestamp(
    field: &'static str,
    value: &str,
) -> std::result::Result<DateTime<Utc>, Rejection> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| Rejection::BadTimestamp {
            field,
            value: value.to_string(),
        })
}
