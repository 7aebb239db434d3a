//! Single-slot undo records.
//!
//! Only the most recent mutating operation can be undone. The store keeps at
//! most one [`UndoAction`]; every mutation replaces it. How the slot looks
//! after undoing a create or toggle is governed by [`UndoPolicy`]:
//! - `Clear`: the slot is emptied once the undo has run
//! - `Chain`: the record written by the reverting operation is kept, so a
//!   second undo re-applies the original change

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndoKind {
    Create,
    Update,
    Delete,
    Toggle,
}

impl UndoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UndoKind::Create => "create",
            UndoKind::Update => "update",
            UndoKind::Delete => "delete",
            UndoKind::Toggle => "toggle",
        }
    }
}

impl fmt::Display for UndoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the most recent mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoAction {
    pub kind: UndoKind,
    pub task_id: TaskId,
    /// Task as it was before the operation (update and delete only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_data: Option<Task>,
    pub timestamp: DateTime<Utc>,
}

impl UndoAction {
    pub fn created(task_id: TaskId, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: UndoKind::Create,
            task_id,
            previous_data: None,
            timestamp,
        }
    }

    pub fn updated(previous: Task, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: UndoKind::Update,
            task_id: previous.id,
            previous_data: Some(previous),
            timestamp,
        }
    }

    pub fn deleted(previous: Task, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: UndoKind::Delete,
            task_id: previous.id,
            previous_data: Some(previous),
            timestamp,
        }
    }

    pub fn toggled(task_id: TaskId, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: UndoKind::Toggle,
            task_id,
            previous_data: None,
            timestamp,
        }
    }

    /// Whether this record can still be applied to a collection in which
    /// the task is (or is not) present.
    pub fn applies_to(&self, task_present: bool) -> bool {
        match self.kind {
            UndoKind::Create | UndoKind::Toggle => task_present,
            UndoKind::Update => task_present && self.previous_data.is_some(),
            UndoKind::Delete => !task_present && self.previous_data.is_some(),
        }
    }
}

/// What happens to the undo slot after undoing a create or toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndoPolicy {
    #[default]
    Clear,
    Chain,
}

impl FromStr for UndoPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "clear" => Ok(UndoPolicy::Clear),
            "chain" => Ok(UndoPolicy::Chain),
            other => Err(Error::InvalidArgument(format!(
                "invalid undo policy '{other}': must be clear or chain"
            ))),
        }
    }
}

/// Result of a successful `undo_last_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndoOutcome {
    pub kind: UndoKind,
    pub task_id: TaskId,
    /// Undo record left in the slot afterwards (only under `Chain`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<UndoKind>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let task = Task::new("snapshot", None, now()).unwrap();
        let action = UndoAction::deleted(task.clone(), now());
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["kind"], "delete");
        assert_eq!(value["taskId"], task.id.to_string());
        assert_eq!(value["previousData"]["title"], "snapshot");

        let created = serde_json::to_value(UndoAction::created(task.id, now())).unwrap();
        assert!(created.get("previousData").is_none());
    }

    #[test]
    fn applicability_depends_on_task_presence() {
        let task = Task::new("x", None, now()).unwrap();
        assert!(UndoAction::created(task.id, now()).applies_to(true));
        assert!(!UndoAction::created(task.id, now()).applies_to(false));
        assert!(UndoAction::deleted(task.clone(), now()).applies_to(false));
        assert!(!UndoAction::deleted(task.clone(), now()).applies_to(true));
        assert!(UndoAction::updated(task.clone(), now()).applies_to(true));
        assert!(!UndoAction::toggled(task.id, now()).applies_to(false));
    }

    #[test]
    fn policy_parses() {
        assert_eq!("CHAIN".parse::<UndoPolicy>().unwrap(), UndoPolicy::Chain);
        assert_eq!(UndoPolicy::default(), UndoPolicy::Clear);
        assert!("stack".parse::<UndoPolicy>().is_err());
    }
}
