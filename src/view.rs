//! Derived views over the task collection.
//!
//! [`compute_view`] is pure: it filters, searches and sorts a borrowed
//! collection and hands back an owned list. The store recomputes it on
//! demand; callers decide how much to cache.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Task, TaskStatus};

/// Which statuses a view keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Pending,
    Completed,
}

impl Filter {
    pub fn admits(&self, status: TaskStatus) -> bool {
        match self {
            Filter::All => true,
            Filter::Pending => status == TaskStatus::Pending,
            Filter::Completed => status == TaskStatus::Completed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Pending => "pending",
            Filter::Completed => "completed",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "pending" => Ok(Filter::Pending),
            "completed" => Ok(Filter::Completed),
            other => Err(Error::InvalidArgument(format!(
                "invalid filter '{other}': must be all, pending, or completed"
            ))),
        }
    }
}

/// Sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    CreatedAt,
    Status,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::CreatedAt => "created_at",
            SortBy::Status => "status",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "created_at" | "created" | "createdat" => Ok(SortBy::CreatedAt),
            "status" => Ok(SortBy::Status),
            other => Err(Error::InvalidArgument(format!(
                "invalid sort key '{other}': must be created_at or status"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(Error::InvalidArgument(format!(
                "invalid sort order '{other}': must be asc or desc"
            ))),
        }
    }
}

/// Everything a view depends on besides the tasks themselves.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewCriteria {
    pub filter: Filter,
    pub search_query: String,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl ViewCriteria {
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search_query = query.into();
        self
    }

    pub fn with_sorting(mut self, sort_by: SortBy, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }
}

/// Compare two tasks by `sort_by`, honoring `sort_order`.
///
/// Status ordering is lexicographic on the label, so `completed` sorts
/// before `pending` ascending.
pub fn compare_tasks(a: &Task, b: &Task, sort_by: SortBy, sort_order: SortOrder) -> Ordering {
    let ordering = match sort_by {
        SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        SortBy::Status => a.status.label().cmp(b.status.label()),
    };
    match sort_order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

/// Stable in-place sort. Ties keep their relative order in both directions.
pub fn sort_tasks(tasks: &mut [Task], sort_by: SortBy, sort_order: SortOrder) {
    tasks.sort_by(|a, b| compare_tasks(a, b, sort_by, sort_order));
}

/// Filter, search and sort `tasks` without touching them.
pub fn compute_view(tasks: &[Task], criteria: &ViewCriteria) -> Vec<Task> {
    let needle = criteria.search_query.trim().to_lowercase();

    let mut view: Vec<Task> = tasks
        .iter()
        .filter(|task| criteria.filter.admits(task.status))
        .filter(|task| needle.is_empty() || task.matches_query(&needle))
        .cloned()
        .collect();

    sort_tasks(&mut view, criteria.sort_by, criteria.sort_order);
    view
}

/// Task totals by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaskCounts {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
}

pub fn count_tasks(tasks: &[Task]) -> TaskCounts {
    let completed = tasks.iter().filter(|task| task.is_completed()).count();
    TaskCounts {
        total: tasks.len(),
        pending: tasks.len() - completed,
        completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn task(title: &str, description: Option<&str>, created: i64, done: bool) -> Task {
        let mut task = Task::new(title, description, at(created)).unwrap();
        if done {
            task.toggle(at(created + 1));
        }
        task
    }

    fn titles(view: &[Task]) -> Vec<&str> {
        view.iter().map(|task| task.title.as_str()).collect()
    }

    fn fixture() -> Vec<Task> {
        vec![
            task("Water plants", None, 30, false),
            task("Pay rent", Some("before the 5th"), 10, true),
            task("Call mom", Some("Sunday PLANS"), 20, false),
            task("File taxes", None, 40, true),
        ]
    }

    #[test]
    fn default_view_sorts_by_creation_ascending() {
        let view = compute_view(&fixture(), &ViewCriteria::default());
        assert_eq!(
            titles(&view),
            vec!["Pay rent", "Call mom", "Water plants", "File taxes"]
        );
    }

    #[test]
    fn descending_creation_order() {
        let criteria = ViewCriteria::default().with_sorting(SortBy::CreatedAt, SortOrder::Desc);
        let view = compute_view(&fixture(), &criteria);
        assert_eq!(
            titles(&view),
            vec!["File taxes", "Water plants", "Call mom", "Pay rent"]
        );
    }

    #[test]
    fn filter_keeps_matching_status_only() {
        let tasks = fixture();
        let pending = compute_view(&tasks, &ViewCriteria::default().with_filter(Filter::Pending));
        assert_eq!(titles(&pending), vec!["Call mom", "Water plants"]);

        let completed =
            compute_view(&tasks, &ViewCriteria::default().with_filter(Filter::Completed));
        assert_eq!(titles(&completed), vec!["Pay rent", "File taxes"]);
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let tasks = fixture();
        let view = compute_view(&tasks, &ViewCriteria::default().with_search("  plan "));
        assert_eq!(titles(&view), vec!["Call mom", "Water plants"]);

        let view = compute_view(&tasks, &ViewCriteria::default().with_search("5TH"));
        assert_eq!(titles(&view), vec!["Pay rent"]);

        let blank = compute_view(&tasks, &ViewCriteria::default().with_search("   "));
        assert_eq!(blank.len(), tasks.len());
    }

    #[test]
    fn status_sort_is_stable_in_both_directions() {
        let tasks = fixture();
        let asc = compute_view(
            &tasks,
            &ViewCriteria::default().with_sorting(SortBy::Status, SortOrder::Asc),
        );
        assert_eq!(
            titles(&asc),
            vec!["Pay rent", "File taxes", "Water plants", "Call mom"]
        );

        let desc = compute_view(
            &tasks,
            &ViewCriteria::default().with_sorting(SortBy::Status, SortOrder::Desc),
        );
        assert_eq!(
            titles(&desc),
            vec!["Water plants", "Call mom", "Pay rent", "File taxes"]
        );
    }

    #[test]
    fn filter_search_and_sort_compose() {
        let criteria = ViewCriteria::default()
            .with_filter(Filter::Pending)
            .with_search("m")
            .with_sorting(SortBy::CreatedAt, SortOrder::Desc);
        let view = compute_view(&fixture(), &criteria);
        assert_eq!(titles(&view), vec!["Call mom"]);
    }

    #[test]
    fn compute_view_leaves_input_untouched() {
        let tasks = fixture();
        let before = tasks.clone();
        let _ = compute_view(
            &tasks,
            &ViewCriteria::default().with_sorting(SortBy::Status, SortOrder::Desc),
        );
        assert_eq!(tasks, before);
    }

    #[test]
    fn counts_split_by_status() {
        let counts = count_tasks(&fixture());
        assert_eq!(
            counts,
            TaskCounts {
                total: 4,
                pending: 2,
                completed: 2
            }
        );
    }

    #[test]
    fn criteria_parse_from_cli_text() {
        assert_eq!("Pending".parse::<Filter>().unwrap(), Filter::Pending);
        assert_eq!("created".parse::<SortBy>().unwrap(), SortBy::CreatedAt);
        assert_eq!("descending".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("newest".parse::<SortBy>().is_err());
    }
}
