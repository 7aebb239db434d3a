//! taskpad command implementations.

use serde::Serialize;
use tracing::warn;

use crate::cli::GlobalOptions;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::EventDestination;
use crate::lock::FileLock;
use crate::output::{emit_success, HumanOutput};
use crate::storage::{FileStore, TaskRepository};
use crate::store::TaskStore;
use crate::task::{Task, TaskPatch};
use crate::undo::{UndoKind, UndoOutcome};
use crate::view::{Filter, SortBy, SortOrder, TaskCounts, ViewCriteria};

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

pub struct ListOptions {
    pub filter: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Open the file-backed store, hydrate it, and pick up the pending undo
/// record left by the previous invocation.
///
/// The returned lock guards the task key until the command finishes; keep
/// it alive for as long as the store is used.
fn open_store(global: &GlobalOptions) -> Result<(TaskStore<FileStore>, FileLock)> {
    let config = match &global.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_dir(&std::env::current_dir()?),
    };

    let dir = global
        .data_dir
        .clone()
        .unwrap_or_else(|| config.storage.resolved_dir());
    let repository = TaskRepository::new(FileStore::new(dir), config.storage.key.clone());
    let lock = repository.lock()?;
    let mut store = TaskStore::new(repository)
        .with_criteria(config.view.criteria())
        .with_undo_policy(config.undo.policy);

    if let Some(destination) = EventDestination::parse(global.events.as_deref()) {
        let mut sink = destination.open()?;
        store.subscribe(move |event| {
            if let Err(err) = sink.emit(event) {
                warn!(error = %err, "failed to write store event");
            }
        });
    }

    store.hydrate();
    if let Some(action) = store.repository().load_session().last_action {
        store.resume(action);
    }
    Ok((store, lock))
}

fn task_line(task: &Task) -> String {
    let mark = if task.is_completed() { "[x]" } else { "[ ]" };
    format!("{mark} {}  {}", task.id.short(), task.title)
}

fn task_human(header: &str, task: &Task) -> HumanOutput {
    let mut human = HumanOutput::new(format!("{header}: {}", task_line(task)));
    human.push_summary("id", task.id.to_string());
    human.push_summary("status", task.status.label());
    if let Some(description) = &task.description {
        human.push_summary("description", description.clone());
    }
    human.push_summary("created", task.created_at.to_rfc3339());
    human.push_summary("updated", task.updated_at.to_rfc3339());
    if let Some(completed_at) = task.completed_at {
        human.push_summary("completed", completed_at.to_rfc3339());
    }
    human
}

fn require_task<'a>(store: &'a TaskStore<FileStore>, input: &str) -> Result<&'a Task> {
    let id = store.resolve_id(input)?;
    store
        .task(id)
        .ok_or_else(|| Error::TaskNotFound(input.to_string()))
}

pub fn run_add(global: &GlobalOptions, opts: AddOptions) -> Result<()> {
    let (mut store, _lock) = open_store(global)?;
    let id = store
        .add_task(&opts.title, opts.description.as_deref())
        .ok_or_else(|| Error::InvalidArgument("task title cannot be empty".to_string()))?;
    store.persist_session();

    let task = require_task(&store, &id.to_string())?;
    emit_success(global.output, "add", task, Some(&task_human("Added", task)))
}

pub fn run_edit(global: &GlobalOptions, opts: EditOptions) -> Result<()> {
    let patch = TaskPatch {
        title: opts.title,
        description: opts.description,
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to change: pass --title and/or --description".to_string(),
        ));
    }

    let (mut store, _lock) = open_store(global)?;
    let id = store.resolve_id(&opts.id)?;
    store.update_task(id, &patch);
    store.persist_session();

    let task = require_task(&store, &id.to_string())?;
    emit_success(global.output, "edit", task, Some(&task_human("Updated", task)))
}

pub fn run_toggle(global: &GlobalOptions, input: &str) -> Result<()> {
    let (mut store, _lock) = open_store(global)?;
    let id = store.resolve_id(input)?;
    store.toggle_task(id);
    store.persist_session();

    let task = require_task(&store, &id.to_string())?;
    let header = if task.is_completed() {
        "Completed"
    } else {
        "Reopened"
    };
    emit_success(global.output, "toggle", task, Some(&task_human(header, task)))
}

pub fn run_rm(global: &GlobalOptions, input: &str) -> Result<()> {
    let (mut store, _lock) = open_store(global)?;
    let removed = require_task(&store, input)?.clone();
    store.delete_task(removed.id);
    store.persist_session();

    let mut human = task_human("Deleted", &removed);
    human.push_detail("run `taskpad undo` to restore it");
    emit_success(global.output, "rm", &removed, Some(&human))
}

#[derive(Serialize)]
struct UndoOutput {
    undone: Option<UndoOutcome>,
}

pub fn run_undo(global: &GlobalOptions) -> Result<()> {
    let (mut store, _lock) = open_store(global)?;
    let outcome = store.undo_last_action();
    store.persist_session();

    let human = match &outcome {
        None => HumanOutput::new("Nothing to undo"),
        Some(outcome) => {
            let verb = match outcome.kind {
                UndoKind::Create => "Removed newly created task",
                UndoKind::Update => "Reverted edit of",
                UndoKind::Delete => "Restored",
                UndoKind::Toggle => "Flipped back",
            };
            let mut human = HumanOutput::new(format!("{verb} {}", outcome.task_id.short()));
            if let Some(task) = store.task(outcome.task_id) {
                human.push_detail(task_line(task));
            }
            if let Some(remaining) = outcome.remaining {
                human.push_summary("pending undo", remaining.as_str());
            }
            human
        }
    };

    emit_success(global.output, "undo", &UndoOutput { undone: outcome }, Some(&human))
}

#[derive(Serialize)]
struct ListOutput {
    criteria: ViewCriteria,
    count: usize,
    tasks: Vec<Task>,
}

pub fn run_list(global: &GlobalOptions, opts: ListOptions) -> Result<()> {
    let (mut store, _lock) = open_store(global)?;

    if let Some(filter) = opts.filter.as_deref() {
        store.set_filter(filter.parse::<Filter>()?);
    }
    if let Some(search) = opts.search {
        store.set_search_query(search);
    }
    if opts.sort.is_some() || opts.order.is_some() {
        let (current_by, current_order) = store.sorting();
        let sort_by = match opts.sort.as_deref() {
            Some(raw) => raw.parse::<SortBy>()?,
            None => current_by,
        };
        let sort_order = match opts.order.as_deref() {
            Some(raw) => raw.parse::<SortOrder>()?,
            None => current_order,
        };
        store.set_sorting(sort_by, sort_order);
    }

    let tasks = store.view();
    let criteria = store.criteria().clone();

    let mut human = HumanOutput::new(format!("Tasks ({})", tasks.len()));
    human.push_summary("filter", criteria.filter.as_str());
    if !criteria.search_query.trim().is_empty() {
        human.push_summary("search", criteria.search_query.clone());
    }
    human.push_summary(
        "sort",
        format!("{} {}", criteria.sort_by, criteria.sort_order),
    );
    for task in &tasks {
        human.push_detail(task_line(task));
    }

    let output = ListOutput {
        criteria,
        count: tasks.len(),
        tasks,
    };
    emit_success(global.output, "list", &output, Some(&human))
}

pub fn run_show(global: &GlobalOptions, input: &str) -> Result<()> {
    let (store, _lock) = open_store(global)?;
    let task = require_task(&store, input)?;
    emit_success(global.output, "show", task, Some(&task_human("Task", task)))
}

#[derive(Serialize)]
struct StatsOutput {
    counts: TaskCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_undo: Option<UndoKind>,
}

pub fn run_stats(global: &GlobalOptions) -> Result<()> {
    let (store, _lock) = open_store(global)?;
    let output = StatsOutput {
        counts: store.counts(),
        pending_undo: store.last_action().map(|action| action.kind),
    };

    let mut human = HumanOutput::new("Task stats");
    human.push_summary("total", output.counts.total.to_string());
    human.push_summary("pending", output.counts.pending.to_string());
    human.push_summary("completed", output.counts.completed.to_string());
    if let Some(kind) = output.pending_undo {
        human.push_summary("undo available", kind.as_str());
    }

    emit_success(global.output, "stats", &output, Some(&human))
}
