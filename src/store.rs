//! The task store: authoritative task collection, view criteria, and the
//! single undo slot.
//!
//! All operations are synchronous and never fail towards the caller.
//! Unknown ids and blank titles are no-ops (reported through `bool`/`Option`
//! return values); persistence failures are logged by the repository and
//! otherwise ignored, leaving the in-memory state authoritative.
//!
//! Every mutation persists the whole collection, replaces the undo slot, and
//! notifies listeners. Setters for filter, search and sorting only notify.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::{EventKind, StoreEvent};
use crate::storage::{KeyValueStore, SessionRecord, TaskRepository};
use crate::task::{Task, TaskId, TaskPatch};
use crate::undo::{UndoAction, UndoKind, UndoOutcome, UndoPolicy};
use crate::view::{self, Filter, SortBy, SortOrder, TaskCounts, ViewCriteria};

/// Source of "now" for timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Change listener registered with [`TaskStore::subscribe`].
pub type Listener = Box<dyn FnMut(&StoreEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Owned copy of the store state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSnapshot {
    pub tasks: Vec<Task>,
    pub criteria: ViewCriteria,
    pub last_action: Option<UndoAction>,
    pub initialized: bool,
}

pub struct TaskStore<S> {
    repository: TaskRepository<S>,
    tasks: Vec<Task>,
    criteria: ViewCriteria,
    last_action: Option<UndoAction>,
    initialized: bool,
    undo_policy: UndoPolicy,
    clock: Box<dyn Clock>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<S> fmt::Debug for TaskStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks.len())
            .field("criteria", &self.criteria)
            .field("last_action", &self.last_action.as_ref().map(|a| a.kind))
            .field("initialized", &self.initialized)
            .field("undo_policy", &self.undo_policy)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Empty, not yet hydrated store with default criteria.
    pub fn new(repository: TaskRepository<S>) -> Self {
        Self {
            repository,
            tasks: Vec::new(),
            criteria: ViewCriteria::default(),
            last_action: None,
            initialized: false,
            undo_policy: UndoPolicy::default(),
            clock: Box::new(SystemClock),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn with_criteria(mut self, criteria: ViewCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn with_undo_policy(mut self, policy: UndoPolicy) -> Self {
        self.undo_policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load persisted tasks once. Later calls are no-ops and return `false`.
    ///
    /// Replaces whatever the collection held before. Leaves the undo slot
    /// alone.
    pub fn hydrate(&mut self) -> bool {
        if self.initialized {
            return false;
        }

        let mut loaded = self.repository.load();
        view::sort_tasks(&mut loaded, self.criteria.sort_by, self.criteria.sort_order);
        debug!(count = loaded.len(), "hydrated task store");
        self.tasks = loaded;
        self.initialized = true;

        let now = self.clock.now();
        self.notify(StoreEvent::new(EventKind::Hydrated, now));
        true
    }

    /// Install a previously persisted undo record, if it still fits the
    /// current collection.
    pub fn resume(&mut self, action: UndoAction) -> bool {
        let present = self.position(action.task_id).is_some();
        if !action.applies_to(present) {
            debug!(kind = %action.kind, task = %action.task_id, "discarding stale undo record");
            return false;
        }
        self.last_action = Some(action);
        true
    }

    /// Persist the undo slot so a later session can `resume` it.
    pub fn persist_session(&mut self) {
        let record = SessionRecord {
            last_action: self.last_action.clone(),
        };
        self.repository.save_session(&record);
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a pending task. Blank titles are ignored.
    pub fn add_task(&mut self, title: &str, description: Option<&str>) -> Option<TaskId> {
        let now = self.clock.now();
        let task = Task::new(title, description, now)?;
        let id = task.id;

        self.tasks.push(task);
        self.resort();
        self.persist();
        self.last_action = Some(UndoAction::created(id, now));

        self.notify(StoreEvent::for_task(EventKind::TaskCreated, id, now));
        Some(id)
    }

    /// Apply `patch` to the task with `id`. Returns `false` if absent.
    pub fn update_task(&mut self, id: TaskId, patch: &TaskPatch) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let now = self.clock.now();

        let previous = self.tasks[index].clone();
        self.tasks[index].apply_patch(patch, now);
        self.persist();
        self.last_action = Some(UndoAction::updated(previous, now));

        self.notify(StoreEvent::for_task(EventKind::TaskUpdated, id, now));
        true
    }

    /// Flip a task between pending and completed. Returns `false` if absent.
    pub fn toggle_task(&mut self, id: TaskId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let now = self.clock.now();

        self.tasks[index].toggle(now);
        self.persist();
        self.last_action = Some(UndoAction::toggled(id, now));

        self.notify(StoreEvent::for_task(EventKind::TaskToggled, id, now));
        true
    }

    /// Remove a task. The reduced collection is persisted either way; the
    /// undo slot only changes when something was removed.
    pub fn delete_task(&mut self, id: TaskId) -> bool {
        let now = self.clock.now();
        let removed = self.position(id).map(|index| self.tasks.remove(index));
        self.persist();

        match removed {
            Some(previous) => {
                self.last_action = Some(UndoAction::deleted(previous, now));
                self.notify(StoreEvent::for_task(EventKind::TaskDeleted, id, now));
                true
            }
            None => false,
        }
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.criteria.filter = filter;
        let now = self.clock.now();
        self.notify(StoreEvent::new(EventKind::FilterChanged, now));
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.criteria.search_query = query.into();
        let now = self.clock.now();
        self.notify(StoreEvent::new(EventKind::SearchChanged, now));
    }

    pub fn set_sorting(&mut self, sort_by: SortBy, sort_order: SortOrder) {
        self.criteria.sort_by = sort_by;
        self.criteria.sort_order = sort_order;
        let now = self.clock.now();
        self.notify(StoreEvent::new(EventKind::SortingChanged, now));
    }

    /// Revert the most recent mutation. `None` when there is nothing to undo.
    ///
    /// Deletes and updates are restored from their snapshot and empty the
    /// slot. Creates and toggles are reverted by running `delete_task` /
    /// `toggle_task`, which write their own record; the undo policy then
    /// decides whether that record stays.
    pub fn undo_last_action(&mut self) -> Option<UndoOutcome> {
        let action = self.last_action.clone()?;

        match action.kind {
            UndoKind::Create => {
                self.delete_task(action.task_id);
                self.settle_delegated_undo();
            }
            UndoKind::Toggle => {
                self.toggle_task(action.task_id);
                self.settle_delegated_undo();
            }
            UndoKind::Delete => {
                let previous = action.previous_data.clone()?;
                let now = self.clock.now();
                if self.position(previous.id).is_none() {
                    self.tasks.push(previous);
                    self.resort();
                }
                self.persist();
                self.last_action = None;
                self.notify(StoreEvent::for_task(EventKind::TaskRestored, action.task_id, now));
            }
            UndoKind::Update => {
                let previous = action.previous_data.clone()?;
                let now = self.clock.now();
                if let Some(index) = self.position(action.task_id) {
                    self.tasks[index] = previous;
                }
                self.persist();
                self.last_action = None;
                self.notify(StoreEvent::for_task(EventKind::TaskReverted, action.task_id, now));
            }
        }

        Some(UndoOutcome {
            kind: action.kind,
            task_id: action.task_id,
            remaining: self.last_action.as_ref().map(|a| a.kind),
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The authoritative collection, in store order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Resolve a full id or a unique prefix of one (dashes optional).
    pub fn resolve_id(&self, input: &str) -> Result<TaskId> {
        let needle: String = input
            .trim()
            .chars()
            .filter(|ch| *ch != '-')
            .collect::<String>()
            .to_lowercase();
        if needle.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }

        let matches: Vec<TaskId> = self
            .tasks
            .iter()
            .map(|task| task.id)
            .filter(|id| id.as_uuid().simple().to_string().starts_with(&needle))
            .collect();

        match matches.as_slice() {
            [] => Err(Error::TaskNotFound(input.trim().to_string())),
            [id] => Ok(*id),
            _ => Err(Error::AmbiguousTaskId {
                prefix: input.trim().to_string(),
                matches: matches.len(),
            }),
        }
    }

    pub fn criteria(&self) -> &ViewCriteria {
        &self.criteria
    }

    pub fn filter(&self) -> Filter {
        self.criteria.filter
    }

    pub fn search_query(&self) -> &str {
        &self.criteria.search_query
    }

    pub fn sorting(&self) -> (SortBy, SortOrder) {
        (self.criteria.sort_by, self.criteria.sort_order)
    }

    pub fn last_action(&self) -> Option<&UndoAction> {
        self.last_action.as_ref()
    }

    pub fn undo_policy(&self) -> UndoPolicy {
        self.undo_policy
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Filtered, searched and sorted tasks for the current criteria.
    pub fn view(&self) -> Vec<Task> {
        view::compute_view(&self.tasks, &self.criteria)
    }

    pub fn counts(&self) -> TaskCounts {
        view::count_tasks(&self.tasks)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            tasks: self.tasks.clone(),
            criteria: self.criteria.clone(),
            last_action: self.last_action.clone(),
            initialized: self.initialized,
        }
    }

    pub fn repository(&self) -> &TaskRepository<S> {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut TaskRepository<S> {
        &mut self.repository
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Register a listener called synchronously after every state change.
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    fn resort(&mut self) {
        view::sort_tasks(&mut self.tasks, self.criteria.sort_by, self.criteria.sort_order);
    }

    fn persist(&mut self) {
        self.repository.save(&self.tasks);
    }

    fn settle_delegated_undo(&mut self) {
        if self.undo_policy == UndoPolicy::Clear && self.last_action.take().is_some() {
            let now = self.clock.now();
            self.notify(StoreEvent::new(EventKind::UndoCleared, now));
        }
    }

    fn notify(&mut self, event: StoreEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}
