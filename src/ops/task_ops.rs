use std::time::Duration;

use tracing::{debug, info, warn};

use crate::io::store::{ListStore, StoreError, TaskStore};
use crate::model::config::Config;
use crate::model::deadline::Deadline;
use crate::model::list::{List, ListId, ListPatch};
use crate::model::task::{Task, TaskPatch};
use crate::ops::echo::EchoScheduler;
use crate::ops::recurrence::next_occurrence;
use crate::ops::views;
use crate::util::clock::Clock;

/// Error type for engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Rejected locally; never reached the store
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => EngineError::NotFound(what),
            other => EngineError::Store(other),
        }
    }
}

/// What `toggle_complete` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// A non-recurring task was archived
    Completed(Task),
    /// A recurring task was archived and its next occurrence created
    Recurred { completed: Task, next: Task },
    /// A completed task was made active again
    Reopened(Task),
}

/// Owns the task and list collections and every mutation applied to them.
///
/// The in-memory collections are only ever replaced by a fresh fetch from
/// the store after a mutation succeeds, so they never run ahead of it.
pub struct Engine<S> {
    store: S,
    clock: Box<dyn Clock>,
    echo: EchoScheduler,
    restore_list_on_reopen: bool,
    tasks: Vec<Task>,
    lists: Vec<List>,
}

impl<S: TaskStore + ListStore> Engine<S> {
    /// Build an engine with empty collections. Call [`refresh`](Self::refresh)
    /// (or use [`open`](Self::open)) before reading.
    pub fn new(store: S, clock: impl Clock + 'static, config: &Config) -> Self {
        Engine {
            store,
            clock: Box::new(clock),
            echo: EchoScheduler::new(Duration::from_millis(config.echo.grace_ms)),
            restore_list_on_reopen: config.lifecycle.uncomplete_restores_list,
            tasks: Vec::new(),
            lists: Vec::new(),
        }
    }

    /// Build an engine and load both collections.
    pub fn open(store: S, clock: impl Clock + 'static, config: &Config) -> Result<Self, EngineError> {
        let mut engine = Self::new(store, clock, config);
        engine.refresh()?;
        Ok(engine)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn lists(&self) -> &[List] {
        &self.lists
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn list(&self, id: ListId) -> Option<&List> {
        self.lists.iter().find(|l| l.id == id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn echo(&self) -> &EchoScheduler {
        &self.echo
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    // -----------------------------------------------------------------------
    // Fetch
    // -----------------------------------------------------------------------

    /// Replace both collections with the store's current contents.
    pub fn refresh(&mut self) -> Result<(), EngineError> {
        let tasks = self.store.fetch_tasks()?;
        let lists = self.store.fetch_lists()?;
        debug!(tasks = tasks.len(), lists = lists.len(), "collections refreshed");
        self.tasks = tasks;
        self.lists = lists;
        Ok(())
    }

    fn refresh_tasks(&mut self) -> Result<(), EngineError> {
        self.tasks = self.store.fetch_tasks()?;
        debug!(tasks = self.tasks.len(), "tasks refreshed");
        Ok(())
    }

    fn refresh_lists(&mut self) -> Result<(), EngineError> {
        self.lists = self.store.fetch_lists()?;
        Ok(())
    }

    /// Best-effort refetch after a failed multi-step mutation.
    fn resync(&mut self) {
        if let Err(e) = self.refresh() {
            warn!(error = %e, "refetch after failed mutation also failed");
        }
    }

    // -----------------------------------------------------------------------
    // Task CRUD
    // -----------------------------------------------------------------------

    /// Persist a new Active task. Returns it with its store-assigned id.
    pub fn create_task(&mut self, mut draft: Task) -> Result<Task, EngineError> {
        validate_text(&draft.text)?;
        if draft.list_id == ListId::ARCHIVE {
            return Err(EngineError::Validation(
                "new tasks cannot be created in the archive".into(),
            ));
        }
        self.ensure_list(draft.list_id)?;
        draft.completed = false;
        draft.prior_list_id = None;

        let created = self.store.create_task(&draft)?;
        info!(id = %created.id, list = %created.list_id, "task created");
        self.refresh_tasks()?;
        Ok(created)
    }

    /// Apply a partial update. Completion changes must go through
    /// [`toggle_complete`](Self::toggle_complete).
    pub fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<Task, EngineError> {
        let completed = self
            .task(id)
            .map(|t| t.completed)
            .ok_or_else(|| EngineError::NotFound(format!("task {}", id)))?;
        if let Some(text) = &patch.text {
            validate_text(text)?;
        }
        if patch.completed.is_some()
            || patch.prior_list_id.is_some()
            || patch.list_id == Some(ListId::ARCHIVE)
        {
            return Err(EngineError::Validation(
                "completion state is changed with toggle_complete".into(),
            ));
        }
        if completed {
            // Archived records stay in the archive and never recur again.
            if patch.list_id.is_some() {
                return Err(EngineError::Validation(format!(
                    "task {} is completed; reopen it before moving it",
                    id
                )));
            }
            if let Some(Some(deadline)) = &patch.deadline {
                if deadline.recurrence().is_some() {
                    return Err(EngineError::Validation(format!(
                        "task {} is completed and cannot be made recurring",
                        id
                    )));
                }
            }
        }
        if let Some(list_id) = patch.list_id {
            self.ensure_list(list_id)?;
        }
        if patch.is_empty() {
            return self
                .task(id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound(format!("task {}", id)));
        }

        let updated = self.store.update_task(id, patch)?;
        debug!(id, "task updated");
        self.refresh_tasks()?;
        Ok(updated)
    }

    pub fn delete_task(&mut self, id: &str) -> Result<(), EngineError> {
        if self.task(id).is_none() {
            return Err(EngineError::NotFound(format!("task {}", id)));
        }
        self.store.delete_task(id)?;
        self.echo.cancel(id);
        info!(id, "task deleted");
        self.refresh_tasks()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Flip a task between Active and Completed.
    ///
    /// Completing archives the task. If its deadline recurs, a new Active
    /// task for the next occurrence is created alongside the archived one.
    /// Completing a task due today starts its echo; reopening cancels it.
    pub fn toggle_complete(&mut self, id: &str) -> Result<Completion, EngineError> {
        let task = self
            .task(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("task {}", id)))?;
        if task.completed {
            self.reopen(task)
        } else {
            self.complete(task)
        }
    }

    fn complete(&mut self, task: Task) -> Result<Completion, EngineError> {
        let today = self.clock.today();
        let mut patch = TaskPatch {
            completed: Some(true),
            list_id: Some(ListId::ARCHIVE),
            prior_list_id: Some(Some(task.list_id).filter(|l| *l != ListId::ARCHIVE)),
            ..Default::default()
        };

        let recurrence = task
            .deadline
            .as_ref()
            .and_then(|d| d.recurrence().map(|policy| (d, policy)));

        let outcome = match recurrence {
            Some((deadline, policy)) => {
                // The archived instance gives up its recurrence to the successor.
                let mut consumed = deadline.clone();
                consumed.recurring = None;
                patch.deadline = Some(Some(consumed));

                let completed = self.store.update_task(&task.id, &patch)?;
                match next_occurrence(deadline.date, policy) {
                    Some(next_date) => {
                        let successor = successor_of(&task, next_date);
                        match self.store.create_task(&successor) {
                            Ok(next) => {
                                info!(
                                    id = %task.id,
                                    next_id = %next.id,
                                    next_date = %next_date,
                                    policy = %policy,
                                    "recurring task completed, next occurrence created"
                                );
                                Completion::Recurred { completed, next }
                            }
                            Err(e) => {
                                self.rollback_completion(&task);
                                self.resync();
                                return Err(e.into());
                            }
                        }
                    }
                    None => {
                        warn!(id = %task.id, date = %deadline.date, "no next occurrence representable");
                        Completion::Completed(completed)
                    }
                }
            }
            None => {
                let completed = self.store.update_task(&task.id, &patch)?;
                info!(id = %task.id, "task completed");
                Completion::Completed(completed)
            }
        };

        if task.deadline.as_ref().is_some_and(|d| d.is_on(today)) {
            self.echo.mark(&task.id);
        }
        self.refresh_tasks()?;
        Ok(outcome)
    }

    fn reopen(&mut self, task: Task) -> Result<Completion, EngineError> {
        let target = if self.restore_list_on_reopen {
            task.prior_list_id
                .filter(|l| *l != ListId::ARCHIVE && self.list_is_known(*l))
                .unwrap_or(ListId::UNSORTED)
        } else {
            ListId::UNSORTED
        };
        let patch = TaskPatch {
            completed: Some(false),
            list_id: Some(target),
            prior_list_id: Some(None),
            ..Default::default()
        };

        let reopened = self.store.update_task(&task.id, &patch)?;
        self.echo.cancel(&task.id);
        info!(id = %task.id, list = %target, "task reopened");
        self.refresh_tasks()?;
        Ok(Completion::Reopened(reopened))
    }

    /// Undo the archive half of a recurring completion whose successor could
    /// not be created.
    fn rollback_completion(&mut self, original: &Task) {
        let patch = TaskPatch {
            completed: Some(false),
            list_id: Some(original.list_id),
            prior_list_id: Some(original.prior_list_id),
            deadline: Some(original.deadline.clone()),
            ..Default::default()
        };
        match self.store.update_task(&original.id, &patch) {
            Ok(_) => warn!(id = %original.id, "successor creation failed, completion rolled back"),
            Err(e) => warn!(
                id = %original.id,
                error = %e,
                "successor creation failed and rollback failed; task stays archived"
            ),
        }
    }

    // -----------------------------------------------------------------------
    // Lists
    // -----------------------------------------------------------------------

    pub fn create_list(&mut self, draft: List) -> Result<List, EngineError> {
        validate_name(&draft.name)?;
        let created = self.store.create_list(&draft)?;
        info!(list = %created.id, name = %created.name, "list created");
        self.refresh_lists()?;
        Ok(created)
    }

    pub fn update_list(&mut self, id: ListId, patch: &ListPatch) -> Result<List, EngineError> {
        if id.is_reserved() {
            return Err(EngineError::Validation(format!("list {} is reserved", id)));
        }
        if self.list(id).is_none() {
            return Err(EngineError::NotFound(format!("list {}", id)));
        }
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        let updated = self.store.update_list(id, patch)?;
        self.refresh_lists()?;
        Ok(updated)
    }

    /// Move every task on `list_id` to the unsorted bucket. Returns how many
    /// tasks moved.
    pub fn reassign_on_list_deletion(&mut self, list_id: ListId) -> Result<usize, EngineError> {
        if list_id.is_reserved() {
            return Err(EngineError::Validation(format!(
                "list {} is reserved; its tasks cannot be reassigned",
                list_id
            )));
        }
        // Work from the store's view, not a possibly stale local copy.
        self.refresh_tasks()?;
        let affected: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.list_id == list_id)
            .map(|t| t.id.clone())
            .collect();

        let patch = TaskPatch::default().list(ListId::UNSORTED);
        let store = &mut self.store;
        let result = affected
            .iter()
            .try_for_each(|id| store.update_task(id, &patch).map(|_| ()));
        if let Err(e) = result {
            self.resync();
            return Err(e.into());
        }

        if !affected.is_empty() {
            info!(list = %list_id, count = affected.len(), "tasks reassigned to unsorted");
        }
        self.refresh_tasks()?;
        Ok(affected.len())
    }

    /// Delete a list. Its tasks are moved to the unsorted bucket first, so
    /// no task ever references a list that no longer exists.
    pub fn delete_list(&mut self, list_id: ListId) -> Result<usize, EngineError> {
        if list_id.is_reserved() {
            return Err(EngineError::Validation(format!(
                "list {} is reserved and cannot be deleted",
                list_id
            )));
        }
        if self.list(list_id).is_none() {
            return Err(EngineError::NotFound(format!("list {}", list_id)));
        }

        let moved = self.reassign_on_list_deletion(list_id)?;
        self.store.delete_list(list_id)?;
        info!(list = %list_id, moved, "list deleted");
        self.refresh()?;
        Ok(moved)
    }

    // -----------------------------------------------------------------------
    // Projections
    // -----------------------------------------------------------------------

    /// Tasks due today plus completed ones whose echo has not yet run out.
    /// An echo past its grace window drops out here even before
    /// [`poll_echoes`](Self::poll_echoes) reaps its timer.
    pub fn today_view(&self) -> Vec<&Task> {
        views::today(&self.tasks, self.clock.today(), |id| self.echo.is_echoing(id))
    }

    pub fn missed_view(&self) -> Vec<&Task> {
        views::missed(&self.tasks, self.clock.now())
    }

    pub fn open_view(&self) -> Vec<&Task> {
        views::open(&self.tasks)
    }

    pub fn list_view(&self, list_id: ListId) -> Vec<&Task> {
        views::by_list(&self.tasks, list_id)
    }

    pub fn archive_view(&self) -> Vec<&Task> {
        views::archive(&self.tasks)
    }

    // -----------------------------------------------------------------------
    // Echo timers
    // -----------------------------------------------------------------------

    /// Apply echo expirations that have arrived. Call once per tick of the
    /// owning event loop.
    pub fn poll_echoes(&mut self) -> Vec<String> {
        self.echo.poll()
    }

    /// Block up to `timeout` for the next echo expiration.
    pub fn wait_for_echoes(&mut self, timeout: Duration) -> Vec<String> {
        self.echo.poll_timeout(timeout)
    }

    /// Stop all echo timers.
    pub fn shutdown(&mut self) {
        self.echo.shutdown();
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn list_is_known(&self, id: ListId) -> bool {
        id.is_reserved() || self.list(id).is_some()
    }

    fn ensure_list(&self, id: ListId) -> Result<(), EngineError> {
        if self.list_is_known(id) {
            Ok(())
        } else {
            Err(EngineError::NotFound(format!("list {}", id)))
        }
    }
}

/// The next Active instance of a recurring task.
fn successor_of(task: &Task, date: chrono::NaiveDate) -> Task {
    let mut next = Task::draft(task.text.clone(), task.list_id);
    next.deadline = task.deadline.as_ref().map(|d| Deadline {
        date,
        time: d.time,
        recurring: d.recurring,
    });
    next.description = task.description.clone();
    next.image = task.image.clone();
    next.milestone_id = task.milestone_id.clone();
    next.parent_id = task.parent_id.clone();
    next.kind = task.kind;
    next
}

fn validate_text(text: &str) -> Result<(), EngineError> {
    if text.trim().is_empty() {
        Err(EngineError::Validation("task text is empty".into()))
    } else {
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        Err(EngineError::Validation("list name is empty".into()))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
