use std::collections::VecDeque;

use crate::io::store::{ListStore, StoreData, StoreError, TaskStore};
use crate::model::list::{List, ListId, ListPatch};
use crate::model::task::{Task, TaskPatch};

/// In-process store. Failures can be queued to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: StoreData,
    failures: VecDeque<Option<StoreError>>,
    calls: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: StoreData) -> Self {
        MemoryStore {
            data,
            ..Default::default()
        }
    }

    /// Make the next store call fail with `err`. Queued failures are
    /// consumed in order, one per call.
    pub fn fail_next(&mut self, err: StoreError) {
        self.failures.push_back(Some(err));
    }

    /// Let `skip` calls through, then fail the one after with `err`.
    pub fn fail_after(&mut self, skip: usize, err: StoreError) {
        self.failures.extend((0..skip).map(|_| None));
        self.failures.push_back(Some(err));
    }

    /// Total calls received, including failed ones
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    fn enter(&mut self) -> Result<(), StoreError> {
        self.calls += 1;
        match self.failures.pop_front().flatten() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl TaskStore for MemoryStore {
    fn fetch_tasks(&mut self) -> Result<Vec<Task>, StoreError> {
        self.enter()?;
        Ok(self.data.tasks())
    }

    fn create_task(&mut self, task: &Task) -> Result<Task, StoreError> {
        self.enter()?;
        self.data.create_task(task)
    }

    fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError> {
        self.enter()?;
        self.data.update_task(id, patch)
    }

    fn delete_task(&mut self, id: &str) -> Result<(), StoreError> {
        self.enter()?;
        self.data.delete_task(id)
    }
}

impl ListStore for MemoryStore {
    fn fetch_lists(&mut self) -> Result<Vec<List>, StoreError> {
        self.enter()?;
        Ok(self.data.lists())
    }

    fn create_list(&mut self, list: &List) -> Result<List, StoreError> {
        self.enter()?;
        self.data.create_list(list)
    }

    fn update_list(&mut self, id: ListId, patch: &ListPatch) -> Result<List, StoreError> {
        self.enter()?;
        self.data.update_list(id, patch)
    }

    fn delete_list(&mut self, id: ListId) -> Result<(), StoreError> {
        self.enter()?;
        self.data.delete_list(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_failure_hits_one_call() {
        let mut store = MemoryStore::new();
        store.fail_next(StoreError::Transport("offline".into()));
        assert!(store.fetch_tasks().is_err());
        assert!(store.fetch_tasks().is_ok());
        assert_eq!(store.calls(), 2);
    }

    #[test]
    fn fail_after_skips_calls() {
        let mut store = MemoryStore::new();
        store.fail_after(1, StoreError::Transport("offline".into()));
        assert!(store.fetch_tasks().is_ok());
        assert!(store.fetch_lists().is_err());
        assert!(store.fetch_lists().is_ok());
    }

    #[test]
    fn failed_create_leaves_no_record() {
        let mut store = MemoryStore::new();
        store.fail_next(StoreError::Transport("offline".into()));
        assert!(store.create_task(&Task::draft("x", ListId::UNSORTED)).is_err());
        assert!(store.fetch_tasks().unwrap().is_empty());
    }
}
