//! Store interfaces the engine persists through, and the record-keeping
//! shared by the in-process implementations.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::io::lock::LockError;
use crate::model::list::{List, ListId, ListPatch};
use crate::model::task::{Task, TaskPatch};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Transport(String),
    #[error("store rejected request: {0}")]
    Validation(String),
    #[error("not found in store: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode store data: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
}

impl StoreError {
    /// Whether repeating the same call might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Transport(_) | StoreError::Io(_) | StoreError::Lock(LockError::Timeout { .. })
        )
    }
}

/// CRUD over the task collection
pub trait TaskStore {
    fn fetch_tasks(&mut self) -> Result<Vec<Task>, StoreError>;
    /// Persist a new task. The returned task carries the store-assigned id.
    fn create_task(&mut self, task: &Task) -> Result<Task, StoreError>;
    fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError>;
    fn delete_task(&mut self, id: &str) -> Result<(), StoreError>;
}

/// CRUD over the list collection
pub trait ListStore {
    fn fetch_lists(&mut self) -> Result<Vec<List>, StoreError>;
    fn create_list(&mut self, list: &List) -> Result<List, StoreError>;
    fn update_list(&mut self, id: ListId, patch: &ListPatch) -> Result<List, StoreError>;
    fn delete_list(&mut self, id: ListId) -> Result<(), StoreError>;
}

/// Records plus id counters. Serialized as the on-disk document of
/// [`JsonStore`](crate::io::json_store::JsonStore).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub last_task_id: u64,
    #[serde(default)]
    pub last_list_id: i64,
    #[serde(default)]
    pub tasks: IndexMap<String, Task>,
    #[serde(default)]
    pub lists: IndexMap<ListId, List>,
}

impl StoreData {
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    pub fn lists(&self) -> Vec<List> {
        self.lists.values().cloned().collect()
    }

    pub fn create_task(&mut self, task: &Task) -> Result<Task, StoreError> {
        if task.text.trim().is_empty() {
            return Err(StoreError::Validation("task text is empty".into()));
        }
        self.last_task_id += 1;
        let mut stored = task.clone();
        stored.id = format!("t-{}", self.last_task_id);
        self.tasks.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    pub fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError> {
        if patch.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(StoreError::Validation("task text is empty".into()));
        }
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))?;
        patch.apply(task);
        Ok(task.clone())
    }

    pub fn delete_task(&mut self, id: &str) -> Result<(), StoreError> {
        self.tasks
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))
    }

    pub fn create_list(&mut self, list: &List) -> Result<List, StoreError> {
        if list.name.trim().is_empty() {
            return Err(StoreError::Validation("list name is empty".into()));
        }
        self.last_list_id += 1;
        let mut stored = list.clone();
        stored.id = ListId(self.last_list_id);
        self.lists.insert(stored.id, stored.clone());
        Ok(stored)
    }

    pub fn update_list(&mut self, id: ListId, patch: &ListPatch) -> Result<List, StoreError> {
        let list = self
            .lists
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("list {}", id)))?;
        patch.apply(list);
        Ok(list.clone())
    }

    pub fn delete_list(&mut self, id: ListId) -> Result<(), StoreError> {
        self.lists
            .shift_remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("list {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_sequential_ids_and_keeps_order() {
        let mut data = StoreData::default();
        let a = data.create_task(&Task::draft("a", ListId::UNSORTED)).unwrap();
        let b = data.create_task(&Task::draft("b", ListId::UNSORTED)).unwrap();
        assert!(a.is_saved());
        assert_eq!(a.id, "t-1");
        assert_eq!(b.id, "t-2");
        data.delete_task("t-1").unwrap();
        let c = data.create_task(&Task::draft("c", ListId::UNSORTED)).unwrap();
        assert_eq!(c.id, "t-3");
        let ids: Vec<String> = data.tasks().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["t-2", "t-3"]);
    }

    #[test]
    fn missing_records_are_not_found() {
        let mut data = StoreData::default();
        assert!(matches!(
            data.update_task("t-9", &TaskPatch::default()),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(data.delete_list(ListId(4)), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn rejects_empty_text() {
        let mut data = StoreData::default();
        assert!(matches!(
            data.create_task(&Task::draft("  ", ListId::UNSORTED)),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn transient_classification() {
        assert!(StoreError::Transport("timeout".into()).is_transient());
        assert!(!StoreError::Validation("bad".into()).is_transient());
        assert!(!StoreError::NotFound("t-1".into()).is_transient());
    }
}
