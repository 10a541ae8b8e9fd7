use serde::{Deserialize, Serialize};

use super::deadline::Deadline;
use super::list::ListId;

/// Whether an entry is a regular task or a reminder. Opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Task,
    Reminder,
}

/// A task with its lifecycle fields and pass-through auxiliary data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned id; empty on a draft that has not been created yet
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub list_id: ListId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Deadline>,
    /// List held at the moment the task was archived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_list_id: Option<ListId>,

    // --- Pass-through fields ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub kind: TaskKind,
}

impl Task {
    /// Create an Active task. The id stays empty until the store assigns one.
    pub fn draft(text: impl Into<String>, list_id: ListId) -> Self {
        Task {
            id: String::new(),
            text: text.into(),
            completed: false,
            list_id,
            deadline: None,
            prior_list_id: None,
            description: None,
            image: None,
            milestone_id: None,
            parent_id: None,
            kind: TaskKind::Task,
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Whether the store has assigned this task an id
    pub fn is_saved(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn is_archived(&self) -> bool {
        self.list_id == ListId::ARCHIVE
    }
}

/// Partial update of a task.
///
/// Outer `None` means "not supplied, leave unchanged". For clearable fields,
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub list_id: Option<ListId>,
    pub prior_list_id: Option<Option<ListId>>,
    pub deadline: Option<Option<Deadline>>,
    pub description: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub milestone_id: Option<Option<String>>,
    pub parent_id: Option<Option<String>>,
    pub kind: Option<TaskKind>,
}

impl TaskPatch {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn list(mut self, list_id: ListId) -> Self {
        self.list_id = Some(list_id);
        self
    }

    pub fn deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(Some(deadline));
        self
    }

    pub fn clear_deadline(mut self) -> Self {
        self.deadline = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Apply every supplied field to `task`.
    pub fn apply(&self, task: &mut Task) {
        if let Some(text) = &self.text {
            task.text = text.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(list_id) = self.list_id {
            task.list_id = list_id;
        }
        if let Some(prior) = self.prior_list_id {
            task.prior_list_id = prior;
        }
        if let Some(deadline) = &self.deadline {
            task.deadline = deadline.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(image) = &self.image {
            task.image = image.clone();
        }
        if let Some(milestone) = &self.milestone_id {
            task.milestone_id = milestone.clone();
        }
        if let Some(parent) = &self.parent_id {
            task.parent_id = parent.clone();
        }
        if let Some(kind) = self.kind {
            task.kind = kind;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Task {
        Task::draft("Water plants", ListId(2))
            .with_deadline(Deadline::on(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()))
    }

    #[test]
    fn draft_is_active_and_unsaved() {
        let a = Task::draft("a", ListId::UNSORTED);
        assert!(!a.is_saved());
        assert!(!a.completed);
        assert_eq!(a.prior_list_id, None);
    }

    #[test]
    fn patch_leaves_unsupplied_deadline_alone() {
        let mut task = sample();
        TaskPatch::default().text("Water the plants").apply(&mut task);
        assert_eq!(task.text, "Water the plants");
        assert!(task.deadline.is_some());
    }

    #[test]
    fn patch_can_clear_deadline() {
        let mut task = sample();
        TaskPatch::default().clear_deadline().apply(&mut task);
        assert_eq!(task.deadline, None);
    }

    #[test]
    fn empty_patch() {
        assert!(TaskPatch::default().is_empty());
        assert!(!TaskPatch::default().list(ListId::ARCHIVE).is_empty());
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let task: Task = serde_json::from_str(r#"{"id":"t-1","text":"Call mom"}"#).unwrap();
        assert_eq!(task.list_id, ListId::UNSORTED);
        assert!(!task.completed);
        assert_eq!(task.kind, TaskKind::Task);
        assert_eq!(task.deadline, None);
    }
}
