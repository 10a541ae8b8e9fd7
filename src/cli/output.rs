use chrono::NaiveDateTime;
use serde::Serialize;

use crate::model::list::List;
use crate::model::task::{Task, TaskKind};
use crate::ops::overdue::is_task_missed;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub list_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring: Option<String>,
    pub missed: bool,
    pub kind: TaskKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct ListJson {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub is_shared: bool,
    pub open: usize,
}

#[derive(Serialize)]
pub struct CompletionJson {
    pub action: &'static str,
    pub task: TaskJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<TaskJson>,
}

pub fn task_to_json(task: &Task, now: NaiveDateTime) -> TaskJson {
    let deadline = task.deadline.as_ref();
    TaskJson {
        id: task.id.clone(),
        text: task.text.clone(),
        completed: task.completed,
        list_id: task.list_id.0,
        due: deadline.map(|d| d.date.format("%Y-%m-%d").to_string()),
        time: deadline.and_then(|d| d.time).map(|t| t.format("%H:%M").to_string()),
        recurring: deadline
            .and_then(|d| d.recurrence())
            .map(|r| r.to_string()),
        missed: is_task_missed(task, now),
        kind: task.kind,
        description: task.description.clone(),
    }
}

pub fn list_to_json(list: &List, open: usize) -> ListJson {
    ListJson {
        id: list.id.0,
        name: list.name.clone(),
        color: list.color.clone(),
        is_shared: list.is_shared,
        open,
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// One task per line: `[ ] t-4  Pay rent  due 2024-02-29 (monthly)`
pub fn format_task_line(task: &Task, now: NaiveDateTime) -> String {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let mut line = format!("{} {}  {}", check, task.id, task.text);
    if task.kind == TaskKind::Reminder {
        line.push_str("  (reminder)");
    }
    if let Some(deadline) = &task.deadline {
        line.push_str(&format!("  due {}", deadline));
    }
    if is_task_missed(task, now) {
        line.push_str("  MISSED");
    }
    line
}

pub fn format_list_line(list: &List, open: usize) -> String {
    let mut line = format!("{:>4}  {}  ({} open)", list.id.0, list.name, open);
    if list.is_shared {
        line.push_str("  shared");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::deadline::{Deadline, Recurrence};
    use crate::model::list::ListId;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn task_line_shows_deadline_and_missed() {
        let mut task = Task::draft("Pay rent", ListId::UNSORTED).with_deadline(
            Deadline::on(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
                .repeating(Recurrence::Monthly),
        );
        task.id = "t-4".into();
        assert_eq!(
            format_task_line(&task, now()),
            "[ ] t-4  Pay rent  due 2024-03-01 (monthly)  MISSED"
        );
        task.completed = true;
        assert_eq!(
            format_task_line(&task, now()),
            "[x] t-4  Pay rent  due 2024-03-01 (monthly)"
        );
    }

    #[test]
    fn json_omits_absent_deadline_fields() {
        let mut task = Task::draft("Someday", ListId(2));
        task.id = "t-1".into();
        let json = serde_json::to_value(task_to_json(&task, now())).unwrap();
        assert_eq!(json["list_id"], 2);
        assert_eq!(json["missed"], false);
        assert!(json.get("due").is_none());
        assert_eq!(json["kind"], "task");
    }
}
