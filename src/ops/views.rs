//! Read-only projections over the task collection.
//!
//! Everything here is recomputed from scratch on each call. Results keep the
//! collection's order unless noted otherwise.

use chrono::{NaiveDate, NaiveDateTime};

use crate::model::list::ListId;
use crate::model::task::Task;
use crate::ops::overdue::is_task_missed;

/// Tasks due today that are still open, plus completed ones still echoing.
pub fn today<'a>(
    tasks: &'a [Task],
    today: NaiveDate,
    is_echoing: impl Fn(&str) -> bool,
) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| t.deadline.as_ref().is_some_and(|d| d.is_on(today)))
        .filter(|t| !t.completed || is_echoing(&t.id))
        .collect()
}

/// Open tasks whose deadline has passed, oldest due first.
pub fn missed(tasks: &[Task], now: NaiveDateTime) -> Vec<&Task> {
    let mut out: Vec<&Task> = tasks.iter().filter(|t| is_task_missed(t, now)).collect();
    out.sort_by_key(|t| t.deadline.as_ref().map(|d| d.due_at()));
    out
}

/// Every task assigned to `list_id`, completed or not.
pub fn by_list(tasks: &[Task], list_id: ListId) -> Vec<&Task> {
    tasks.iter().filter(|t| t.list_id == list_id).collect()
}

/// Every task that is neither completed nor archived.
pub fn open(tasks: &[Task]) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| !t.completed && !t.is_archived())
        .collect()
}

/// The completed-archive bucket.
pub fn archive(tasks: &[Task]) -> Vec<&Task> {
    by_list(tasks, ListId::ARCHIVE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::deadline::Deadline;
    use chrono::NaiveTime;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn task(id: &str, list: ListId, due: Option<Deadline>, completed: bool) -> Task {
        let mut t = Task::draft(id, list);
        t.id = id.to_string();
        t.deadline = due;
        t.completed = completed;
        t
    }

    fn sample() -> Vec<Task> {
        vec![
            task("a", ListId::UNSORTED, Some(Deadline::on(day(12))), false),
            task("b", ListId::ARCHIVE, Some(Deadline::on(day(12))), true),
            task("c", ListId(3), Some(Deadline::on(day(10))), false),
            task("d", ListId(3), None, false),
            task(
                "e",
                ListId::UNSORTED,
                Some(Deadline::on(day(8)).at(NaiveTime::from_hms_opt(9, 0, 0).unwrap())),
                false,
            ),
            task("f", ListId::ARCHIVE, Some(Deadline::on(day(1))), true),
        ]
    }

    fn ids(tasks: Vec<&Task>) -> Vec<&str> {
        tasks.into_iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn today_hides_completed_unless_echoing() {
        let tasks = sample();
        assert_eq!(ids(today(&tasks, day(12), |_| false)), vec!["a"]);
        assert_eq!(ids(today(&tasks, day(12), |id| id == "b")), vec!["a", "b"]);
    }

    #[test]
    fn today_ignores_echo_for_other_days() {
        let tasks = sample();
        assert_eq!(ids(today(&tasks, day(12), |id| id == "f")), vec!["a"]);
    }

    #[test]
    fn missed_is_open_and_past_oldest_first() {
        let tasks = sample();
        let now = day(12).and_hms_opt(8, 0, 0).unwrap();
        assert_eq!(ids(missed(&tasks, now)), vec!["e", "c"]);
    }

    #[test]
    fn by_list_and_open_and_archive() {
        let tasks = sample();
        assert_eq!(ids(by_list(&tasks, ListId(3))), vec!["c", "d"]);
        assert_eq!(ids(open(&tasks)), vec!["a", "c", "d", "e"]);
        assert_eq!(ids(archive(&tasks)), vec!["b", "f"]);
    }
}
