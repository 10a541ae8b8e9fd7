use chrono::NaiveDateTime;

use crate::model::deadline::Deadline;
use crate::model::task::Task;

/// Whether `deadline` has passed as of `now`.
///
/// A deadline with a time of day is missed once that exact instant is behind
/// `now`. A date-only deadline covers its whole day and is missed only after
/// 23:59:59.999.
pub fn is_missed(deadline: &Deadline, now: NaiveDateTime) -> bool {
    deadline.due_at() < now
}

/// Task-level classification: completed tasks and tasks without a deadline
/// are never missed.
pub fn is_task_missed(task: &Task, now: NaiveDateTime) -> bool {
    match &task.deadline {
        Some(deadline) if !task.completed => is_missed(deadline, now),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::list::ListId;
    use chrono::{NaiveDate, NaiveTime, TimeDelta};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        today().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn date_only_yesterday_is_missed() {
        let d = Deadline::on(today().pred_opt().unwrap());
        assert!(is_missed(&d, at(0, 0, 0)));
    }

    #[test]
    fn date_only_today_is_not_missed_until_day_ends() {
        let d = Deadline::on(today());
        assert!(!is_missed(&d, at(9, 0, 0)));
        assert!(!is_missed(&d, at(23, 59, 59)));
        let last_ms = today().and_hms_milli_opt(23, 59, 59, 999).unwrap();
        assert!(!is_missed(&d, last_ms));
        assert!(is_missed(&d, last_ms + TimeDelta::milliseconds(1)));
    }

    #[test]
    fn timed_deadline_is_missed_just_after_its_instant() {
        let d = Deadline::on(today()).at(NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        assert!(!is_missed(&d, at(23, 59, 0)));
        assert!(is_missed(
            &d,
            at(23, 59, 0) + TimeDelta::milliseconds(1)
        ));
    }

    #[test]
    fn completed_tasks_are_never_missed() {
        let mut task = Task::draft("Old", ListId::UNSORTED)
            .with_deadline(Deadline::on(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()));
        assert!(is_task_missed(&task, at(12, 0, 0)));
        task.completed = true;
        assert!(!is_task_missed(&task, at(12, 0, 0)));
    }

    #[test]
    fn tasks_without_deadline_are_never_missed() {
        let task = Task::draft("Someday", ListId::UNSORTED);
        assert!(!is_task_missed(&task, at(12, 0, 0)));
    }
}
