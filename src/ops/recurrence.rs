use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

use crate::model::deadline::Recurrence;

/// Date of the occurrence that follows `date` under `policy`.
///
/// Returns `None` for `Recurrence::None` and when the result would fall
/// outside chrono's representable calendar.
pub fn next_occurrence(date: NaiveDate, policy: Recurrence) -> Option<NaiveDate> {
    match policy {
        Recurrence::Daily => date.checked_add_days(Days::new(1)),
        Recurrence::Weekly => date.checked_add_days(Days::new(7)),
        // chrono clamps to the last day of a shorter month (Jan 31 -> Feb 28/29)
        Recurrence::Monthly => date.checked_add_months(Months::new(1)),
        Recurrence::Weekday => {
            let next = date.checked_add_days(Days::new(1))?;
            match next.weekday() {
                Weekday::Sat => next.checked_add_days(Days::new(2)),
                Weekday::Sun => next.checked_add_days(Days::new(1)),
                _ => Some(next),
            }
        }
        Recurrence::None => None,
    }
}
