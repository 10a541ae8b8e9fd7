use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// How a task repeats once an instance is completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    /// Monday through Friday; Friday rolls to Monday
    Weekday,
    Monthly,
    None,
}

impl Recurrence {
    pub fn as_str(self) -> &'static str {
        match self {
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Weekday => "weekday",
            Recurrence::Monthly => "monthly",
            Recurrence::None => "none",
        }
    }

    /// `none` is stored for compatibility but never spawns a successor.
    pub fn is_recurring(self) -> bool {
        !matches!(self, Recurrence::None)
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = DeadlineParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "weekday" | "weekdays" => Ok(Recurrence::Weekday),
            "monthly" => Ok(Recurrence::Monthly),
            "none" | "" => Ok(Recurrence::None),
            _ => Err(DeadlineParseError::Recurrence(s.to_string())),
        }
    }
}

/// Error type for parsing deadline components from user input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeadlineParseError {
    #[error("invalid date: {0} (expected YYYY-MM-DD)")]
    Date(String),
    #[error("invalid time of day: {0} (expected HH:MM)")]
    Time(String),
    #[error("unknown recurrence policy: {0} (expected daily, weekly, weekday, monthly or none)")]
    Recurrence(String),
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, DeadlineParseError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| DeadlineParseError::Date(s.to_string()))
}

/// Parse an `HH:MM` time of day. An empty string means "no time".
pub fn parse_time(s: &str) -> Result<Option<NaiveTime>, DeadlineParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(s, "%H:%M")
        .map(Some)
        .map_err(|_| DeadlineParseError::Time(s.to_string()))
}

/// A due date in local wall-clock time, with an optional time of day and
/// an optional recurrence policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    pub date: NaiveDate,
    /// `None` means the deadline spans the whole day
    #[serde(default, with = "time_of_day", skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<Recurrence>,
}

impl Deadline {
    /// A date-only, non-recurring deadline
    pub fn on(date: NaiveDate) -> Self {
        Deadline {
            date,
            time: None,
            recurring: None,
        }
    }

    pub fn at(mut self, time: NaiveTime) -> Self {
        self.time = Some(time);
        self
    }

    pub fn repeating(mut self, policy: Recurrence) -> Self {
        self.recurring = Some(policy);
        self
    }

    /// The effective recurrence policy; `none` collapses to `None`.
    pub fn recurrence(&self) -> Option<Recurrence> {
        self.recurring.filter(|r| r.is_recurring())
    }

    /// The instant this deadline passes. Date-only deadlines run until
    /// 23:59:59.999 of their day.
    pub fn due_at(&self) -> NaiveDateTime {
        match self.time {
            Some(time) => self.date.and_time(time),
            None => self
                .date
                .and_hms_milli_opt(23, 59, 59, 999)
                .unwrap_or_else(|| self.date.and_time(NaiveTime::MIN)),
        }
    }

    pub fn is_on(&self, day: NaiveDate) -> bool {
        self.date == day
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))?;
        if let Some(time) = self.time {
            write!(f, " {}", time.format("%H:%M"))?;
        }
        if let Some(policy) = self.recurrence() {
            write!(f, " ({})", policy)?;
        }
        Ok(())
    }
}

/// Serializes the time of day as `HH:MM`; an empty string reads back as `None`.
mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.serialize_str(&t.format("%H:%M").to_string()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(s) => super::parse_time(&s).map_err(serde::de::Error::custom),
        }
    }
}
