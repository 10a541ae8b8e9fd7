use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a list. Two values are reserved and never name a stored list.
///
/// The default, `ListId(0)`, is [`ListId::UNSORTED`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(pub i64);

impl ListId {
    /// The default "unsorted / today" bucket
    pub const UNSORTED: ListId = ListId(0);
    /// Where completed tasks are archived
    pub const ARCHIVE: ListId = ListId(-1);

    pub fn is_reserved(self) -> bool {
        self == ListId::UNSORTED || self == ListId::ARCHIVE
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ListId::UNSORTED => f.write_str("unsorted"),
            ListId::ARCHIVE => f.write_str("archive"),
            ListId(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for ListId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "unsorted" | "today" => Ok(ListId::UNSORTED),
            "archive" | "completed" => Ok(ListId::ARCHIVE),
            other => other.parse::<i64>().map(ListId),
        }
    }
}

/// A user-defined list (folder) of tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub is_shared: bool,
}

impl List {
    /// A list not yet persisted; the store assigns the real id.
    pub fn draft(name: impl Into<String>) -> Self {
        List {
            id: ListId::UNSORTED,
            name: name.into(),
            color: String::new(),
            is_shared: false,
        }
    }
}

/// Partial update of a list; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub is_shared: Option<bool>,
}

impl ListPatch {
    pub fn apply(&self, list: &mut List) {
        if let Some(name) = &self.name {
            list.name = name.clone();
        }
        if let Some(color) = &self.color {
            list.color = color.clone();
        }
        if let Some(shared) = self.is_shared {
            list.is_shared = shared;
        }
    }
}
