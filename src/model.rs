use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_CATEGORY: &str = "Other";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => f.pad("high"),
            Self::Medium => f.pad("medium"),
            Self::Low => f.pad("low"),
        }
    }
}

/// A single to-do item. Serialized with the camelCase keys the browser
/// version of the app wrote, so its exports load unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(
        default,
        deserialize_with = "deserialize_due_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Legacy records store "no deadline" as an empty string.
fn deserialize_due_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl Task {
    /// Creation timestamp in epoch milliseconds, 0 when the record predates the field.
    pub fn created_millis(&self) -> i64 {
        self.created_at.map_or(0, |ts| ts.timestamp_millis())
    }

    /// Creation time for display. Legacy records without one show "now"; the
    /// stored record is left untouched.
    pub fn display_created_at(&self) -> DateTime<Utc> {
        self.created_at.unwrap_or_else(Utc::now)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < today)
    }

    pub fn is_due_on(&self, day: NaiveDate) -> bool {
        self.due_date == Some(day)
    }

    pub fn matches_search(&self, needle_lower: &str) -> bool {
        self.text.to_lowercase().contains(needle_lower)
            || self.notes.to_lowercase().contains(needle_lower)
    }
}

/// Input for `TaskStore::create`. Only `text` is required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub text: String,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// A two-step edit. `None` at either step means the user backed out of that
/// step; `Some("")` for the title means they submitted an empty title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditRequest {
    pub title: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Applied(Task),
    Cancelled,
    Rejected,
    NotFound,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl Counts {
    pub fn of(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total: tasks.len(),
            completed,
            pending: tasks.len() - completed,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum FilterMode {
    #[default]
    All,
    Pending,
    Completed,
    Today,
}

impl FilterMode {
    pub const ALL: [Self; 4] = [Self::All, Self::Pending, Self::Completed, Self::Today];

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.pad("all"),
            Self::Pending => f.pad("pending"),
            Self::Completed => f.pad("completed"),
            Self::Today => f.pad("today"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum SortMode {
    #[default]
    CreatedDesc,
    CreatedAsc,
    AlphaAsc,
    AlphaDesc,
    DueAsc,
}

impl SortMode {
    pub const ALL: [Self; 5] = [
        Self::CreatedDesc,
        Self::CreatedAsc,
        Self::AlphaAsc,
        Self::AlphaDesc,
        Self::DueAsc,
    ];

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreatedDesc => f.pad("created-desc"),
            Self::CreatedAsc => f.pad("created-asc"),
            Self::AlphaAsc => f.pad("alpha-asc"),
            Self::AlphaDesc => f.pad("alpha-desc"),
            Self::DueAsc => f.pad("due-asc"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Unknown values fall back to light.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim() {
            "dark" => Self::Dark,
            _ => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}
