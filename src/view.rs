//! Derivation of the visible task list: filter, then search, then sort.

use std::cmp::Ordering;

use chrono::{Local, NaiveDate};
use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed};
use tracing::warn;

use crate::model::{FilterMode, SortMode, Task};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub filter: FilterMode,
    pub search: String,
    pub sort: SortMode,
}

impl ViewQuery {
    pub fn new(filter: FilterMode, search: impl Into<String>, sort: SortMode) -> Self {
        Self {
            filter,
            search: search.into(),
            sort,
        }
    }
}

/// Current local calendar date.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// Ordered visible subset of `tasks` for `query`. Pure; `today` is only
/// consulted by the `today` filter.
pub fn visible<'a>(tasks: &'a [Task], query: &ViewQuery, today: NaiveDate) -> Vec<&'a Task> {
    let needle = query.search.trim().to_lowercase();

    let mut out: Vec<&Task> = tasks
        .iter()
        .filter(|task| passes_filter(task, query.filter, today))
        .filter(|task| needle.is_empty() || task.matches_search(&needle))
        .collect();

    let order = TextOrder::new();
    out.sort_by(|a, b| compare(a, b, query.sort, &order));
    out
}

pub fn passes_filter(task: &Task, filter: FilterMode, today: NaiveDate) -> bool {
    match filter {
        FilterMode::All => true,
        FilterMode::Pending => !task.completed,
        FilterMode::Completed => task.completed,
        FilterMode::Today => task.is_due_on(today),
    }
}

pub fn compare(a: &Task, b: &Task, sort: SortMode, order: &TextOrder) -> Ordering {
    match sort {
        SortMode::CreatedDesc => b.created_millis().cmp(&a.created_millis()),
        SortMode::CreatedAsc => a.created_millis().cmp(&b.created_millis()),
        SortMode::AlphaAsc => order.compare(&a.text, &b.text),
        SortMode::AlphaDesc => order.compare(&b.text, &a.text),
        SortMode::DueAsc => match (a.due_date, b.due_date) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => x.cmp(&y),
        },
    }
}

/// Locale-aware text ordering for the alphabetical sorts, using the root
/// collation. Ties fall back to the raw text.
pub struct TextOrder {
    collator: Option<CollatorBorrowed<'static>>,
}

impl TextOrder {
    pub fn new() -> Self {
        let collator = match Collator::try_new(Default::default(), CollatorOptions::default()) {
            Ok(collator) => Some(collator),
            Err(err) => {
                warn!(error = %err, "collation data unavailable, sorting by case-folded text");
                None
            }
        };
        Self { collator }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let primary = match &self.collator {
            Some(collator) => collator.compare(a, b),
            None => a.to_lowercase().cmp(&b.to_lowercase()),
        };
        primary.then_with(|| a.cmp(b))
    }
}

impl Default for TextOrder {
    fn default() -> Self {
        Self::new()
    }
}
