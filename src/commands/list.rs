use std::path::Path;

use crate::error::Result;
use crate::model::{FilterMode, SortMode};
use crate::output::{self, Format};
use crate::store;
use crate::view::{self, ViewQuery, today_local};

pub fn run(
    data_dir: &Path,
    filter: FilterMode,
    search: Option<String>,
    sort: SortMode,
    format: Format,
) -> Result<()> {
    let store = store::open(data_dir)?;
    let query = ViewQuery::new(filter, search.unwrap_or_default(), sort);
    let today = today_local();
    let tasks = view::visible(store.tasks(), &query, today);

    output::print_tasks(&tasks, format, today)?;
    if format == Format::Pretty {
        output::print_counts(store.counts(), format)?;
    }
    Ok(())
}
