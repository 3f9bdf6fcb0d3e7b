use std::path::Path;

use crate::error::Result;
use crate::model::{EditOutcome, EditRequest};
use crate::output::{self, Format};
use crate::store;
use crate::view::today_local;

/// Apply an edit. Leaving out `--title` keeps the whole task as it is.
pub fn run(
    data_dir: &Path,
    id: u64,
    title: Option<String>,
    notes: Option<String>,
    format: Format,
) -> Result<()> {
    let mut store = store::open(data_dir)?;
    let outcome = store.edit(id, EditRequest { title, notes })?;

    if let EditOutcome::Applied(task) = outcome {
        output::print_task(&task, format, today_local())?;
    }
    Ok(())
}
