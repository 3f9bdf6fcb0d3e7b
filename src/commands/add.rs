use std::path::Path;

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{NewTask, Priority};
use crate::output::{self, Format};
use crate::store;
use crate::view::today_local;

pub fn run(
    data_dir: &Path,
    text: String,
    category: Option<String>,
    priority: Option<Priority>,
    due_date: Option<NaiveDate>,
    notes: Option<String>,
    format: Format,
) -> Result<()> {
    let mut store = store::open(data_dir)?;
    let created = store.create(NewTask {
        text,
        category,
        priority,
        due_date,
        notes,
    })?;

    if let Some(task) = created {
        output::print_task(&task, format, today_local())?;
    }
    Ok(())
}
