use std::path::Path;

use crate::error::{Result, TaskpadError};
use crate::output::{self, Format};
use crate::store;
use crate::view::today_local;

pub fn run(data_dir: &Path, id: u64, format: Format) -> Result<()> {
    let store = store::open(data_dir)?;
    let task = store.get(id).ok_or(TaskpadError::TaskNotFound(id))?;
    output::print_task(task, format, today_local())
}
