use std::path::Path;

use crate::error::Result;
use crate::output::{self, Format};
use crate::store;
use crate::view::today_local;

pub fn run(data_dir: &Path, id: u64, format: Format) -> Result<()> {
    let mut store = store::open(data_dir)?;
    if let Some(task) = store.delete(id)? {
        output::print_task(&task, format, today_local())?;
    }
    Ok(())
}
