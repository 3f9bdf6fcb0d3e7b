use std::path::Path;

use crate::error::Result;
use crate::output::{self, Format};
use crate::store;

pub fn run(data_dir: &Path, format: Format) -> Result<()> {
    let store = store::open(data_dir)?;
    output::print_counts(store.counts(), format)
}
