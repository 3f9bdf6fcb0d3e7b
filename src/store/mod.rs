pub mod kv;
pub mod lock;
pub mod prefs;
pub mod tasks;

use std::path::Path;

use crate::error::Result;
use kv::FileKv;
use tasks::TaskStore;

/// Open the file-backed task store for a data directory.
pub fn open(data_dir: &Path) -> Result<TaskStore<FileKv>> {
    TaskStore::load(FileKv::open(data_dir)?)
}
