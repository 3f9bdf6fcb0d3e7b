use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, TaskpadError};
use crate::store::lock;

/// The persistence seam: string values under fixed keys, read whole and
/// overwritten whole.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One file per key inside a data directory.
#[derive(Debug)]
pub struct FileKv {
    root: PathBuf,
}

impl FileKv {
    /// Open (creating if needed) a data directory.
    #[tracing::instrument(skip(root))]
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        debug!(root = %root.display(), "opened data directory");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key_path(&self, key: &str) -> PathBuf {
        match key {
            "tasks" => self.root.join("tasks.json"),
            other => self.root.join(other),
        }
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("store.lock")
    }
}

impl KeyValueStore for FileKv {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            debug!(file = %path.display(), "key not present");
            return Ok(None);
        }
        let data = fs::read_to_string(&path)?;
        debug!(file = %path.display(), bytes = data.len(), "read key");
        Ok(Some(data))
    }

    #[tracing::instrument(skip(self, value))]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key);
        let _guard = lock::acquire_lock(&self.lock_path())?;

        let mut temp = NamedTempFile::new_in(&self.root)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path).map_err(|err| TaskpadError::Io(err.error))?;

        debug!(file = %path.display(), bytes = value.len(), "wrote key");
        Ok(())
    }
}

/// In-process store for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryKv {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("taskpad");
        let kv = FileKv::open(&root).unwrap();
        assert!(kv.root().is_dir());
    }

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempdir().unwrap();
        let kv = FileKv::open(dir.path()).unwrap();
        assert_eq!(kv.get("tasks").unwrap(), None);
    }

    #[test]
    fn set_overwrites_whole_value() {
        let dir = tempdir().unwrap();
        let kv = FileKv::open(dir.path()).unwrap();
        kv.set("tasks", "[1,2,3]").unwrap();
        kv.set("tasks", "[]").unwrap();
        assert_eq!(kv.get("tasks").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("tasks.json").exists());
    }

    #[test]
    fn set_fails_while_lock_is_held_elsewhere() {
        let dir = tempdir().unwrap();
        let kv = FileKv::open(dir.path()).unwrap();
        let _held = lock::acquire_lock(&dir.path().join("store.lock")).unwrap();

        let err = kv.set("theme", "dark").unwrap_err();
        assert!(matches!(err, TaskpadError::Locked(_)));
        assert_eq!(kv.get("theme").unwrap(), None);
    }

    #[test]
    fn memory_kv_round_trips() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("theme").unwrap(), None);
        kv.set("theme", "dark").unwrap();
        assert_eq!(kv.get("theme").unwrap().as_deref(), Some("dark"));
    }
}
