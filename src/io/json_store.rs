use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::io::lock::StoreLock;
use crate::io::store::{ListStore, StoreData, StoreError, TaskStore};
use crate::model::list::{List, ListId, ListPatch};
use crate::model::task::{Task, TaskPatch};

/// File name of the store document inside the data directory
pub const STORE_FILE: &str = "store.json";

/// Store backed by a single JSON document on disk.
///
/// Every mutation is a locked read-modify-write, so the file is always the
/// source of truth and several `tl` processes can share it.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        JsonStore { dir: dir.into() }
    }

    /// Create the directory and an empty document if none exists yet.
    pub fn init(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = JsonStore::open(dir);
        fs::create_dir_all(&store.dir)?;
        if !store.path().exists() {
            store.save(&StoreData::default())?;
        }
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    fn load(&self) -> Result<StoreData, StoreError> {
        let path = self.path();
        if !path.exists() {
            return Ok(StoreData::default());
        }
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&self, data: &StoreData) -> Result<(), StoreError> {
        let mut text = serde_json::to_string_pretty(data)?;
        text.push('\n');
        atomic_write(&self.path(), text.as_bytes())?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> Result<T, StoreError> {
        let _lock = StoreLock::acquire_default(&self.dir)?;
        let data = self.load()?;
        Ok(f(&data))
    }

    fn modify<T>(
        &self,
        f: impl FnOnce(&mut StoreData) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _lock = StoreLock::acquire_default(&self.dir)?;
        let mut data = self.load()?;
        let out = f(&mut data)?;
        self.save(&data)?;
        Ok(out)
    }
}

/// Write `content` to `path` atomically using a temp file + rename.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl TaskStore for JsonStore {
    fn fetch_tasks(&mut self) -> Result<Vec<Task>, StoreError> {
        self.read(StoreData::tasks)
    }

    fn create_task(&mut self, task: &Task) -> Result<Task, StoreError> {
        self.modify(|data| data.create_task(task))
    }

    fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError> {
        self.modify(|data| data.update_task(id, patch))
    }

    fn delete_task(&mut self, id: &str) -> Result<(), StoreError> {
        self.modify(|data| data.delete_task(id))
    }
}

impl ListStore for JsonStore {
    fn fetch_lists(&mut self) -> Result<Vec<List>, StoreError> {
        self.read(StoreData::lists)
    }

    fn create_list(&mut self, list: &List) -> Result<List, StoreError> {
        self.modify(|data| data.create_list(list))
    }

    fn update_list(&mut self, id: ListId, patch: &ListPatch) -> Result<List, StoreError> {
        self.modify(|data| data.update_list(id, patch))
    }

    fn delete_list(&mut self, id: ListId) -> Result<(), StoreError> {
        self.modify(|data| data.delete_list(id))
    }
}
