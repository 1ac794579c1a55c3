use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use super::{StoreError, StringStore};

/// A store persisted as a single JSON object in a file, for hosts that have a
/// filesystem instead of a browser storage API.
///
/// Every mutation writes the whole map back through to disk, so the file is
/// as current as the last successful operation. I/O and decode failures are
/// reported as `Disabled`: a store whose file cannot be read or written is a
/// store this session cannot use.
pub struct FileStore {
    path : PathBuf,
    entries : RefCell<HashMap<String, String>>
}

impl FileStore {
    /// Open the store persisted at `path`. A missing file starts the store
    /// empty; an unreadable or undecodable file does too, since the cache
    /// layer above treats lost data as normal.
    pub fn open<P : Into<PathBuf>>(path : P) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<HashMap<String, String>>(&text) {
                Ok(map) => map,
                Err(err) => {
                    warn!("store file {:?} is undecodable ({}); starting empty", path, err);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new()
        };
        FileStore {
            path,
            entries : RefCell::new(entries)
        }
    }

    fn save(&self) -> Result<(), StoreError> {
        let text = serde_json::to_string(&*self.entries.borrow())
            .map_err(|_| StoreError::Disabled)?;
        fs::write(&self.path, text).map_err(|_| StoreError::Disabled)
    }
}

impl StringStore for FileStore {
    fn get(&self, key : &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key : &str, value : &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        self.save()
    }

    fn remove(&self, key : &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        self.save()
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries.borrow_mut().clear();
        self.save()
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    #[allow(unused_imports)]
    use super::*;

    #[allow(unused_imports)]
    use spectral::prelude::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    static SCRATCH_COUNTER : AtomicU32 = AtomicU32::new(0);

    fn scratch_path(test : &str) -> PathBuf {
        let serial = SCRATCH_COUNTER.fetch_add(1, Ordering::SeqCst);
        let mut path = std::env::temp_dir();
        path.push(format!("stash-filestore-{}-{}-{}.json", std::process::id(), test, serial));
        path
    }

    #[test]
    fn values_survive_reopening() {
        let path = scratch_path("reopen");
        {
            let store = FileStore::open(&path);
            store.set("alpha", "one").unwrap();
            store.set("beta", "two").unwrap();
            store.remove("beta").unwrap();
        }
        let reopened = FileStore::open(&path);
        asserting("alpha survived").that(&reopened.get("alpha").unwrap()).is_equal_to(Some("one".to_string()));
        asserting("beta was removed").that(&reopened.get("beta").unwrap()).is_equal_to(None);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let path = scratch_path("corrupt");
        fs::write(&path, "this is not json").unwrap();
        let store = FileStore::open(&path);
        asserting("no keys").that(&store.keys().unwrap().len()).is_equal_to(0);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn clear_empties_the_file() {
        let path = scratch_path("clear");
        {
            let store = FileStore::open(&path);
            store.set("alpha", "one").unwrap();
            store.clear().unwrap();
        }
        let reopened = FileStore::open(&path);
        asserting("nothing survived clear").that(&reopened.keys().unwrap().len()).is_equal_to(0);
        let _ = fs::remove_file(&path);
    }
}
