use super::{KeyValueStore, MemoryStore};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Memory store mirrored to a JSON file after every write.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Load `path` if it exists, otherwise start empty. A corrupt file is an error.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries: BTreeMap<String, String> = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        log::info!("Loaded {} stored key(s) from {}", entries.len(), path.display());
        Ok(Self {
            path,
            inner: MemoryStore::from_entries(entries),
        })
    }

    /// Write `next` to disk, then make it the live state. On failure the
    /// previous state is kept in memory and on disk.
    fn commit(&mut self, next: MemoryStore) -> io::Result<()> {
        let raw = serde_json::to_string_pretty(next.entries())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        self.inner = next;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: String) -> io::Result<()> {
        let mut next = self.inner.clone();
        next.set(key, value)?;
        self.commit(next)
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        if self.inner.get(key).is_none() {
            return Ok(());
        }
        let mut next = self.inner.clone();
        next.remove(key)?;
        self.commit(next)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.inner.keys_with_prefix(prefix)
    }
}
