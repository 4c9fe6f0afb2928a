// src/dedup/store.rs
//! Persistence for the seen set: load-all at run start, save-all at run end.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::types::EntryIdentity;

const SEEN_FORMAT_VERSION: u32 = 1;

fn current_version() -> u32 {
    SEEN_FORMAT_VERSION
}

/// Identities already presented to the user. Only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenSet {
    #[serde(default = "current_version")]
    version: u32,
    #[serde(default)]
    seen: BTreeSet<EntryIdentity>,
}

impl Default for SeenSet {
    fn default() -> Self {
        Self {
            version: SEEN_FORMAT_VERSION,
            seen: BTreeSet::new(),
        }
    }
}

impl SeenSet {
    pub fn from_identities<I: IntoIterator<Item = EntryIdentity>>(ids: I) -> Self {
        Self {
            version: SEEN_FORMAT_VERSION,
            seen: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, id: &EntryIdentity) -> bool {
        self.seen.contains(id)
    }

    pub(crate) fn insert(&mut self, id: EntryIdentity) -> bool {
        self.seen.insert(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntryIdentity> {
        self.seen.iter()
    }
}

pub trait SeenStore: Send + Sync {
    fn load_all(&self) -> Result<SeenSet, PersistenceError>;
    fn save_all(&self, set: &SeenSet) -> Result<(), PersistenceError>;
    /// For log lines.
    fn describe(&self) -> String;
}

/// JSON file on disk. A missing file is an empty set.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SeenStore for JsonFileStore {
    fn load_all(&self) -> Result<SeenSet, PersistenceError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SeenSet::default()),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if data.trim().is_empty() {
            return Ok(SeenSet::default());
        }
        let set: SeenSet = serde_json::from_str(&data).map_err(|e| PersistenceError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        if set.version > SEEN_FORMAT_VERSION {
            return Err(PersistenceError::Corrupt {
                path: self.path.clone(),
                reason: format!("unsupported format version {}", set.version),
            });
        }
        Ok(set)
    }

    fn save_all(&self, set: &SeenSet) -> Result<(), PersistenceError> {
        let write_err = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(set)
            .map_err(|e| write_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp).map_err(write_err)?;
        f.write_all(json.as_bytes()).map_err(write_err)?;
        f.sync_all().map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process store, handy for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<SeenSet>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seen(set: SeenSet) -> Self {
        Self {
            inner: Mutex::new(set),
            saves: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> SeenSet {
        self.inner.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl SeenStore for MemoryStore {
    fn load_all(&self) -> Result<SeenSet, PersistenceError> {
        Ok(self.snapshot())
    }

    fn save_all(&self, set: &SeenSet) -> Result<(), PersistenceError> {
        *self.inner.lock() = set.clone();
        *self.saves.lock() += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
