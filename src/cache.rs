//! Cross-run record of image hashes that were already extracted.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Membership contract for a persistent hash store shared by concurrent workers.
///
/// `contains` only sees hashes that were present before the current batch;
/// `insert` records into a pending set that becomes visible on `flush`.
pub trait HashStore: Send + Sync {
    fn contains(&self, hash: &str) -> bool;

    fn insert(&self, hash: &str);

    /// Merge pending inserts into the readable set. Returns how many were new.
    fn flush(&self) -> usize {
        0
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    hashes: Vec<String>,
}

/// Hash store backed by a JSON file of the form `{"hashes": [...]}`.
#[derive(Debug, Default)]
pub struct HashCache {
    path: Option<PathBuf>,
    known: RwLock<HashSet<String>>,
    pending: Mutex<HashSet<String>>,
}

impl HashCache {
    /// An in-memory cache with no backing file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache at `path`. A missing file is an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let known = match std::fs::read(&path) {
            Ok(bytes) => {
                let file: CacheFile = serde_json::from_slice(&bytes)?;
                file.hashes.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), hashes = known.len(), "loaded hash cache");

        Ok(Self {
            path: Some(path),
            known: RwLock::new(known),
            pending: Mutex::new(HashSet::new()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of readable hashes.
    pub fn len(&self) -> usize {
        self.known.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of inserts waiting for [`HashStore::flush`].
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Write the readable set, sorted, to the backing file.
    ///
    /// The file is written to a sibling temporary path and renamed into place.
    pub fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let hashes: BTreeSet<String> = self
            .known
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        let file = CacheFile {
            hashes: hashes.into_iter().collect(),
        };
        let json = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;

        debug!(path = %path.display(), hashes = file.hashes.len(), "saved hash cache");
        Ok(())
    }
}

impl HashStore for HashCache {
    fn contains(&self, hash: &str) -> bool {
        self.known
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(hash)
    }

    fn insert(&self, hash: &str) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(hash.to_string());
    }

    fn flush(&self) -> usize {
        let pending = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let mut known = self.known.write().unwrap_or_else(PoisonError::into_inner);
        pending.into_iter().filter(|hash| known.insert(hash.clone())).count()
    }
}
