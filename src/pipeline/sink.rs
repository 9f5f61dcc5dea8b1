use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::Result;

/// Destination for extracted files. Shared by the batch workers.
pub trait OutputSink: Send + Sync {
    /// Make `dir` ready to receive a book's files.
    fn prepare(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }

    /// Write one whole file.
    fn write(&self, dir: &Path, filename: &str, bytes: &[u8]) -> Result<()>;
}

/// Writes into directories on the local filesystem.
///
/// `prepare` removes whatever the directory held before.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectorySink;

impl OutputSink for DirectorySink {
    fn prepare(&self, dir: &Path) -> Result<()> {
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::create_dir_all(dir)?;
        debug!(dir = %dir.display(), "prepared output directory");
        Ok(())
    }

    fn write(&self, dir: &Path, filename: &str, bytes: &[u8]) -> Result<()> {
        std::fs::write(dir.join(filename), bytes)?;
        Ok(())
    }
}

/// Collects files in memory, in write order.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<(PathBuf, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as `(dir/filename, bytes)`.
    pub fn files(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }
}

impl OutputSink for MemorySink {
    fn prepare(&self, dir: &Path) -> Result<()> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(path, _)| !path.starts_with(dir));
        Ok(())
    }

    fn write(&self, dir: &Path, filename: &str, bytes: &[u8]) -> Result<()> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((dir.join(filename), bytes.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_sink_cleans_previous_output() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("book");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("stale.jpg"), b"old").unwrap();

        DirectorySink.prepare(&dir).unwrap();
        DirectorySink.write(&dir, "0000_page.jpg", b"new").unwrap();

        assert!(!dir.join("stale.jpg").exists());
        assert_eq!(std::fs::read(dir.join("0000_page.jpg")).unwrap(), b"new");
    }

    #[test]
    fn test_memory_sink_prepare_replaces_directory() {
        let sink = MemorySink::new();
        sink.write(Path::new("a"), "1.jpg", b"x").unwrap();
        sink.write(Path::new("b"), "1.jpg", b"y").unwrap();
        sink.prepare(Path::new("a")).unwrap();
        assert_eq!(sink.paths(), vec![PathBuf::from("b/1.jpg")]);
    }
}
