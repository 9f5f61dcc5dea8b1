//! Named-entry access to the ZIP container behind an EPUB.

use std::collections::HashSet;
use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::error::{Error, Result};

/// Random access to the named entries of an archive.
///
/// Entry names are listed in the archive's own order (the ZIP central directory), which
/// is the order every "archive order" fallback relies on.
pub trait Archive {
    /// Entry names, directories excluded.
    fn list_entries(&self) -> &[String];

    /// Read one entry in full.
    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>>;

    fn contains(&self, path: &str) -> bool {
        self.list_entries().iter().any(|name| name == path)
    }
}

/// An [`Archive`] over a ZIP file.
pub struct ZipEntries<R: Read + Seek> {
    archive: ZipArchive<R>,
    names: Vec<String>,
    lookup: HashSet<String>,
}

impl<R: Read + Seek> ZipEntries<R> {
    pub fn new(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)?;
            if !file.is_dir() {
                names.push(file.name().to_string());
            }
        }
        let lookup = names.iter().cloned().collect();

        Ok(Self {
            archive,
            names,
            lookup,
        })
    }
}

impl<R: Read + Seek> Archive for ZipEntries<R> {
    fn list_entries(&self) -> &[String] {
        &self.names
    }

    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        match self.archive.by_name(path) {
            Ok(mut file) => {
                let mut contents = Vec::new();
                file.read_to_end(&mut contents)?;
                return Ok(contents);
            }
            Err(zip::result::ZipError::FileNotFound) => {}
            Err(e) => return Err(e.into()),
        }

        // Some writers store percent-encoded names verbatim
        let decoded = percent_encoding::percent_decode_str(path)
            .decode_utf8()
            .map_err(|_| Error::InvalidFormat(format!("invalid UTF-8 in entry path: {path}")))?;

        let mut file = self.archive.by_name(&decoded)?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        Ok(contents)
    }

    fn contains(&self, path: &str) -> bool {
        self.lookup.contains(path)
    }
}

/// An [`Archive`] held entirely in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    names: Vec<String>,
    entries: Vec<Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, name: impl Into<String>, data: impl AsRef<[u8]>) -> Self {
        self.names.push(name.into());
        self.entries.push(data.as_ref().to_vec());
        self
    }
}

impl Archive for MemoryArchive {
    fn list_entries(&self) -> &[String] {
        &self.names
    }

    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        self.names
            .iter()
            .position(|name| name == path)
            .map(|i| self.entries[i].clone())
            .ok_or(Error::Zip(zip::result::ZipError::FileNotFound))
    }
}
