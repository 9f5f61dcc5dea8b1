//! Package an output directory as a comic book archive.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::Result;

/// Comic archive flavours. Both are written as ZIP files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ArchiveFormat {
    Cbz,
    Cbr,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Cbz => "cbz",
            ArchiveFormat::Cbr => "cbr",
        }
    }
}

/// Path of the archive written for `dir`: a sibling named `<dir>.<ext>`.
pub fn archive_path(dir: &Path, format: ArchiveFormat) -> io::Result<PathBuf> {
    let name = dir.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no directory name", dir.display()),
        )
    })?;
    let mut name = name.to_os_string();
    name.push(".");
    name.push(format.extension());
    Ok(dir.with_file_name(name))
}

/// Zip the regular files of `dir`, sorted by name, into `<dir>.cbz` or `<dir>.cbr`.
///
/// Image data is stored without recompression.
pub fn export_directory(dir: &Path, format: ArchiveFormat) -> Result<PathBuf> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let target = archive_path(dir, format)?;
    let mut zip = ZipWriter::new(BufWriter::new(File::create(&target)?));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for path in &files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        zip.start_file(name, stored)?;
        zip.write_all(&std::fs::read(path)?)?;
    }
    zip.finish()?.flush()?;

    debug!(archive = %target.display(), files = files.len(), "wrote comic archive");
    Ok(target)
}
