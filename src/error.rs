//! Error types for pagelift operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while decoding a book or writing its images.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Magic bytes absent or wrong. The file is not a container we can read.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Header or table fields are inconsistent beyond best-effort recovery.
    #[error("Corrupted structure: {0}")]
    CorruptedStructure(String),

    /// A single image could not be read or processed.
    #[error("Failed to extract {source_ref}: {reason}")]
    Extraction { source_ref: String, reason: String },

    /// A book-level failure, tagged with the file it came from.
    #[error("{}: {source}", path.display())]
    Book {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the originating file path to this error.
    pub fn in_book(self, path: impl Into<PathBuf>) -> Self {
        match self {
            already @ Error::Book { .. } => already,
            other => Error::Book {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_error_display_includes_path() {
        let err = Error::InvalidFormat("no PDB signature".into()).in_book("shelf/a.mobi");
        assert_eq!(
            err.to_string(),
            "shelf/a.mobi: Invalid format: no PDB signature"
        );
    }

    #[test]
    fn test_in_book_does_not_nest() {
        let err = Error::CorruptedStructure("x".into())
            .in_book("a.mobi")
            .in_book("b.mobi");
        match err {
            Error::Book { path, .. } => assert_eq!(path, PathBuf::from("a.mobi")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
