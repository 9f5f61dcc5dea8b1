//! Container format detection and the decoder capability shared by EPUB and MOBI.

use serde::Serialize;

use crate::book::{BookMetadata, ImageReference};
use crate::epub::EpubDecoder;
use crate::error::{Error, Result};
use crate::mobi::{IndexStrategy, MobiDecoder, StrategyScores, is_pdb_book};

/// Supported ebook containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    Epub,
    Mobi,
}

impl BookFormat {
    /// Guess the format from a file extension (`epub`, `mobi`, `azw`, `azw3`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "epub" => Some(BookFormat::Epub),
            "mobi" | "azw" | "azw3" => Some(BookFormat::Mobi),
            _ => None,
        }
    }
}

/// Identify the container from its signature bytes.
pub fn detect_format(data: &[u8]) -> Option<BookFormat> {
    if data.starts_with(b"PK\x03\x04") {
        Some(BookFormat::Epub)
    } else if is_pdb_book(data) {
        Some(BookFormat::Mobi)
    } else {
        None
    }
}

/// How the reading order of a book was decided, for logging and manifests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum Resolution {
    Mobi {
        references: usize,
        strategy: Option<IndexStrategy>,
        scores: StrategyScores,
        first_image: usize,
    },
    Epub {
        documents: usize,
        /// Images came from the archive listing rather than `<img>` tags.
        listing_fallback: bool,
    },
}

/// Output of one decode pass: ordered images and what else the container told us.
#[derive(Debug, Clone)]
pub struct DecodedBook {
    pub format: BookFormat,
    pub metadata: BookMetadata,
    /// Candidate images in reading order, unique by source.
    pub images: Vec<ImageReference>,
    /// References that point at entries the container does not have.
    pub missing: Vec<String>,
    pub resolution: Resolution,
}

/// Something that can turn a container's bytes into ordered image references.
pub trait ContainerDecoder: Send + Sync {
    fn format(&self) -> BookFormat;

    fn decode(&self, data: &[u8]) -> Result<DecodedBook>;
}

/// Pick a decoder with default settings by sniffing `data`.
pub fn decoder_for(data: &[u8]) -> Result<Box<dyn ContainerDecoder>> {
    match detect_format(data) {
        Some(BookFormat::Epub) => Ok(Box::new(EpubDecoder::new())),
        Some(BookFormat::Mobi) => Ok(Box::new(MobiDecoder::new())),
        None => Err(Error::InvalidFormat(
            "neither a ZIP (EPUB) nor a PDB (MOBI/AZW) signature".into(),
        )),
    }
}
