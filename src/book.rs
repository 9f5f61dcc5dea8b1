//! Format-agnostic types shared by the container decoders and the pipeline.

use std::fmt;

use serde::Serialize;

/// Where an image came from inside its container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceRef {
    /// Normalized path of a ZIP entry (EPUB).
    Entry(String),
    /// PDB record index (MOBI).
    Record(usize),
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Entry(path) => f.write_str(path),
            SourceRef::Record(index) => write!(f, "record:{index}"),
        }
    }
}

impl Serialize for SourceRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A candidate image in reading order.
#[derive(Debug, Clone)]
pub struct ImageReference {
    pub data: Vec<u8>,
    pub source: SourceRef,
    /// Position at which the image was first referenced.
    pub order: usize,
    pub is_cover: bool,
}

impl ImageReference {
    pub fn new(data: Vec<u8>, source: SourceRef, order: usize) -> Self {
        Self {
            data,
            source,
            order,
            is_cover: false,
        }
    }

    pub fn with_cover(mut self, is_cover: bool) -> Self {
        self.is_cover = is_cover;
        self
    }
}

/// Role of an image, used in output filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    Cover,
    Thumbnail,
    Decoration,
    Page,
}

impl ImageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageRole::Cover => "cover",
            ImageRole::Thumbnail => "thumbnail",
            ImageRole::Decoration => "decoration",
            ImageRole::Page => "page",
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Book metadata derived from EXTH records or the OPF package document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub language: String,
    /// Bytes of the cover image, when the container names one that exists.
    #[serde(skip)]
    pub cover_image: Option<Vec<u8>>,
}

impl BookMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}
