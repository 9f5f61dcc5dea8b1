use std::io::Cursor;

use tracing::{debug, warn};

use super::archive::{Archive, ZipEntries};
use super::images::{raster_entries, resolve_image_references};
use super::opf::resolve_document_order;
use crate::book::{ImageReference, SourceRef};
use crate::container::{BookFormat, ContainerDecoder, DecodedBook, Resolution};
use crate::error::{Error, Result};

/// Decoder for EPUB 2 and 3 containers.
#[derive(Debug, Clone)]
pub struct EpubDecoder {
    use_html_refs: bool,
}

impl Default for EpubDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EpubDecoder {
    pub fn new() -> Self {
        Self {
            use_html_refs: true,
        }
    }

    /// Follow `<img>` tags (the default) or take every raster entry in archive order.
    pub fn with_html_refs(mut self, use_html_refs: bool) -> Self {
        self.use_html_refs = use_html_refs;
        self
    }

    /// Decode from any [`Archive`], which lets callers supply their own entry source.
    pub fn decode_archive(&self, archive: &mut impl Archive) -> Result<DecodedBook> {
        let order = resolve_document_order(archive);
        if order.opf_path.is_none() && order.documents.is_empty() {
            return Err(Error::InvalidFormat(
                "ZIP archive has no OPF package and no HTML documents".into(),
            ));
        }

        let mut missing = Vec::new();
        let mut paths = Vec::new();
        if self.use_html_refs {
            let refs = resolve_image_references(archive, &order.documents);
            paths = refs.found;
            missing = refs.missing;
        }
        let listing_fallback = paths.is_empty();
        if listing_fallback {
            paths = raster_entries(archive);
            debug!(
                images = paths.len(),
                "no <img> references, using raster entries in archive order"
            );
        }

        let cover_path = order.cover_path();
        let mut metadata = order
            .package
            .as_ref()
            .map(|package| package.metadata.clone())
            .unwrap_or_default();

        let mut images = Vec::with_capacity(paths.len());
        for path in paths {
            match archive.read_entry(&path) {
                Ok(data) => {
                    let is_cover = cover_path.as_deref() == Some(path.as_str());
                    if is_cover {
                        metadata.cover_image = Some(data.clone());
                    }
                    let order = images.len();
                    images.push(
                        ImageReference::new(data, SourceRef::Entry(path), order)
                            .with_cover(is_cover),
                    );
                }
                Err(err) => {
                    warn!(%path, %err, "failed to read image entry");
                    missing.push(path);
                }
            }
        }

        if metadata.cover_image.is_none()
            && let Some(path) = cover_path.as_deref()
            && archive.contains(path)
        {
            metadata.cover_image = archive.read_entry(path).ok();
        }

        Ok(DecodedBook {
            format: BookFormat::Epub,
            metadata,
            images,
            missing,
            resolution: Resolution::Epub {
                documents: order.documents.len(),
                listing_fallback,
            },
        })
    }
}

impl ContainerDecoder for EpubDecoder {
    fn format(&self) -> BookFormat {
        BookFormat::Epub
    }

    fn decode(&self, data: &[u8]) -> Result<DecodedBook> {
        if !data.starts_with(b"PK\x03\x04") {
            return Err(Error::InvalidFormat("missing ZIP signature".into()));
        }
        let mut archive = ZipEntries::new(Cursor::new(data))?;
        self.decode_archive(&mut archive)
    }
}
