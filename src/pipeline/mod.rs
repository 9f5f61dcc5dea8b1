//! Per-book extraction: decode, order, classify, filter, then emit.
//!
//! A book is processed sequentially, image by image, because duplicate detection
//! depends on the images that came before it in the same book. Accepted images are
//! held in a [`BookExtraction`] and written in one pass by [`BookExtraction::commit`],
//! so a book that fails to decode leaves nothing behind.

pub mod batch;
mod filter;
mod sink;
mod stats;

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub use batch::{BookJob, BookOutcome, BookReport, extract_batch};
pub use filter::{DEFAULT_IGNORED_HASHES, ExtractOptions, RunState, SkipReason, should_skip};
pub use sink::{DirectorySink, MemorySink, OutputSink};
pub use stats::ExtractionStats;

use crate::book::{BookMetadata, ImageReference, ImageRole, SourceRef};
use crate::cache::HashStore;
use crate::container::{
    BookFormat, ContainerDecoder, DecodedBook, Resolution, detect_format,
};
use crate::epub::EpubDecoder;
use crate::error::{Error, Result};
use crate::mobi::MobiDecoder;
use crate::raster::{RasterMetrics, classify, detect};

/// Lowercase hex SHA-256 of `data`.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Output filename for the `index`-th accepted image.
pub fn image_filename(index: usize, role: ImageRole, extension: &str) -> String {
    format!("{index:04}_{role}{extension}")
}

/// An accepted image, ready to be written.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    /// 0-based position among the accepted images of the book.
    pub index: usize,
    pub filename: String,
    pub source: SourceRef,
    pub hash: String,
    pub role: ImageRole,
    pub metrics: RasterMetrics,
    pub data: Vec<u8>,
}

/// Everything decided about one book, before anything is written.
#[derive(Debug, Clone)]
pub struct BookExtraction {
    pub format: BookFormat,
    pub metadata: BookMetadata,
    pub images: Vec<ExtractedImage>,
    pub stats: ExtractionStats,
    /// Sources that were referenced but absent or unreadable.
    pub missing: Vec<String>,
    pub resolution: Resolution,
}

impl BookExtraction {
    /// Replace the contents of `dir` with every accepted image. A book with no
    /// accepted images still clears whatever an earlier run left there.
    pub fn commit(&self, sink: &dyn OutputSink, dir: &Path) -> Result<()> {
        sink.prepare(dir)?;
        for image in &self.images {
            sink.write(dir, &image.filename, &image.data)?;
        }
        debug!(dir = %dir.display(), images = self.images.len(), "committed book");
        Ok(())
    }
}

/// Runs the per-book state machine with one set of options.
#[derive(Clone)]
pub struct ExtractionPipeline {
    options: ExtractOptions,
    cache: Option<Arc<dyn HashStore>>,
}

impl ExtractionPipeline {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            cache: None,
        }
    }

    /// Check and record accepted hashes in a persistent store.
    pub fn with_cache(mut self, cache: Arc<dyn HashStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    pub fn cache(&self) -> Option<&dyn HashStore> {
        self.cache.as_deref()
    }

    /// The decoder for `data`, configured from the options.
    pub fn decoder_for(&self, data: &[u8]) -> Result<Box<dyn ContainerDecoder>> {
        match detect_format(data) {
            Some(BookFormat::Epub) => Ok(Box::new(
                EpubDecoder::new().with_html_refs(self.options.use_html_refs),
            )),
            Some(BookFormat::Mobi) => Ok(Box::new(MobiDecoder::new())),
            None => Err(Error::InvalidFormat(
                "neither a ZIP (EPUB) nor a PDB (MOBI/AZW) signature".into(),
            )),
        }
    }

    /// Decode a book and filter its images.
    ///
    /// `state` holds the hashes accepted so far and should be fresh for each book.
    pub fn extract(&self, data: &[u8], state: &mut RunState) -> Result<BookExtraction> {
        let decoder = self.decoder_for(data)?;
        let decoded = decoder.decode(data)?;
        Ok(self.extract_decoded(decoded, state))
    }

    /// Filter the images of an already decoded book.
    pub fn extract_decoded(&self, decoded: DecodedBook, state: &mut RunState) -> BookExtraction {
        let DecodedBook {
            format,
            metadata,
            images,
            mut missing,
            resolution,
        } = decoded;

        let mut stats = ExtractionStats {
            missing: missing.len(),
            ..Default::default()
        };
        let mut accepted = Vec::new();

        for image in images {
            let source = image.source.clone();
            match self.process_image(image, accepted.len(), state) {
                Ok(Ok(extracted)) => {
                    stats.saved += 1;
                    accepted.push(extracted);
                }
                Ok(Err(reason)) => {
                    debug!(%source, reason = reason.as_str(), "skipped image");
                    stats.record_skip(reason);
                }
                Err(err) => {
                    warn!(%source, %err, "image extraction failed");
                    stats.missing += 1;
                    missing.push(source.to_string());
                }
            }
        }

        info!(
            format = ?format,
            title = %metadata.title,
            saved = stats.saved,
            skipped = stats.skipped(),
            missing = stats.missing,
            "extracted book"
        );

        BookExtraction {
            format,
            metadata,
            images: accepted,
            stats,
            missing,
            resolution,
        }
    }

    /// Sniff, classify and filter one image. The outer error is a failure to process
    /// the image at all; the inner one is a deliberate skip.
    fn process_image(
        &self,
        image: ImageReference,
        index: usize,
        state: &mut RunState,
    ) -> Result<std::result::Result<ExtractedImage, SkipReason>> {
        if image.data.is_empty() {
            return Err(Error::Extraction {
                source_ref: image.source.to_string(),
                reason: "empty image data".into(),
            });
        }

        let metrics = detect(&image.data);
        let hash = content_hash(&image.data);

        if let Some(reason) = should_skip(&self.options, &hash, &metrics, state, self.cache())
        {
            return Ok(Err(reason));
        }

        state.record(&hash);
        if let Some(cache) = self.cache() {
            cache.insert(&hash);
        }

        let role = classify(&metrics, image.is_cover);
        Ok(Ok(ExtractedImage {
            index,
            filename: image_filename(index, role, metrics.extension),
            source: image.source,
            hash,
            role,
            metrics,
            data: image.data,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::HashCache;

    fn png(width: u32, height: u32, padding: usize) -> Vec<u8> {
        let mut data = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR".to_vec();
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        data.resize(data.len() + padding, 0);
        data
    }

    fn decoded(images: Vec<Vec<u8>>) -> DecodedBook {
        DecodedBook {
            format: BookFormat::Epub,
            metadata: BookMetadata::new("Test"),
            images: images
                .into_iter()
                .enumerate()
                .map(|(i, data)| {
                    ImageReference::new(data, SourceRef::Entry(format!("img/{i}.png")), i)
                })
                .collect(),
            missing: Vec::new(),
            resolution: Resolution::Epub {
                documents: 1,
                listing_fallback: false,
            },
        }
    }

    #[test]
    fn test_content_hash_is_lowercase_sha256() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_filenames_and_roles() {
        let pipeline = ExtractionPipeline::new(ExtractOptions::default());
        let mut book = decoded(vec![png(600, 800, 5000), png(100, 100, 5000)]);
        book.images[0].is_cover = true;

        let extraction = pipeline.extract_decoded(book, &mut RunState::new());
        let names: Vec<&str> = extraction.images.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["0000_cover.png", "0001_thumbnail.png"]);
        assert_eq!(extraction.stats.saved, 2);
    }

    #[test]
    fn test_duplicates_within_book_are_skipped() {
        let pipeline = ExtractionPipeline::new(ExtractOptions::default());
        let page = png(600, 800, 5000);
        let extraction =
            pipeline.extract_decoded(decoded(vec![page.clone(), page]), &mut RunState::new());
        assert_eq!(extraction.stats.saved, 1);
        assert_eq!(extraction.stats.duplicates, 1);
    }

    #[test]
    fn test_empty_image_counts_as_missing() {
        let pipeline = ExtractionPipeline::new(ExtractOptions::default());
        let extraction = pipeline.extract_decoded(
            decoded(vec![Vec::new(), png(600, 800, 5000)]),
            &mut RunState::new(),
        );
        assert_eq!(extraction.stats.missing, 1);
        assert_eq!(extraction.stats.saved, 1);
        assert_eq!(extraction.missing, vec!["img/0.png"]);
        assert_eq!(extraction.images[0].filename, "0000_page.png");
    }

    #[test]
    fn test_accepted_hashes_reach_cache_as_pending() {
        let cache = Arc::new(HashCache::new());
        let pipeline =
            ExtractionPipeline::new(ExtractOptions::default()).with_cache(cache.clone());
        pipeline.extract_decoded(decoded(vec![png(600, 800, 5000)]), &mut RunState::new());
        assert_eq!(cache.pending_len(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_commit_of_empty_book_clears_directory() {
        let pipeline = ExtractionPipeline::new(ExtractOptions::default().with_min_size(1 << 20));
        let extraction =
            pipeline.extract_decoded(decoded(vec![png(600, 800, 10)]), &mut RunState::new());
        let sink = MemorySink::new();
        sink.write(Path::new("out"), "0000_page.png", b"old").unwrap();
        sink.write(Path::new("other"), "0000_page.png", b"kept").unwrap();

        extraction.commit(&sink, Path::new("out")).unwrap();
        assert_eq!(sink.paths(), vec![Path::new("other").join("0000_page.png")]);
        assert_eq!(extraction.stats.filtered_by_size, 1);
    }
}
