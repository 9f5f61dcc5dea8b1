use std::collections::HashSet;

use serde::Serialize;

use crate::cache::HashStore;
use crate::export::ArchiveFormat;
use crate::raster::RasterMetrics;

/// SHA-256 digests of stock placeholder images skipped by default.
pub const DEFAULT_IGNORED_HASHES: [&str; 3] = [
    "1fcf4c601de84ae1d66e36f93b83b33b453f77aeb345be830f1fc66439fdb50d",
    "933f630f9a34dd68d5047813ec3272b8b3634011e5ed90be50dfd765a1303263",
    "ff1e53b8a020868ad267555daf1091ddafdb103a6364a87275bbf34a78ba7c84",
];

/// Filtering and output settings for extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Minimum image size in bytes; 0 disables.
    pub min_size: usize,
    /// Minimum width in pixels, applied when the width is known; 0 disables.
    pub min_width: u32,
    /// Minimum height in pixels, applied when the height is known; 0 disables.
    pub min_height: u32,
    /// Ceiling on `max(w/h, h/w)`, applied when both dimensions are known; 0 disables.
    pub max_aspect_ratio: f64,
    pub ignored_hashes: HashSet<String>,
    /// Skip images already extracted from the same book.
    pub deduplicate: bool,
    /// EPUB: follow `<img>` tags instead of taking every raster entry.
    pub use_html_refs: bool,
    /// Decide everything but write nothing.
    pub dry_run: bool,
    pub write_manifest: bool,
    /// Package each output directory after writing it.
    pub archive: Option<ArchiveFormat>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            min_size: 0,
            min_width: 0,
            min_height: 0,
            max_aspect_ratio: 0.0,
            ignored_hashes: DEFAULT_IGNORED_HASHES.iter().map(|h| h.to_string()).collect(),
            deduplicate: true,
            use_html_refs: true,
            dry_run: false,
            write_manifest: false,
            archive: None,
        }
    }
}

impl ExtractOptions {
    pub fn with_min_size(mut self, bytes: usize) -> Self {
        self.min_size = bytes;
        self
    }

    pub fn with_min_dimensions(mut self, width: u32, height: u32) -> Self {
        self.min_width = width;
        self.min_height = height;
        self
    }

    pub fn with_max_aspect_ratio(mut self, ratio: f64) -> Self {
        self.max_aspect_ratio = ratio;
        self
    }

    /// Replace the ignore list. Hashes are matched case-insensitively.
    pub fn with_ignored_hashes<I, S>(mut self, hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_hashes = hashes
            .into_iter()
            .map(|hash| hash.into().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn with_deduplicate(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    pub fn with_html_refs(mut self, use_html_refs: bool) -> Self {
        self.use_html_refs = use_html_refs;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_manifest(mut self, write_manifest: bool) -> Self {
        self.write_manifest = write_manifest;
        self
    }

    pub fn with_archive(mut self, archive: Option<ArchiveFormat>) -> Self {
        self.archive = archive;
        self
    }

    /// Hashes are compared in lowercase hex.
    pub fn add_ignored_hash(&mut self, hash: &str) {
        self.ignored_hashes.insert(hash.to_ascii_lowercase());
    }

    pub fn remove_ignored_hash(&mut self, hash: &str) -> bool {
        self.ignored_hashes.remove(&hash.to_ascii_lowercase())
    }
}

/// Why an image was not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    TooSmall,
    TooNarrow,
    TooShort,
    ExtremeAspectRatio,
    #[serde(rename = "duplicate_cache")]
    CachedDuplicate,
    IgnoredHash,
    Duplicate,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::TooSmall => "too_small",
            SkipReason::TooNarrow => "too_narrow",
            SkipReason::TooShort => "too_short",
            SkipReason::ExtremeAspectRatio => "extreme_aspect_ratio",
            SkipReason::CachedDuplicate => "duplicate_cache",
            SkipReason::IgnoredHash => "ignored_hash",
            SkipReason::Duplicate => "duplicate",
        }
    }
}

/// Hashes accepted so far in one book.
///
/// Each book gets its own instance; nothing here is shared between books.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    seen: HashSet<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.seen.contains(hash)
    }

    pub fn record(&mut self, hash: &str) {
        self.seen.insert(hash.to_string());
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn reset(&mut self) {
        self.seen.clear();
    }
}

/// First rule that rejects an image, checked in a fixed order: size, width, height,
/// aspect ratio, persistent cache, ignore list, then earlier images of this book.
pub fn should_skip(
    options: &ExtractOptions,
    hash: &str,
    metrics: &RasterMetrics,
    state: &RunState,
    cache: Option<&dyn HashStore>,
) -> Option<SkipReason> {
    if options.min_size > 0 && metrics.size_bytes < options.min_size {
        return Some(SkipReason::TooSmall);
    }
    if options.min_width > 0 && metrics.width > 0 && metrics.width < options.min_width {
        return Some(SkipReason::TooNarrow);
    }
    if options.min_height > 0 && metrics.height > 0 && metrics.height < options.min_height {
        return Some(SkipReason::TooShort);
    }
    if options.max_aspect_ratio > 0.0 && metrics.has_dimensions() {
        let ratio = metrics.aspect_ratio();
        if ratio.max(1.0 / ratio) > options.max_aspect_ratio {
            return Some(SkipReason::ExtremeAspectRatio);
        }
    }
    if cache.is_some_and(|cache| cache.contains(hash)) {
        return Some(SkipReason::CachedDuplicate);
    }
    if options.ignored_hashes.contains(hash) {
        return Some(SkipReason::IgnoredHash);
    }
    if options.deduplicate && state.contains(hash) {
        return Some(SkipReason::Duplicate);
    }
    None
}
