//! `manifest.json`: what was extracted from a book and where it went.

use std::path::Path;

use serde::Serialize;

use crate::book::{ImageRole, SourceRef};
use crate::container::{BookFormat, Resolution};
use crate::error::Result;
use crate::pipeline::{BookExtraction, ExtractionStats};
use crate::util::time_now_secs;

pub const MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub source_file: String,
    /// Seconds since the Unix epoch.
    pub extracted_at: u64,
    pub format: BookFormat,
    pub title: &'a str,
    pub author: &'a str,
    pub publisher: &'a str,
    pub language: &'a str,
    pub total_images: usize,
    pub output_dir: String,
    pub stats: ExtractionStats,
    pub debug_order: DebugOrder<'a>,
    pub images: Vec<ManifestImage<'a>>,
}

/// How the reading order was reached, for diagnosing misordered books.
#[derive(Debug, Serialize)]
pub struct DebugOrder<'a> {
    #[serde(flatten)]
    pub resolution: &'a Resolution,
    pub missing: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct ManifestImage<'a> {
    pub index: usize,
    pub filename: &'a str,
    pub source_ref: &'a SourceRef,
    pub image_hash: &'a str,
    pub bytes_size: usize,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub classification: ImageRole,
    pub mime_type: &'a str,
}

impl<'a> Manifest<'a> {
    pub fn new(extraction: &'a BookExtraction, source_file: &Path, output_dir: &Path) -> Self {
        let images = extraction
            .images
            .iter()
            .map(|image| ManifestImage {
                index: image.index,
                filename: &image.filename,
                source_ref: &image.source,
                image_hash: &image.hash,
                bytes_size: image.metrics.size_bytes,
                width: (image.metrics.width > 0).then_some(image.metrics.width),
                height: (image.metrics.height > 0).then_some(image.metrics.height),
                classification: image.role,
                mime_type: image.metrics.mime_type,
            })
            .collect();

        Self {
            source_file: source_file.display().to_string(),
            extracted_at: time_now_secs(),
            format: extraction.format,
            title: &extraction.metadata.title,
            author: &extraction.metadata.author,
            publisher: &extraction.metadata.publisher,
            language: &extraction.metadata.language,
            total_images: extraction.images.len(),
            output_dir: output_dir.display().to_string(),
            stats: extraction.stats,
            debug_order: DebugOrder {
                resolution: &extraction.resolution,
                missing: &extraction.missing,
            },
            images,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{BookMetadata, ImageReference};
    use crate::container::DecodedBook;
    use crate::pipeline::{ExtractOptions, ExtractionPipeline, RunState};

    #[test]
    fn test_manifest_fields() {
        let mut gif = b"GIF89a".to_vec();
        gif.extend_from_slice(&[0x20, 0x03, 0x58, 0x02]);
        gif.resize(6000, 0);

        let decoded = DecodedBook {
            format: BookFormat::Mobi,
            metadata: BookMetadata::new("Atlas").with_author("A. Writer"),
            images: vec![ImageReference::new(gif, SourceRef::Record(12), 0)],
            missing: vec!["record:40".to_string()],
            resolution: Resolution::Epub {
                documents: 2,
                listing_fallback: false,
            },
        };
        let extraction = ExtractionPipeline::new(ExtractOptions::default())
            .extract_decoded(decoded, &mut RunState::new());

        let manifest = Manifest::new(&extraction, Path::new("in/atlas.mobi"), Path::new("in/atlas"));
        let value: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();

        assert_eq!(value["title"], "Atlas");
        assert_eq!(value["author"], "A. Writer");
        assert_eq!(value["format"], "mobi");
        assert_eq!(value["total_images"], 1);
        assert_eq!(value["debug_order"]["documents"], 2);
        assert_eq!(value["debug_order"]["missing"][0], "record:40");

        let image = &value["images"][0];
        assert_eq!(image["filename"], "0000_page.gif");
        assert_eq!(image["source_ref"], "record:12");
        assert_eq!(image["width"], 800);
        assert_eq!(image["height"], 600);
        assert_eq!(image["classification"], "page");
        assert_eq!(image["mime_type"], "image/gif");
        assert_eq!(image["bytes_size"], 6000);
        assert_eq!(image["image_hash"].as_str().unwrap().len(), 64);
    }
}
