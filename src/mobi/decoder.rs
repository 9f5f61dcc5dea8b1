use tracing::{debug, info, warn};

use super::headers::{ContainerHeader, MetadataFields, parse_exth};
use super::order::{detect_image_records, resolve_order};
use super::pdb::{database_name, is_pdb_book, parse_record_table};
use super::references::extract_references;
use super::text::extract_text;
use crate::book::{BookMetadata, ImageReference, SourceRef};
use crate::container::{BookFormat, ContainerDecoder, DecodedBook, Resolution};
use crate::error::{Error, Result};
use crate::util::decode_text;

/// Decoder for MOBI, AZW and AZW3 (PDB) containers.
#[derive(Debug, Clone, Default)]
pub struct MobiDecoder;

impl MobiDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl ContainerDecoder for MobiDecoder {
    fn format(&self) -> BookFormat {
        BookFormat::Mobi
    }

    fn decode(&self, data: &[u8]) -> Result<DecodedBook> {
        if !is_pdb_book(data) {
            return Err(Error::InvalidFormat(
                "missing BOOKMOBI/TEXtREAd PDB signature".into(),
            ));
        }

        let table = parse_record_table(data);
        if table.is_empty() {
            return Err(Error::CorruptedStructure(
                "PDB record table is empty or inconsistent".into(),
            ));
        }
        let records: Vec<&[u8]> = table.iter().map(|record| record.slice(data)).collect();
        debug!(records = records.len(), "parsed PDB record table");

        let header = ContainerHeader::parse(records[0])?;
        let fields = read_exth(records[0], &header);

        let detected = detect_image_records(&records);
        let first_image = match header.first_image() {
            Some(index) if index < records.len() => index,
            _ => detected.keys().next().copied().unwrap_or(records.len()),
        };

        let text = extract_text(&records, &header);
        let references = extract_references(&decode_text(&text, Some(header.encoding.label())));
        let resolution = resolve_order(&records, &references, first_image);

        match resolution.strategy {
            Some(strategy) => info!(
                ?strategy,
                absolute = resolution.scores.absolute,
                relative_zero = resolution.scores.relative_zero,
                relative_one = resolution.scores.relative_one,
                references = references.len(),
                first_image,
                "resolved MOBI image order"
            ),
            None => debug!(first_image, "no image references, using record order"),
        }

        let cover_index = fields
            .cover_offset
            .and_then(|offset| first_image.checked_add(offset as usize))
            .filter(|index| detected.contains_key(index));

        let metadata = BookMetadata {
            title: book_title(&fields, &header, data),
            author: fields.authors.join(", "),
            publisher: fields.publisher.clone().unwrap_or_default(),
            language: fields.language.clone().unwrap_or_default(),
            cover_image: cover_index.map(|index| records[index].to_vec()),
        };

        let images = resolution
            .images
            .iter()
            .enumerate()
            .map(|(order, &(index, bytes))| {
                ImageReference::new(bytes.to_vec(), SourceRef::Record(index), order)
                    .with_cover(Some(index) == cover_index)
            })
            .collect();

        Ok(DecodedBook {
            format: BookFormat::Mobi,
            metadata,
            images,
            missing: Vec::new(),
            resolution: Resolution::Mobi {
                references: references.len(),
                strategy: resolution.strategy,
                scores: resolution.scores,
                first_image,
            },
        })
    }
}

/// EXTH title, then the full name from record 0, then the PDB database name.
fn book_title(fields: &MetadataFields, header: &ContainerHeader, data: &[u8]) -> String {
    [fields.title.as_deref(), Some(header.title.as_str())]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|title| !title.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| database_name(data))
}

/// EXTH metadata, or nothing when absent or unreadable.
fn read_exth(record0: &[u8], header: &ContainerHeader) -> MetadataFields {
    if !header.has_exth() {
        return MetadataFields::default();
    }
    let Some(block) = record0.get(header.exth_offset()..) else {
        warn!(offset = header.exth_offset(), "EXTH offset past end of record 0");
        return MetadataFields::default();
    };
    match parse_exth(block, header.encoding) {
        Ok(records) => MetadataFields::from_records(&records),
        Err(err) => {
            warn!(%err, "skipping unreadable EXTH block");
            MetadataFields::default()
        }
    }
}
