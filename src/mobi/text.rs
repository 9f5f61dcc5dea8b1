//! Book text reconstruction from the text records.

use std::ops::Range;

use tracing::warn;

use super::headers::{Compression, ContainerHeader};
use super::palmdoc;
use crate::raster::is_image_data;

/// Size of one trailing entry, stored as a backward-readable varint in the last
/// four bytes: a set high bit marks the first byte of the number.
fn trailing_entry_size(data: &[u8]) -> usize {
    let tail = &data[data.len().saturating_sub(4)..];
    let mut size = 0usize;
    for &byte in tail {
        if byte & 0x80 != 0 {
            size = 0;
        }
        size = (size << 7) | (byte & 0x7F) as usize;
    }
    size
}

/// Remove the trailing entries announced by the extra-data flags.
///
/// Bits 1.. each announce one sized entry; bit 0 announces the multibyte overlap
/// entry, whose length sits in the low two bits of its last byte.
pub fn strip_trailing_entries(record: &[u8], flags: u16) -> &[u8] {
    let mut end = record.len();

    let mut bits = flags >> 1;
    while bits != 0 && end > 0 {
        if bits & 1 != 0 {
            let size = trailing_entry_size(&record[..end]);
            if size == 0 || size > end {
                break;
            }
            end -= size;
        }
        bits >>= 1;
    }

    if flags & 1 != 0 && end > 0 {
        let overlap = (record[end - 1] & 0x3) as usize + 1;
        end = end.saturating_sub(overlap);
    }

    &record[..end]
}

/// Record indices holding book text.
///
/// The PalmDoc header's record count wins when positive; otherwise the text runs up to
/// the first record that sniffs as an image.
pub fn text_record_span(records: &[&[u8]], header: &ContainerHeader) -> Range<usize> {
    if records.len() <= 1 {
        return 1..1;
    }
    if header.text_record_count > 0 {
        let end = (header.text_record_count as usize + 1).min(records.len());
        return 1..end;
    }
    let end = records
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, record)| is_image_data(record))
        .map_or(records.len(), |(index, _)| index);
    1..end
}

/// Decompress and concatenate the text records.
///
/// HUFF/CDIC and unknown compression modes yield no text.
pub fn extract_text(records: &[&[u8]], header: &ContainerHeader) -> Vec<u8> {
    let span = text_record_span(records, header);
    let mut text = Vec::with_capacity(header.text_length as usize);

    for record in &records[span] {
        let body = strip_trailing_entries(record, header.extra_data_flags);
        match header.compression {
            Compression::None => text.extend_from_slice(body),
            Compression::PalmDoc => text.extend_from_slice(&palmdoc::decompress(body)),
            other => {
                warn!(compression = ?other, "text compression not supported, image order falls back to record order");
                return Vec::new();
            }
        }
    }

    if header.text_length > 0 && text.len() > header.text_length as usize {
        text.truncate(header.text_length as usize);
    }
    text
}
