//! PalmDoc, MOBI and EXTH headers of record 0.

use tracing::warn;

use crate::error::{Error, Result};
use crate::util::decode_text;

pub const NULL_INDEX: u32 = 0xFFFFFFFF;

/// Offset of the MOBI block within record 0 (past the PalmDoc header).
pub const MOBI_OFFSET: usize = 16;

const EXTH_FLAG: u32 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    PalmDoc,
    Huffman,
    Unknown(u16),
}

impl Compression {
    fn from_raw(value: u16) -> Self {
        match value {
            1 => Compression::None,
            2 => Compression::PalmDoc,
            0x4448 => Compression::Huffman, // "DH"
            n => Compression::Unknown(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Cp1252,
    Utf8,
    Unknown(u32),
}

impl Encoding {
    /// Label understood by `encoding_rs`.
    pub fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Cp1252 | Encoding::Unknown(_) => "windows-1252",
        }
    }
}

/// Decoded fields of record 0.
#[derive(Debug, Clone)]
pub struct ContainerHeader {
    pub compression: Compression,
    /// Uncompressed length of the book text.
    pub text_length: u32,
    pub text_record_count: u16,
    pub text_record_size: u16,
    pub encryption: u16,
    /// Whether the `MOBI` magic was present at offset 16.
    pub has_mobi: bool,
    pub header_length: u32,
    pub mobi_type: u32,
    pub encoding: Encoding,
    pub first_image_index: u32,
    pub full_name_offset: u32,
    pub full_name_length: u32,
    pub exth_flags: u32,
    pub extra_data_flags: u16,
    /// Full title from the span above, empty when the span is out of range.
    pub title: String,
}

fn be_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn be_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

impl ContainerHeader {
    /// Parse record 0. Only the 16-byte PalmDoc header is mandatory; MOBI fields are
    /// read when the `MOBI` magic is present and the field lies inside the record.
    pub fn parse(record0: &[u8]) -> Result<Self> {
        if record0.len() < MOBI_OFFSET {
            return Err(Error::CorruptedStructure(format!(
                "record 0 is {} bytes, PalmDoc header needs {MOBI_OFFSET}",
                record0.len()
            )));
        }

        let mut header = ContainerHeader {
            compression: Compression::from_raw(be_u16(record0, 0)),
            text_length: be_u32(record0, 4),
            text_record_count: be_u16(record0, 8),
            text_record_size: be_u16(record0, 10),
            encryption: be_u16(record0, 12),
            has_mobi: false,
            header_length: 0,
            mobi_type: 0,
            encoding: Encoding::Cp1252,
            first_image_index: NULL_INDEX,
            full_name_offset: 0,
            full_name_length: 0,
            exth_flags: 0,
            extra_data_flags: 0,
            title: String::new(),
        };

        if record0.len() < MOBI_OFFSET + 16 || &record0[16..20] != b"MOBI" {
            return Ok(header);
        }

        header.has_mobi = true;
        header.header_length = be_u32(record0, 20);
        header.mobi_type = be_u32(record0, 24);
        header.encoding = match be_u32(record0, 28) {
            1252 => Encoding::Cp1252,
            65001 => Encoding::Utf8,
            n => Encoding::Unknown(n),
        };

        let has = |end: usize| record0.len() >= end;

        if has(0x5C) {
            header.full_name_offset = be_u32(record0, 0x54);
            header.full_name_length = be_u32(record0, 0x58);
            let start = header.full_name_offset as usize;
            let end = start.saturating_add(header.full_name_length as usize);
            if end <= record0.len() {
                header.title = decode_text(&record0[start..end], Some(header.encoding.label()))
                    .trim()
                    .to_string();
            }
        }

        if has(0x70) {
            header.first_image_index = be_u32(record0, 0x6C);
        }

        if has(0x84) {
            header.exth_flags = be_u32(record0, 0x80);
        }

        if has(0xF4) && header.header_length >= 0xE4 {
            header.extra_data_flags = be_u16(record0, 0xF2);
        }

        Ok(header)
    }

    pub fn has_exth(&self) -> bool {
        self.has_mobi && self.exth_flags & EXTH_FLAG != 0
    }

    /// Offset of the EXTH block within record 0.
    pub fn exth_offset(&self) -> usize {
        MOBI_OFFSET + self.header_length as usize
    }

    /// First image record, or `None` when the header leaves it unset.
    pub fn first_image(&self) -> Option<usize> {
        (self.first_image_index != NULL_INDEX).then_some(self.first_image_index as usize)
    }
}

/// One EXTH entry. Only the fields this crate uses are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExthRecord {
    Author(String),
    Publisher(String),
    Title(String),
    Language(String),
    /// Cover image, as an offset from the first image record.
    CoverOffset(u32),
    ThumbnailOffset(u32),
    /// A type we do not decode; kept only so callers can count it.
    Ignored(u32),
}

impl ExthRecord {
    fn decode(record_type: u32, content: &[u8], encoding: Encoding) -> Self {
        let text = || {
            decode_text(content, Some(encoding.label()))
                .trim()
                .to_string()
        };
        let offset = || {
            (content.len() >= 4)
                .then(|| be_u32(content, 0))
                .filter(|&value| value != NULL_INDEX)
        };

        match record_type {
            100 => ExthRecord::Author(text()),
            101 => ExthRecord::Publisher(text()),
            503 => ExthRecord::Title(text()),
            524 => ExthRecord::Language(text()),
            201 => offset().map_or(ExthRecord::Ignored(201), ExthRecord::CoverOffset),
            202 => offset().map_or(ExthRecord::Ignored(202), ExthRecord::ThumbnailOffset),
            other => ExthRecord::Ignored(other),
        }
    }
}

/// Parse an EXTH block: magic, header length, entry count, then `(type, length, value)`
/// entries where `length` includes its own 8-byte prefix.
///
/// A truncated block or an entry whose declared length is impossible ends parsing at
/// that entry; everything decoded before it is kept.
pub fn parse_exth(data: &[u8], encoding: Encoding) -> Result<Vec<ExthRecord>> {
    if data.len() < 12 {
        return Err(Error::CorruptedStructure("EXTH header too short".into()));
    }
    if &data[0..4] != b"EXTH" {
        return Err(Error::CorruptedStructure("Invalid EXTH signature".into()));
    }

    let record_count = be_u32(data, 8);
    let mut records = Vec::new();
    let mut pos = 12;

    for i in 0..record_count {
        if pos + 8 > data.len() {
            warn!(entry = i, record_count, "EXTH block truncated");
            break;
        }

        let record_type = be_u32(data, pos);
        let record_len = be_u32(data, pos + 4) as usize;

        if record_len < 8 || record_len > data.len() - pos {
            warn!(entry = i, record_type, record_len, "EXTH entry length out of range");
            break;
        }

        records.push(ExthRecord::decode(
            record_type,
            &data[pos + 8..pos + record_len],
            encoding,
        ));
        pos += record_len;
    }

    Ok(records)
}

/// The closed set of metadata fields recovered from EXTH.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFields {
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub title: Option<String>,
    pub language: Option<String>,
    pub cover_offset: Option<u32>,
    pub thumbnail_offset: Option<u32>,
}

impl MetadataFields {
    pub fn from_records(records: &[ExthRecord]) -> Self {
        let mut fields = MetadataFields::default();
        for record in records {
            match record {
                ExthRecord::Author(name) if !name.is_empty() => fields.authors.push(name.clone()),
                ExthRecord::Publisher(name) => fields.publisher = Some(name.clone()),
                ExthRecord::Title(title) => fields.title = Some(title.clone()),
                ExthRecord::Language(lang) => fields.language = Some(lang.clone()),
                ExthRecord::CoverOffset(offset) => fields.cover_offset = Some(*offset),
                ExthRecord::ThumbnailOffset(offset) => fields.thumbnail_offset = Some(*offset),
                ExthRecord::Author(_) | ExthRecord::Ignored(_) => {}
            }
        }
        fields
    }
}
