//! PDB (Palm Database) record table.

use tracing::debug;

/// Size of the fixed PDB header preceding the record table.
pub const PDB_HEADER_LEN: usize = 78;

const RECORD_ENTRY_LEN: usize = 8;

/// A contiguous byte range `[start, end)` of the container file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord {
    pub start: usize,
    pub end: usize,
}

impl RawRecord {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Borrow this record's bytes out of the whole file.
    pub fn slice<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.start..self.end]
    }
}

/// Whether the PDB type/creator at bytes 60..68 names a MOBI or PalmDoc book.
pub fn is_pdb_book(data: &[u8]) -> bool {
    if data.len() < PDB_HEADER_LEN {
        return false;
    }
    let ident = &data[60..68];
    ident == b"BOOKMOBI" || ident.eq_ignore_ascii_case(b"TEXTREAD")
}

/// Database name from bytes 0..32 (NUL-terminated).
pub fn database_name(data: &[u8]) -> String {
    let head = &data[..data.len().min(32)];
    let end = head.iter().position(|&b| b == 0).unwrap_or(head.len());
    String::from_utf8_lossy(&head[..end]).into_owned()
}

/// Split the file into records using the offset table.
///
/// Each table entry is a 4-byte big-endian offset followed by 4 bytes of attributes and
/// unique id. Record `i` ends where record `i + 1` starts; the last one ends at the end
/// of the file. Returns an empty list if the header or table is truncated, or if the
/// offsets decrease or point outside the file.
pub fn parse_record_table(data: &[u8]) -> Vec<RawRecord> {
    if data.len() < PDB_HEADER_LEN {
        return Vec::new();
    }

    let num_records = u16::from_be_bytes([data[76], data[77]]) as usize;
    let table_end = PDB_HEADER_LEN + num_records * RECORD_ENTRY_LEN;
    if num_records == 0 || data.len() < table_end {
        debug!(num_records, file_len = data.len(), "PDB record table truncated");
        return Vec::new();
    }

    let offsets: Vec<usize> = (0..num_records)
        .map(|i| {
            let pos = PDB_HEADER_LEN + i * RECORD_ENTRY_LEN;
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize
        })
        .collect();

    let mut records = Vec::with_capacity(num_records);
    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(data.len());
        if start < table_end || start > end || end > data.len() {
            debug!(record = i, start, end, "PDB record offsets out of order");
            return Vec::new();
        }
        records.push(RawRecord { start, end });
    }

    records
}
