//! MOBI/AZW (PDB) decoding: record table, headers, PalmDoc text and image order.

mod decoder;
pub mod headers;
pub mod order;
pub mod palmdoc;
pub mod pdb;
pub mod references;
pub mod text;

pub use decoder::MobiDecoder;
pub use headers::{Compression, ContainerHeader, Encoding, ExthRecord, MetadataFields};
pub use order::{IndexStrategy, OrderResolution, StrategyScores, resolve_order};
pub use pdb::{RawRecord, is_pdb_book, parse_record_table};
pub use references::extract_references;
