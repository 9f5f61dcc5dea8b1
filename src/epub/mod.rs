//! EPUB decoding: archive access, OPF reading order and `<img>` resolution.

pub mod archive;
mod decoder;
pub mod images;
pub mod opf;

pub use archive::{Archive, MemoryArchive, ZipEntries};
pub use decoder::EpubDecoder;
pub use images::{ImageRefs, resolve_image_references};
pub use opf::{DocumentOrder, OpfPackage, resolve_document_order};
