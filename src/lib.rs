//! # pagelift
//!
//! Recover the images embedded in EPUB and MOBI/AZW ebooks, in the order a reading
//! application would display them, then filter and deduplicate them before they are
//! written out.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pagelift::{DirectorySink, ExtractOptions, ExtractionPipeline, RunState};
//!
//! let data = std::fs::read("book.epub")?;
//! let pipeline = ExtractionPipeline::new(ExtractOptions::default().with_min_size(1024));
//!
//! // Each book gets its own duplicate-detection state.
//! let mut state = RunState::new();
//! let extraction = pipeline.extract(&data, &mut state)?;
//! println!("{} image(s) kept", extraction.stats.saved);
//!
//! extraction.commit(&DirectorySink, std::path::Path::new("book"))?;
//! # Ok::<(), pagelift::Error>(())
//! ```
//!
//! ## Layers
//!
//! - [`raster`] sniffs image formats and pixel dimensions and classifies images.
//! - [`mobi`] decodes the PDB record table, MOBI/EXTH headers and PalmDoc text, and
//!   reconciles `<img>` references with image records.
//! - [`epub`] walks `container.xml`, the OPF manifest and spine, and `<img>` tags.
//! - [`pipeline`] runs decode, order, classify, filter and emit for one book at a time,
//!   and fans books out over a bounded worker pool.

pub mod book;
pub mod cache;
pub mod container;
pub mod epub;
pub mod error;
pub mod export;
pub mod manifest;
pub mod mobi;
pub mod pipeline;
pub mod raster;
pub(crate) mod util;

pub use book::{BookMetadata, ImageReference, ImageRole, SourceRef};
pub use cache::{HashCache, HashStore};
pub use container::{BookFormat, ContainerDecoder, DecodedBook, decoder_for, detect_format};
pub use error::{Error, Result};
pub use pipeline::{
    BookExtraction, DirectorySink, ExtractOptions, ExtractedImage, ExtractionPipeline,
    ExtractionStats, MemorySink, OutputSink, RunState, SkipReason,
};
pub use raster::{RasterFormat, RasterMetrics};
