//! Many books at once on a bounded worker pool.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{error, info};

use super::{BookExtraction, ExtractionPipeline, ExtractionStats, OutputSink, RunState};
use crate::book::BookMetadata;
use crate::container::BookFormat;
use crate::error::Result;
use crate::export::export_directory;
use crate::manifest::{MANIFEST_FILENAME, Manifest};

/// One book to process and where its images go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookJob {
    pub source: PathBuf,
    pub output_dir: PathBuf,
}

impl BookJob {
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Output next to the book, in a directory named after its file stem.
    pub fn beside(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let stem = source.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
        let output_dir = source.with_file_name(stem);
        Self { source, output_dir }
    }
}

/// What happened to a book that decoded successfully.
#[derive(Debug, Clone)]
pub struct BookReport {
    pub metadata: BookMetadata,
    pub stats: ExtractionStats,
    /// Comic archive written for the book, if requested.
    pub archive: Option<PathBuf>,
}

/// Result for one book. Errors carry the book's path.
#[derive(Debug)]
pub struct BookOutcome {
    pub job: BookJob,
    pub result: Result<BookReport>,
}

/// Process `jobs` on a pool of `threads` workers (0 lets rayon decide).
///
/// Each book gets a fresh [`RunState`], so duplicates are only detected within a book.
/// A failing book does not stop the others. Pending cache inserts are flushed once
/// after every book has finished. Outcomes come back in job order.
pub fn extract_batch(
    pipeline: &ExtractionPipeline,
    jobs: &[BookJob],
    sink: &dyn OutputSink,
    threads: usize,
) -> Result<Vec<BookOutcome>> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;

    let outcomes: Vec<BookOutcome> = pool.install(|| {
        jobs.par_iter()
            .map(|job| {
                let result = process_book(pipeline, job, sink).map_err(|e| e.in_book(&job.source));
                if let Err(err) = &result {
                    error!(%err, "book failed");
                }
                BookOutcome {
                    job: job.clone(),
                    result,
                }
            })
            .collect()
    });

    if let Some(cache) = pipeline.cache() {
        let added = cache.flush();
        info!(added, "merged new hashes into cache");
    }

    Ok(outcomes)
}

/// Read, extract and write one book.
pub fn process_book(
    pipeline: &ExtractionPipeline,
    job: &BookJob,
    sink: &dyn OutputSink,
) -> Result<BookReport> {
    info!(book = %job.source.display(), "processing");
    let data = std::fs::read(&job.source)?;

    let mut state = RunState::new();
    let extraction = pipeline.extract(&data, &mut state)?;

    let archive = if pipeline.options().dry_run {
        info!(
            dir = %job.output_dir.display(),
            images = extraction.images.len(),
            "dry run, nothing written"
        );
        None
    } else {
        write_book(pipeline, &extraction, job, sink)?
    };

    Ok(BookReport {
        metadata: extraction.metadata,
        stats: extraction.stats,
        archive,
    })
}

fn write_book(
    pipeline: &ExtractionPipeline,
    extraction: &BookExtraction,
    job: &BookJob,
    sink: &dyn OutputSink,
) -> Result<Option<PathBuf>> {
    extraction.commit(sink, &job.output_dir)?;
    if extraction.images.is_empty() {
        return Ok(None);
    }

    let options = pipeline.options();
    if options.write_manifest {
        let manifest = Manifest::new(extraction, &job.source, &job.output_dir);
        sink.write(&job.output_dir, MANIFEST_FILENAME, manifest.to_json()?.as_bytes())?;
    }

    match options.archive {
        Some(format) => Ok(Some(export_directory(&job.output_dir, format)?)),
        None => Ok(None),
    }
}

/// Sum the stats of every book that succeeded.
pub fn total_stats(outcomes: &[BookOutcome]) -> ExtractionStats {
    let mut total = ExtractionStats::default();
    for report in outcomes.iter().filter_map(|o| o.result.as_ref().ok()) {
        total += report.stats;
    }
    total
}

/// Is `path` an ebook the pipeline can read, judging by extension.
pub fn is_book_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(BookFormat::from_extension)
        .is_some()
}
