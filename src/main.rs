//! pagelift - extract ebook images in reading order

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

use pagelift::export::ArchiveFormat;
use pagelift::pipeline::batch::{BookJob, extract_batch, is_book_path, total_stats};
use pagelift::{DirectorySink, ExtractOptions, ExtractionPipeline, HashCache};

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "pagelift")]
#[command(version, about = "Extract the images of EPUB and MOBI/AZW ebooks in reading order", long_about = None)]
#[command(after_help = "EXAMPLES:
    pagelift                          Extract every book in the current directory
    pagelift -r ~/comics --archive cbz
                                      Walk subdirectories, package each book as CBZ
    pagelift book.azw3 --min-size 4096 --manifest
                                      One book, skip tiny images, write manifest.json")]
struct Cli {
    /// Book file, or directory of EPUB/MOBI/AZW/AZW3 files
    #[arg(value_name = "INPUT", default_value = ".")]
    input: PathBuf,

    /// Search subdirectories too
    #[arg(short, long)]
    recursive: bool,

    /// Books processed in parallel (0 = one per CPU)
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,

    /// Skip images smaller than this many bytes
    #[arg(long, value_name = "BYTES", default_value_t = 0)]
    min_size: usize,

    /// Skip images narrower than this many pixels
    #[arg(long, value_name = "PX", default_value_t = 0)]
    min_width: u32,

    /// Skip images shorter than this many pixels
    #[arg(long, value_name = "PX", default_value_t = 0)]
    min_height: u32,

    /// Skip images whose long side exceeds this multiple of the short side
    #[arg(long, value_name = "RATIO", default_value_t = 0.0)]
    max_aspect_ratio: f64,

    /// Remember extracted hashes across runs in this JSON file
    #[arg(long, value_name = "PATH")]
    hash_cache: Option<PathBuf>,

    /// Add a SHA-256 hash to the ignore list (repeatable)
    #[arg(long = "ignore-hash", value_name = "SHA256")]
    ignore_hash: Vec<String>,

    /// Keep duplicate images within a book
    #[arg(long)]
    no_dedup: bool,

    /// EPUB: take every image in the archive instead of following <img> tags
    #[arg(long)]
    all_images: bool,

    /// Report what would be extracted without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Write manifest.json next to the images
    #[arg(long)]
    manifest: bool,

    /// Package each output directory as a comic archive
    #[arg(long, value_enum, value_name = "FORMAT")]
    archive: Option<ArchiveFormat>,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());
    let json = cli.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn options(cli: &Cli) -> ExtractOptions {
    let mut options = ExtractOptions::default()
        .with_min_size(cli.min_size)
        .with_min_dimensions(cli.min_width, cli.min_height)
        .with_max_aspect_ratio(cli.max_aspect_ratio)
        .with_deduplicate(!cli.no_dedup)
        .with_html_refs(!cli.all_images)
        .with_dry_run(cli.dry_run)
        .with_manifest(cli.manifest)
        .with_archive(cli.archive);
    for hash in &cli.ignore_hash {
        options.add_ignored_hash(hash);
    }
    options
}

/// Returns whether every book succeeded.
fn run(cli: &Cli) -> pagelift::Result<bool> {
    let books = find_books(&cli.input, cli.recursive);
    if books.is_empty() {
        info!(input = %cli.input.display(), "no supported files found");
        return Ok(true);
    }
    info!(count = books.len(), "found books");

    let cache = cli
        .hash_cache
        .as_ref()
        .map(HashCache::load)
        .transpose()?
        .map(Arc::new);

    let mut pipeline = ExtractionPipeline::new(options(cli));
    if let Some(cache) = &cache {
        pipeline = pipeline.with_cache(cache.clone());
    }

    let jobs: Vec<BookJob> = books.into_iter().map(BookJob::beside).collect();
    let outcomes = extract_batch(&pipeline, &jobs, &DirectorySink, cli.jobs)?;

    let mut failures = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => {
                let name = outcome
                    .job
                    .source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let prefix = if cli.dry_run { "[dry run] " } else { "" };
                println!("{prefix}{name}: {}", report.stats);
                if let Some(archive) = &report.archive {
                    println!("  archive: {}", archive.display());
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("error: {e}");
            }
        }
    }

    println!();
    println!("Books processed: {} ({failures} failed)", outcomes.len());
    println!("Total: {}", total_stats(&outcomes));

    if let Some(cache) = &cache
        && !cli.dry_run
    {
        cache.save()?;
    }

    Ok(failures == 0)
}

/// Books under `input` sorted by path, or `input` itself if it is a file.
fn find_books(input: &Path, recursive: bool) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut books: Vec<PathBuf> = WalkDir::new(input)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(%err, "skipping unreadable path");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_book_path(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    books.sort();
    books
}
