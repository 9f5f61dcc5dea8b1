//! Benchmarks for the decoding hot paths.
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};

use pagelift::mobi::palmdoc::{compress, decompress};
use pagelift::raster::detect;
use pagelift::{ExtractOptions, ExtractionPipeline, RunState};

fn sample_text() -> Vec<u8> {
    let paragraph = "<p>It was a bright cold day in April, and the clocks were striking \
                     thirteen. <img recindex=\"00012\" /></p>\n";
    paragraph.repeat(64).into_bytes()[..4096].to_vec()
}

fn sample_jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    data.extend_from_slice(b"JFIF\0");
    data.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 0, 0]);
    // A run of APPn segments before the frame header
    for _ in 0..16 {
        data.extend_from_slice(&[0xFF, 0xE1, 0x01, 0x02]);
        data.extend_from_slice(&[0u8; 0x100]);
    }
    data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x03, 0x20, 0x02, 0x58]);
    data.extend_from_slice(&[3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
    data.resize(64 * 1024, 0);
    data
}

// ============================================================================
// MOBI text
// ============================================================================

fn bench_palmdoc_decompress(c: &mut Criterion) {
    let compressed = compress(&sample_text());
    c.bench_function("palmdoc_decompress", |b| {
        b.iter(|| decompress(&compressed));
    });
}

fn bench_palmdoc_compress(c: &mut Criterion) {
    let text = sample_text();
    c.bench_function("palmdoc_compress", |b| {
        b.iter(|| compress(&text));
    });
}

// ============================================================================
// Raster sniffing
// ============================================================================

fn bench_detect_jpeg(c: &mut Criterion) {
    let jpeg = sample_jpeg();
    c.bench_function("detect_jpeg", |b| {
        b.iter(|| detect(&jpeg));
    });
}

fn bench_filter_images(c: &mut Criterion) {
    let jpeg = sample_jpeg();
    let pipeline = ExtractionPipeline::new(ExtractOptions::default().with_min_size(1024));
    let book = pagelift::DecodedBook {
        format: pagelift::BookFormat::Mobi,
        metadata: pagelift::BookMetadata::new("Bench"),
        images: (0..32)
            .map(|i| {
                let mut data = jpeg.clone();
                data[100] = i as u8;
                pagelift::ImageReference::new(data, pagelift::SourceRef::Record(i + 10), i)
            })
            .collect(),
        missing: Vec::new(),
        resolution: pagelift::container::Resolution::Epub {
            documents: 0,
            listing_fallback: true,
        },
    };

    c.bench_function("filter_32_images", |b| {
        b.iter(|| pipeline.extract_decoded(book.clone(), &mut RunState::new()));
    });
}

criterion_group!(
    benches,
    bench_palmdoc_decompress,
    bench_palmdoc_compress,
    bench_detect_jpeg,
    bench_filter_images,
);
criterion_main!(benches);
