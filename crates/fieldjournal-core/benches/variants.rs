//! Benchmarks for the upload image pipeline.
//!
//! Run with: cargo bench -p fieldjournal-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fieldjournal_core::pipeline::{Hasher, MetadataExtractor, VariantGenerator};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .expect("encode bench fixture");
    buf.into_inner()
}

fn benchmark_content_hash(c: &mut Criterion) {
    let data = jpeg_bytes(1920, 1080);

    c.bench_function("content_hash_blake3", |b| {
        b.iter(|| Hasher::content_hash(black_box(&data)))
    });
}

fn benchmark_proxy(c: &mut Criterion) {
    let data = jpeg_bytes(4000, 2667);
    let generator = VariantGenerator::default();
    let options = generator.proxy_options();

    c.bench_function("ai_proxy_1000px", |b| {
        b.iter(|| generator.create_variant(black_box(&data), options))
    });
}

fn benchmark_thumbnail(c: &mut Criterion) {
    let data = jpeg_bytes(1920, 1080);
    let generator = VariantGenerator::default();

    c.bench_function("grid_thumbnail_300px", |b| {
        b.iter(|| generator.grid_thumbnail(black_box(&data)))
    });
}

fn benchmark_image_set(c: &mut Criterion) {
    let data = Arc::new(jpeg_bytes(1920, 1080));
    let generator = VariantGenerator::default();
    let rt = tokio::runtime::Runtime::new().expect("bench runtime");

    c.bench_function("image_set", |b| {
        b.iter(|| rt.block_on(generator.create_image_set(Arc::clone(black_box(&data)))))
    });
}

fn benchmark_metadata(c: &mut Criterion) {
    let data = jpeg_bytes(640, 480);
    let extractor = MetadataExtractor::new();

    c.bench_function("metadata_extract", |b| {
        b.iter(|| extractor.extract(black_box(&data)))
    });
}

criterion_group!(
    benches,
    benchmark_content_hash,
    benchmark_proxy,
    benchmark_thumbnail,
    benchmark_image_set,
    benchmark_metadata,
);
criterion_main!(benches);
