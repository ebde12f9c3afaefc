//! Benchmarks for GEMPAK grid unpacking.
//!
//! Run with: cargo bench --package gempak-parser --bench unpack_benchmarks

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gempak_parser::bits::{extract_field, extract_msb_field};
use gempak_parser::packing::{unpack_grib_stream, unpack_grib_words, SimplePackingParams};
use gempak_parser::{DecoderConfig, GempakGridReader, RealPackingLayout};
use grid_processor::normalize_flag;
use test_utils::bits::{pack_lsb_words, pack_msb_words};
use test_utils::gempak::{FileEndian, GridFileBuilder, GridHeaderSpec, GridPayload};

/// Packed fields cycling through the full range of `nbits`.
fn generate_fields(count: usize, nbits: i32) -> Vec<u32> {
    let max = (1u64 << nbits) - 1;
    (0..count as u64).map(|i| ((i * 7919) % max) as u32).collect()
}

fn params(kxky: usize, nbits: i32) -> SimplePackingParams {
    SimplePackingParams {
        nbits,
        missing_flag: true,
        kxky,
        reference: 200.0,
        scale: 0.01,
        decimal_scale: 0,
    }
}

// =============================================================================
// GRIB UNPACKING BENCHMARKS
// =============================================================================

fn bench_grib_unpackers(c: &mut Criterion) {
    let mut group = c.benchmark_group("grib_unpack");

    for (nx, ny, name) in [(144, 73, "2.5deg"), (360, 181, "1deg"), (720, 361, "0.5deg")] {
        let kxky = nx * ny;
        let nbits = 16;
        let words = pack_msb_words(&generate_fields(kxky, nbits), nbits as usize);
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        let params = params(kxky, nbits);

        group.throughput(Throughput::Elements(kxky as u64));
        group.bench_with_input(BenchmarkId::new("words", name), &words, |b, words| {
            b.iter(|| unpack_grib_words(black_box(words), &params, -9999.0));
        });
        group.bench_with_input(BenchmarkId::new("stream", name), &bytes, |b, bytes| {
            b.iter(|| unpack_grib_stream(black_box(bytes), false, &params, -9999.0));
        });
    }

    group.finish();
}

fn bench_grib_bit_widths(c: &mut Criterion) {
    let mut group = c.benchmark_group("grib_bit_widths");
    let kxky = 360 * 181;

    for nbits in [8, 12, 16, 24] {
        let words = pack_msb_words(&generate_fields(kxky, nbits), nbits as usize);
        let params = params(kxky, nbits);

        group.throughput(Throughput::Elements(kxky as u64));
        group.bench_with_input(BenchmarkId::new("nbits", nbits), &words, |b, words| {
            b.iter(|| unpack_grib_words(black_box(words), &params, -9999.0));
        });
    }

    group.finish();
}

// =============================================================================
// BIT FIELD BENCHMARKS
// =============================================================================

fn bench_bit_fields(c: &mut Criterion) {
    let mut group = c.benchmark_group("bit_fields");
    let words: Vec<u32> = (0..1024u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();

    group.bench_function("lsb_13bit_1000", |b| {
        b.iter(|| {
            for k in 0..1000 {
                black_box(extract_field(&words, k * 13, 13).ok());
            }
        });
    });
    group.bench_function("msb_13bit_1000", |b| {
        b.iter(|| {
            for k in 0..1000 {
                black_box(extract_msb_field(&words, k * 13, 13).ok());
            }
        });
    });

    group.finish();
}

fn bench_real_packing(c: &mut Criterion) {
    let mut group = c.benchmark_group("real_packing");

    let layout = RealPackingLayout::new([(-1, -500, 12), (-1, -500, 12), (0, 0, 8)]);
    let Some(layout) = layout else {
        return;
    };
    let record = pack_lsb_words(&[(700, 12), (650, 12), (42, 8)]);
    let words: Vec<u32> = record.iter().copied().cycle().take(record.len() * 1000).collect();

    group.throughput(Throughput::Elements(1000));
    group.bench_function("1000_records", |b| {
        b.iter(|| layout.unpack(black_box(&words), -9999.0));
    });

    group.finish();
}

// =============================================================================
// ORIENTATION BENCHMARKS
// =============================================================================

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let (nx, ny) = (360, 181);
    let raw: Vec<f32> = (0..nx * ny).map(|v| v as f32).collect();

    for (flag, name) in [(0x00u8, "north_first"), (0x40, "canonical"), (0x20, "columns"), (0x50, "boustrophedon")] {
        group.throughput(Throughput::Elements((nx * ny) as u64));
        group.bench_with_input(BenchmarkId::new("scan", name), &raw, |b, raw| {
            b.iter(|| normalize_flag(black_box(raw), nx, ny, flag));
        });
    }

    group.finish();
}

// =============================================================================
// FULL READ BENCHMARKS
// =============================================================================

fn bench_read_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_grid");
    let (nx, ny) = (144, 73);
    let kxky = nx * ny;

    for order in [FileEndian::Big, FileEndian::Little] {
        let bytes = GridFileBuilder::new(nx as i32, ny as i32)
            .byte_order(order)
            .grid(
                GridHeaderSpec::new("TMPK"),
                GridPayload::Grib {
                    nbits: 16,
                    missing_flag: false,
                    reference: 200.0,
                    scale: 0.01,
                    fields: generate_fields(kxky, 16),
                },
            )
            .build();

        group.throughput(Throughput::Elements(kxky as u64));
        group.bench_with_input(BenchmarkId::new("grib", format!("{:?}", order)), &bytes, |b, bytes| {
            b.iter(|| {
                let mut reader = GempakGridReader::from_reader(
                    Cursor::new(bytes.clone()),
                    DecoderConfig::default(),
                    "bench",
                )
                .ok()?;
                let header = reader.grids().first().cloned()?;
                reader.read_grid(&header).ok().flatten()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_grib_unpackers,
    bench_grib_bit_widths,
    bench_bit_fields,
    bench_real_packing,
    bench_normalize,
    bench_read_grid,
);
criterion_main!(benches);
