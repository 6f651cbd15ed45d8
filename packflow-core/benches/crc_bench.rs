//! Throughput benchmarks for the container checksums.
//!
//! CRC-32 guards every xz header and the index; CRC-64 is the default
//! block check. Both run over every decompressed byte in the embedded
//! decoder, so their throughput bounds decoder throughput.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use packflow_core::crc::{Crc32, Crc64};
use std::hint::black_box;

fn pseudo_random(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
    for _ in 0..size {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        data.push((seed >> 32) as u8);
    }
    data
}

const SIZES: [(&str, usize); 4] = [
    ("256B", 256),
    ("16KB", 16 * 1024),
    ("64KB", 64 * 1024),
    ("1MB", 1024 * 1024),
];

fn bench_crc32(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32");
    for (label, size) in SIZES {
        let data = pseudo_random(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &data, |b, data| {
            b.iter(|| Crc32::compute(black_box(data)));
        });
    }
    group.finish();
}

fn bench_crc64(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc64");
    for (label, size) in SIZES {
        let data = pseudo_random(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &data, |b, data| {
            b.iter(|| Crc64::compute(black_box(data)));
        });
    }
    group.finish();
}

/// Feeding the checksum in pump-sized pieces, as the dictionary flush does.
fn bench_incremental(c: &mut Criterion) {
    let data = pseudo_random(1024 * 1024);
    let mut group = c.benchmark_group("crc_incremental");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk in [17usize, 4096, 16 * 1024] {
        group.bench_with_input(BenchmarkId::new("crc64", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut crc = Crc64::new();
                for piece in data.chunks(chunk) {
                    crc.update(black_box(piece));
                }
                crc.finalize()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_crc32, bench_crc64, bench_incremental);
criterion_main!(benches);
