//! Criterion micro-benchmarks for string transcoding.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use keel_bench::{ascii_text, mixed_text};
use keel_mem::text::{self, Encoding};

/// Benchmark: encode 256 mixed strings as null-terminated UTF-16.
fn bench_encode_utf16(c: &mut Criterion) {
    let inputs = mixed_text(256, 32);
    c.bench_function("encode_utf16_256", |b| {
        b.iter(|| {
            for s in &inputs {
                black_box(Encoding::Utf16.encode_terminated(s));
            }
        });
    });
}

/// Benchmark: decode 256 null-terminated UTF-8 buffers.
fn bench_decode_utf8(c: &mut Criterion) {
    let buffers: Vec<Vec<u8>> = mixed_text(256, 32)
        .iter()
        .map(|s| Encoding::Utf8.encode_terminated(s))
        .collect();
    c.bench_function("decode_utf8_256", |b| {
        b.iter(|| {
            for buf in &buffers {
                black_box(text::decode_utf8(buf, true));
            }
        });
    });
}

/// Benchmark: ASCII into a fixed buffer, the common path for C APIs.
fn bench_encode_ascii_into(c: &mut Criterion) {
    let inputs = ascii_text(256, 48);
    let mut dst = [0u8; 64];
    c.bench_function("encode_ascii_into_256", |b| {
        b.iter(|| {
            for s in &inputs {
                black_box(text::encode_into(s, Encoding::Ascii, &mut dst, true).unwrap());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_encode_utf16,
    bench_decode_utf8,
    bench_encode_ascii_into
);
criterion_main!(benches);
