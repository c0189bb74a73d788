// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use criterion::{criterion_group, criterion_main, Criterion};
use r7_video::{
    extract_metadata,
    metadata::{extract_metadata_into, METADATA_MAGIC},
    FrameMetadata, METADATA_SIZE,
};
use std::hint::black_box;

fn frame(width: u32, height: u32, bpp: u32) -> Vec<u8> {
    let frame_size = width * height * bpp;
    let mut buf = vec![0u8; frame_size as usize + METADATA_SIZE];
    let meta = FrameMetadata {
        width,
        height,
        bpp,
        timestamp: 1,
        frame_size,
        magic: METADATA_MAGIC,
        ..Default::default()
    };
    let len = buf.len();
    meta.encode(&mut buf[len - METADATA_SIZE..]).unwrap();
    buf
}

pub fn benchmark_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("metadata");
    for dim in [(200, 150, 4), (640, 480, 2), (1920, 1080, 2)].iter() {
        let buf = frame(dim.0, dim.1, dim.2);
        group.bench_with_input(format!("{}x{}", dim.0, dim.1), &buf, |b, buf| {
            b.iter(|| extract_metadata(black_box(buf)).unwrap())
        });
    }

    let buf = frame(640, 480, 2);
    let mut out = FrameMetadata::default();
    group.bench_function("into", |b| {
        b.iter(|| extract_metadata_into(black_box(&buf), &mut out).unwrap())
    });

    let garbage = vec![0xFFu8; 640 * 480 * 2];
    group.bench_function("rejected", |b| {
        b.iter(|| extract_metadata(black_box(&garbage)).is_err())
    });
    group.finish();
}

criterion_group!(benches, benchmark_extract);
criterion_main!(benches);
