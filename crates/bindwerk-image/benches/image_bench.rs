// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the bindwerk-image crate: bitmap rotation and
// Group 4 encoding on a synthetic scanned-text pattern.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use bindwerk_core::Rotation;
use bindwerk_image::fax::{FaxEncoder, ImageEncoder};
use bindwerk_image::{Bitmap, rotate};

/// Build a 1275x1650 bitmap (half-letter at 150 dpi) with text-like runs:
/// short black dashes on most rows, which is the shape fax coding is tuned
/// for.
fn synthetic_page() -> Bitmap {
    let mut bm = Bitmap::new(1275, 1650);
    for y in (100..1550).step_by(5) {
        let mut x = 90 + (y % 37);
        while x < 1180 {
            for dx in 0..18 {
                bm.set(x + dx, y, true);
            }
            x += 18 + (x % 23) + 7;
        }
    }
    bm
}

fn bench_rotate(c: &mut Criterion) {
    let page = synthetic_page();
    c.bench_function("rotate 90 (1275x1650)", |b| {
        b.iter(|| black_box(rotate(black_box(&page), Rotation::R90)));
    });
    c.bench_function("rotate 180 (1275x1650)", |b| {
        b.iter(|| black_box(rotate(black_box(&page), Rotation::R180)));
    });
}

fn bench_fax_encode(c: &mut Criterion) {
    let page = synthetic_page();
    c.bench_function("group 4 encode (1275x1650)", |b| {
        b.iter(|| black_box(FaxEncoder.encode(black_box(&page)).unwrap()));
    });
}

criterion_group!(benches, bench_rotate, bench_fax_encode);
criterion_main!(benches);
