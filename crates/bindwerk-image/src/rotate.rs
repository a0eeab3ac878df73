// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bit-exact axis-aligned rotation for bilevel bitmaps. No interpolation:
// every rotation is a pure permutation of the source samples.

use bindwerk_core::Rotation;
use tracing::debug;

use crate::bitmap::Bitmap;

/// Rotate a bitmap clockwise by a 90-degree multiple.
///
/// 0° returns a copy; 90°/270° swap the pixel axes. The destination starts
/// white, so only black source pixels are written.
pub fn rotate(src: &Bitmap, rotation: Rotation) -> Bitmap {
    let (w, h) = (src.width(), src.height());
    debug!(width = w, height = h, degrees = rotation.degrees(), "rotating bitmap");

    match rotation {
        Rotation::R0 => src.clone(),
        Rotation::R90 => {
            // dest(x, y) = src(y, h - 1 - x); dest is h wide, w tall.
            let mut dest = Bitmap::new(h, w);
            for y in 0..w {
                for x in 0..h {
                    if src.get(y, h - 1 - x) {
                        dest.set(x, y, true);
                    }
                }
            }
            dest
        }
        Rotation::R180 => {
            let mut dest = Bitmap::new(w, h);
            for y in 0..h {
                for x in 0..w {
                    if src.get(w - 1 - x, h - 1 - y) {
                        dest.set(x, y, true);
                    }
                }
            }
            dest
        }
        Rotation::R270 => {
            // dest(x, y) = src(w - 1 - y, x); dest is h wide, w tall.
            let mut dest = Bitmap::new(h, w);
            for y in 0..w {
                for x in 0..h {
                    if src.get(w - 1 - y, x) {
                        dest.set(x, y, true);
                    }
                }
            }
            dest
        }
    }
}
