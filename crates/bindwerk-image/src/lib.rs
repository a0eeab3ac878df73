// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bindwerk-image — Bilevel raster handling for the Bindwerk page assembler.
//
// Provides the packed bilevel bitmap type, bit-exact axis-aligned rotation,
// Group 4 fax encoding, and the multi-page TIFF source adapter.

pub mod bitmap;
pub mod fax;
pub mod rotate;
pub mod source;
pub mod tiff;

pub use bitmap::Bitmap;
pub use fax::{FaxEncoder, ImageEncoder};
pub use rotate::rotate;
pub use source::{PageSource, SourceOpener};
pub use tiff::{TiffPageSource, TiffSourceOpener};
