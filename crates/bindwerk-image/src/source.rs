// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trait seam between the assembly pipeline and concrete image containers.

use std::path::Path;

use bindwerk_core::SourcePageInfo;
use bindwerk_core::error::Result;

use crate::bitmap::Bitmap;

/// A multi-page source of bilevel page images.
///
/// Page indices are 1-based throughout, matching the numbering used in
/// assembly scripts. Methods take `&mut self` because container formats keep
/// a seekable cursor.
pub trait PageSource {
    /// The path this source was opened from, for diagnostics.
    fn path(&self) -> &Path;

    /// Total number of pages in the container.
    fn page_count(&mut self) -> Result<u32>;

    /// Pixel-format and resolution metadata for one page, with resolution
    /// defaults already applied.
    fn page_info(&mut self, page: u32) -> Result<SourcePageInfo>;

    /// Decode one page into a packed bilevel bitmap (bit 1 = black).
    fn read_page(&mut self, page: u32) -> Result<Bitmap>;
}

/// Opens page sources by path. The driver keeps at most one source open at a
/// time and asks the opener again only when the script names a new file.
pub trait SourceOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn PageSource>>;
}
