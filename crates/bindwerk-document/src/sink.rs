// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trait seam between the output router and concrete document containers.

use std::path::Path;

use bindwerk_core::error::Result;
use bindwerk_core::{DocumentMetadata, PageGeometry, PageLabel};

/// One output document being assembled.
///
/// Pages are appended in call order; page numbers returned by [`add_page`]
/// are 0-based and stable for the document's lifetime.
///
/// [`add_page`]: SinkDocument::add_page
pub trait SinkDocument {
    /// The path this document will be written to.
    fn path(&self) -> &Path;

    /// Pages appended so far.
    fn page_count(&self) -> u32;

    /// Append a page of the given size with the encoded image embedded at
    /// full-page bounds. Returns the new page's 0-based index.
    fn add_page(&mut self, geometry: &PageGeometry, image: &[u8]) -> Result<u32>;

    /// Attach a named bookmark pointing at an existing page.
    fn add_bookmark(&mut self, page: u32, title: &str) -> Result<()>;

    /// Record a page-numbering label starting at an existing page.
    fn add_page_label(&mut self, page: u32, label: &PageLabel) -> Result<()>;

    /// Flush and release the document. Must be safe to call more than once;
    /// only the first call writes.
    fn close(&mut self) -> Result<()>;
}

/// Creates output documents. The router calls this once per distinct output
/// name; metadata from the first open wins.
pub trait DocumentSink {
    fn open(&self, path: &Path, metadata: &DocumentMetadata) -> Result<Box<dyn SinkDocument>>;
}
