// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output router: the registry of output documents opened so far, and the
// emission path that appends each transformed page to the active one.
//
// Identity is the exact declared name — no case folding, no path
// normalisation. A document that keeps failing is poisoned and stops
// accepting pages, since its handle may be corrupt; it is still closed once
// at end of run.

use std::path::{Path, PathBuf};

use bindwerk_core::error::{BindwerkError, Result};
use bindwerk_core::{DocumentMetadata, PageGeometry, PageLabel};
use bindwerk_document::sink::{DocumentSink, SinkDocument};
use tracing::{debug, info, warn};

struct RoutedDocument {
    name: PathBuf,
    doc: Box<dyn SinkDocument>,
    sink_errors: u32,
}

/// Routes transformed pages into output documents, creating each document
/// at most once per run.
pub struct OutputRouter {
    sink: Box<dyn DocumentSink>,
    documents: Vec<RoutedDocument>,
    current: Option<usize>,
    max_sink_failures: u32,
}

impl OutputRouter {
    pub fn new(sink: Box<dyn DocumentSink>, max_sink_failures: u32) -> Self {
        Self {
            sink,
            documents: Vec::new(),
            current: None,
            max_sink_failures,
        }
    }

    /// Make `name` the active output document, opening it on first use.
    /// Metadata is applied only by that first open; later calls for the same
    /// name ignore their metadata argument.
    pub fn ensure_document(&mut self, name: &Path, metadata: &DocumentMetadata) -> Result<()> {
        if let Some(index) = self.current {
            if self.documents[index].name == name {
                return Ok(());
            }
        }
        if let Some(index) = self.documents.iter().position(|d| d.name == name) {
            debug!(name = %name.display(), "switching to existing output document");
            self.current = Some(index);
            return Ok(());
        }

        info!(name = %name.display(), "opening output document");
        let doc = self.sink.open(name, metadata)?;
        self.documents.push(RoutedDocument {
            name: name.to_path_buf(),
            doc,
            sink_errors: 0,
        });
        self.current = Some(self.documents.len() - 1);
        Ok(())
    }

    /// Append a page to the active document, attaching the bookmark and page
    /// label when given. Pages land in exact call order.
    pub fn emit_page(
        &mut self,
        geometry: &PageGeometry,
        encoded: &[u8],
        bookmark: Option<&str>,
        label: Option<&PageLabel>,
    ) -> Result<u32> {
        let index = self.current.ok_or_else(|| {
            BindwerkError::Sink("no active output document".to_string())
        })?;
        let max_failures = self.max_sink_failures;
        let entry = &mut self.documents[index];

        if entry.sink_errors >= max_failures {
            return Err(BindwerkError::Sink(format!(
                "output '{}' disabled after {} sink errors",
                entry.name.display(),
                entry.sink_errors
            )));
        }

        let page = match entry.doc.add_page(geometry, encoded) {
            Ok(page) => page,
            Err(err) => {
                record_sink_error(entry, max_failures);
                return Err(err);
            }
        };
        if let Some(title) = bookmark {
            if let Err(err) = entry.doc.add_bookmark(page, title) {
                record_sink_error(entry, max_failures);
                return Err(err);
            }
        }
        if let Some(label) = label {
            if let Err(err) = entry.doc.add_page_label(page, label) {
                record_sink_error(entry, max_failures);
                return Err(err);
            }
        }
        Ok(page)
    }

    /// Close every document ever opened, in creation order, exactly once.
    /// Always runs to the end; close failures are returned, not raised.
    pub fn close_all(&mut self) -> Vec<BindwerkError> {
        let mut errors = Vec::new();
        for entry in &mut self.documents {
            debug!(name = %entry.name.display(), pages = entry.doc.page_count(), "closing output document");
            if let Err(err) = entry.doc.close() {
                errors.push(err);
            }
        }
        self.current = None;
        errors
    }

    /// Names of all documents opened so far, in creation order.
    pub fn document_names(&self) -> Vec<String> {
        self.documents
            .iter()
            .map(|d| d.name.display().to_string())
            .collect()
    }
}

fn record_sink_error(entry: &mut RoutedDocument, max_failures: u32) {
    entry.sink_errors += 1;
    if entry.sink_errors >= max_failures {
        warn!(
            name = %entry.name.display(),
            errors = entry.sink_errors,
            "output document poisoned; skipping its remaining pages"
        );
    }
}
