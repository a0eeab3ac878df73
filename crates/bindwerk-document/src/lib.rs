// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bindwerk-document — Output document handling for the Bindwerk page
// assembler.
//
// Defines the sink trait seam the output router talks to, and the PDF
// implementation built on `lopdf`.

pub mod pdf;
pub mod sink;

pub use pdf::writer::{PdfDocument, PdfSink};
pub use sink::{DocumentSink, SinkDocument};
