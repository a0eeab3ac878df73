// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bindwerk.

use thiserror::Error;

/// Top-level error type for all Bindwerk operations.
#[derive(Debug, Error)]
pub enum BindwerkError {
    // -- Script / configuration errors --
    #[error("invalid page range {first}..{last}: first page must be >= 1 and <= last")]
    InvalidRange { first: u32, last: u32 },

    #[error("rotation must be 0, 90, 180, or 270, got {0}")]
    InvalidRotation(u32),

    #[error("no input file set for images statement")]
    MissingInputFile,

    #[error("no output file set for images statement")]
    MissingOutputFile,

    // -- Source image errors --
    #[error("cannot open input file '{path}': {reason}")]
    SourceOpen { path: String, reason: String },

    #[error("page {page} not found in '{path}'")]
    PageNotFound { path: String, page: u32 },

    #[error("unsupported image format in '{path}' page {page}: {reason}")]
    UnsupportedFormat {
        path: String,
        page: u32,
        reason: String,
    },

    #[error("cannot read page {page} of '{path}': {reason}")]
    SourceRead {
        path: String,
        page: u32,
        reason: String,
    },

    // -- Geometry errors --
    #[error("page too large: {width_pt}x{height_pt} pt exceeds {max_pt} pt per side")]
    PageTooLarge {
        width_pt: u32,
        height_pt: u32,
        max_pt: u32,
    },

    // -- Encoding / sink errors --
    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("cannot create output file '{path}': {reason}")]
    CannotCreateOutput { path: String, reason: String },

    #[error("output document error: {0}")]
    Sink(String),

    // -- Structural errors --
    #[error("context pop without matching push")]
    StackUnderflow,

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BindwerkError>;

/// How far an error unwinds the assembly run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed script structure — the whole run aborts.
    Fatal,
    /// The current images statement is abandoned; the run continues.
    Statement,
    /// One page is skipped; the statement continues with the next page.
    Page,
}

impl BindwerkError {
    /// Classify this error for the partial-failure policy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::StackUnderflow => ErrorClass::Fatal,
            Self::InvalidRange { .. }
            | Self::InvalidRotation(_)
            | Self::MissingInputFile
            | Self::MissingOutputFile
            | Self::SourceOpen { .. }
            | Self::CannotCreateOutput { .. } => ErrorClass::Statement,
            _ => ErrorClass::Page,
        }
    }
}
