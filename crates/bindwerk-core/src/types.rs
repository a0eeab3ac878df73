// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bindwerk page assembler.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BindwerkError, Result};

/// An inclusive, 1-based range of page numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    first: u32,
    last: u32,
}

impl PageRange {
    /// Build a range, rejecting `first == 0` and `first > last`.
    pub fn new(first: u32, last: u32) -> Result<Self> {
        if first == 0 || first > last {
            return Err(BindwerkError::InvalidRange { first, last });
        }
        Ok(Self { first, last })
    }

    /// A range denoting exactly one page.
    pub fn single(page: u32) -> Result<Self> {
        Self::new(page, page)
    }

    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    /// Number of pages in the range before any modifier is applied. Never
    /// zero: `first <= last` is a construction invariant.
    pub fn count(&self) -> u32 {
        self.last - self.first + 1
    }
}

/// Parity filter applied to an expanded page range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageModifier {
    #[default]
    All,
    Odd,
    Even,
}

impl PageModifier {
    /// Does this modifier keep the given 1-based page number?
    pub fn keeps(&self, page: u32) -> bool {
        match self {
            Self::All => true,
            Self::Odd => page % 2 == 1,
            Self::Even => page % 2 == 0,
        }
    }
}

/// Axis-aligned page rotation. The only transform the pipeline performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Convert raw degrees from the script into a rotation.
    pub fn from_degrees(degrees: u32) -> Result<Self> {
        match degrees {
            0 => Ok(Self::R0),
            90 => Ok(Self::R90),
            180 => Ok(Self::R180),
            270 => Ok(Self::R270),
            other => Err(BindwerkError::InvalidRotation(other)),
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }

    /// Whether this rotation exchanges the page's width and height.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Self::R90 | Self::R270)
    }
}

/// Per-page metadata reported by an image source.
///
/// Resolution defaults (300 dpi, inch units) are applied by the source
/// adapter, so `x_dpi`/`y_dpi` are always positive here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourcePageInfo {
    pub width_px: u32,
    pub height_px: u32,
    pub x_dpi: f32,
    pub y_dpi: f32,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    /// TIFF planar configuration; 1 = chunky (interleaved).
    pub planar_config: u16,
}

impl SourcePageInfo {
    /// True for the only pixel format the pipeline accepts: one sample per
    /// pixel, one bit per sample, chunky layout.
    pub fn is_bilevel(&self) -> bool {
        self.samples_per_pixel == 1 && self.bits_per_sample == 1 && self.planar_config == 1
    }
}

/// Destination geometry for one transformed page.
///
/// Point dimensions are 1/72-inch units, truncated (never rounded) from the
/// pixel dimensions and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub dest_width_px: u32,
    pub dest_height_px: u32,
    pub dest_x_dpi: f32,
    pub dest_y_dpi: f32,
    pub width_pt: u32,
    pub height_pt: u32,
}

/// Metadata attached to an output document when it is first opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub author: Option<String>,
    pub creator: Option<String>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
}

/// Page-numbering label: an opaque format string plus the 1-based number the
/// labelled run starts counting from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLabel {
    pub format: String,
    pub base: u32,
}

impl Default for PageLabel {
    fn default() -> Self {
        Self {
            format: String::new(),
            base: 1,
        }
    }
}

/// One resolved unit of work: a single page to fetch, rotate, and emit.
/// Owned by the driver for the duration of one page's processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageJob {
    pub source_file: PathBuf,
    pub page_index: u32,
    pub rotation: Rotation,
}

/// Summary of one assembly run, reported after all documents are closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pages_emitted: u32,
    pub pages_skipped: u32,
    pub statements_failed: u32,
    /// Output document names in creation order.
    pub documents: Vec<String>,
    /// Human-readable descriptions of every recorded failure.
    pub errors: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            pages_emitted: 0,
            pages_skipped: 0,
            statements_failed: 0,
            documents: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Stamp the end of the run.
    pub fn mark_finished(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// True when every resolved page was emitted and no statement failed.
    pub fn is_clean(&self) -> bool {
        self.pages_skipped == 0 && self.statements_failed == 0 && self.errors.is_empty()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
