// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Assembly run configuration.

use serde::{Deserialize, Serialize};

/// Points (1/72 inch) per inch.
pub const POINTS_PER_INCH: u32 = 72;

/// Page size limited by common PDF viewers to 45 inches on a side.
pub const PAGE_MAX_INCHES: u32 = 45;

/// Maximum page dimension in points.
pub const PAGE_MAX_POINTS: u32 = PAGE_MAX_INCHES * POINTS_PER_INCH;

/// Settings governing one assembly run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Resolution assumed when a source page carries no resolution metadata.
    pub default_dpi: f32,
    /// Maximum page dimension in points; larger pages are skipped.
    pub max_page_points: u32,
    /// Recorded sink errors after which an output document is considered
    /// corrupt and stops accepting pages.
    pub max_sink_failures: u32,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            default_dpi: 300.0,
            max_page_points: PAGE_MAX_POINTS,
            max_sink_failures: 2,
        }
    }
}
