// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry engine: destination pixel dimensions and physical page size for
// one transformed page.

use bindwerk_core::error::{BindwerkError, Result};
use bindwerk_core::{PageGeometry, POINTS_PER_INCH, Rotation, SourcePageInfo};

/// Compute the destination geometry for a page under the given rotation.
///
/// 90°/270° swap the pixel axes and the x/y resolutions. Point sizes are
/// truncated, not rounded. Pages larger than `max_points` on either side
/// fail with `PageTooLarge`; the caller must skip them, never clamp.
pub fn compute(info: &SourcePageInfo, rotation: Rotation, max_points: u32) -> Result<PageGeometry> {
    let (dest_width_px, dest_height_px, dest_x_dpi, dest_y_dpi) = if rotation.swaps_axes() {
        (info.height_px, info.width_px, info.y_dpi, info.x_dpi)
    } else {
        (info.width_px, info.height_px, info.x_dpi, info.y_dpi)
    };

    let width_pt = (dest_width_px as f32 / dest_x_dpi * POINTS_PER_INCH as f32) as u32;
    let height_pt = (dest_height_px as f32 / dest_y_dpi * POINTS_PER_INCH as f32) as u32;

    if width_pt > max_points || height_pt > max_points {
        return Err(BindwerkError::PageTooLarge {
            width_pt,
            height_pt,
            max_pt: max_points,
        });
    }

    Ok(PageGeometry {
        dest_width_px,
        dest_height_px,
        dest_x_dpi,
        dest_y_dpi,
        width_pt,
        height_pt,
    })
}
