// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page transform: fetch one page, rotate it, and re-encode it for embedding.

use bindwerk_core::error::{BindwerkError, Result};
use bindwerk_core::{PageGeometry, PageJob};
use bindwerk_image::fax::ImageEncoder;
use bindwerk_image::rotate::rotate;
use bindwerk_image::source::PageSource;
use tracing::debug;

/// The result of transforming one page: its destination geometry plus the
/// encoded image stream ready for the output router to embed.
#[derive(Debug, Clone)]
pub struct TransformedPage {
    pub geometry: PageGeometry,
    pub encoded: Vec<u8>,
}

/// Run one page job through the pipeline: validate the pixel format, compute
/// geometry, read the page (each scanline exactly once), rotate, encode.
///
/// Buffers are scoped to this call: the source bitmap is dropped as soon as
/// the rotated copy exists, and the rotated bitmap is dropped once encoded.
pub fn transform_page(
    source: &mut dyn PageSource,
    encoder: &dyn ImageEncoder,
    job: &PageJob,
    max_points: u32,
) -> Result<TransformedPage> {
    let count = source.page_count()?;
    if job.page_index == 0 || job.page_index > count {
        return Err(BindwerkError::PageNotFound {
            path: source.path().display().to_string(),
            page: job.page_index,
        });
    }

    let info = source.page_info(job.page_index)?;
    if !info.is_bilevel() {
        return Err(BindwerkError::UnsupportedFormat {
            path: source.path().display().to_string(),
            page: job.page_index,
            reason: format!(
                "samples per pixel {}, bits per sample {}, planar config {} (need 1/1/1)",
                info.samples_per_pixel, info.bits_per_sample, info.planar_config
            ),
        });
    }

    let geometry = crate::geometry::compute(&info, job.rotation, max_points)?;

    let bitmap = source.read_page(job.page_index)?;
    let rotated = rotate(&bitmap, job.rotation);
    drop(bitmap);
    debug_assert_eq!(
        (rotated.width(), rotated.height()),
        (geometry.dest_width_px, geometry.dest_height_px)
    );

    let encoded = encoder.encode(&rotated)?;
    debug!(
        page = job.page_index,
        degrees = job.rotation.degrees(),
        width_pt = geometry.width_pt,
        height_pt = geometry.height_pt,
        encoded_len = encoded.len(),
        "page transformed"
    );

    Ok(TransformedPage { geometry, encoded })
}
