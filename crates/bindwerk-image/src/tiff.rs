// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TIFF page source — multi-directory TIFF reading via the `tiff` crate.
//
// The decoder hands back raw sample values without photometric
// interpretation, so polarity is normalised here: bitmaps leave this module
// with bit 1 = black regardless of the file's PhotometricInterpretation.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tiff::decoder::{Decoder, DecodingResult};
use tiff::decoder::ifd::Value;
use tiff::tags::Tag;
use tracing::{debug, instrument, warn};

use bindwerk_core::SourcePageInfo;
use bindwerk_core::error::{BindwerkError, Result};

use crate::bitmap::Bitmap;
use crate::source::{PageSource, SourceOpener};

/// TIFF photometric interpretation values for bilevel data.
const PHOTOMETRIC_MIN_IS_WHITE: u16 = 0;

/// TIFF resolution unit: centimetres.
const RESUNIT_CENTIMETER: u16 = 3;

/// Opens TIFF files as [`PageSource`]s.
#[derive(Debug, Clone, Copy)]
pub struct TiffSourceOpener {
    /// Resolution assumed when a directory carries no resolution tags.
    pub default_dpi: f32,
}

impl Default for TiffSourceOpener {
    fn default() -> Self {
        Self { default_dpi: 300.0 }
    }
}

impl SourceOpener for TiffSourceOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn PageSource>> {
        Ok(Box::new(TiffPageSource::open(path, self.default_dpi)?))
    }
}

/// A multi-page TIFF file opened for reading.
#[derive(Debug)]
pub struct TiffPageSource {
    path: PathBuf,
    decoder: Decoder<BufReader<File>>,
    default_dpi: f32,
    page_count: Option<u32>,
}

impl TiffPageSource {
    /// Open a TIFF file, failing if it cannot be read or has no directory.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, default_dpi: f32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|err| BindwerkError::SourceOpen {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|err| BindwerkError::SourceOpen {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        debug!("TIFF opened");
        Ok(Self {
            path,
            decoder,
            default_dpi,
            page_count: None,
        })
    }

    fn seek(&mut self, page: u32) -> Result<()> {
        let count = self.page_count()?;
        if page == 0 || page > count {
            return Err(BindwerkError::PageNotFound {
                path: self.path.display().to_string(),
                page,
            });
        }
        self.decoder
            .seek_to_image((page - 1) as usize)
            .map_err(|err| BindwerkError::SourceRead {
                path: self.path.display().to_string(),
                page,
                reason: err.to_string(),
            })
    }

    fn read_error(&self, page: u32, reason: impl Into<String>) -> BindwerkError {
        BindwerkError::SourceRead {
            path: self.path.display().to_string(),
            page,
            reason: reason.into(),
        }
    }

    /// Metadata of the directory the decoder currently points at.
    fn current_info(&mut self, page: u32) -> Result<SourcePageInfo> {
        let (width_px, height_px) = self
            .decoder
            .dimensions()
            .map_err(|err| self.read_error(page, err.to_string()))?;

        let samples_per_pixel = self.tag_u16(Tag::SamplesPerPixel, page)?.unwrap_or(1);
        let bits_per_sample = self.tag_u16(Tag::BitsPerSample, page)?.unwrap_or(1);
        let planar_config = self.tag_u16(Tag::PlanarConfiguration, page)?.unwrap_or(1);

        // Policy defaults: 300 dpi, inch units, applied before geometry ever
        // sees the page.
        let unit = self.tag_u16(Tag::ResolutionUnit, page)?.unwrap_or(2);
        let scale = if unit == RESUNIT_CENTIMETER { 2.54 } else { 1.0 };
        let x_dpi = self
            .tag_f32(Tag::XResolution, page)?
            .map(|r| r * scale)
            .unwrap_or(self.default_dpi);
        let y_dpi = self
            .tag_f32(Tag::YResolution, page)?
            .map(|r| r * scale)
            .unwrap_or(self.default_dpi);

        Ok(SourcePageInfo {
            width_px,
            height_px,
            x_dpi,
            y_dpi,
            samples_per_pixel,
            bits_per_sample,
            planar_config,
        })
    }

    fn tag_u16(&mut self, tag: Tag, page: u32) -> Result<Option<u16>> {
        let value = self
            .decoder
            .find_tag(tag)
            .map_err(|err| self.read_error(page, err.to_string()))?;
        Ok(value.and_then(value_to_u16))
    }

    fn tag_f32(&mut self, tag: Tag, page: u32) -> Result<Option<f32>> {
        let value = self
            .decoder
            .find_tag(tag)
            .map_err(|err| self.read_error(page, err.to_string()))?;
        Ok(value.and_then(value_to_f32))
    }
}

impl PageSource for TiffPageSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_count(&mut self) -> Result<u32> {
        if let Some(count) = self.page_count {
            return Ok(count);
        }
        self.decoder
            .seek_to_image(0)
            .map_err(|err| self.read_error(1, err.to_string()))?;
        let mut count: u32 = 1;
        while self.decoder.more_images() {
            self.decoder
                .next_image()
                .map_err(|err| self.read_error(count + 1, err.to_string()))?;
            count += 1;
        }
        debug!(pages = count, "counted TIFF directories");
        self.page_count = Some(count);
        Ok(count)
    }

    fn page_info(&mut self, page: u32) -> Result<SourcePageInfo> {
        self.seek(page)?;
        self.current_info(page)
    }

    fn read_page(&mut self, page: u32) -> Result<Bitmap> {
        self.seek(page)?;
        let info = self.current_info(page)?;
        let photometric = self
            .tag_u16(Tag::PhotometricInterpretation, page)?
            .unwrap_or(PHOTOMETRIC_MIN_IS_WHITE);

        let data = match self
            .decoder
            .read_image()
            .map_err(|err| self.read_error(page, err.to_string()))?
        {
            DecodingResult::U8(data) => data,
            _ => {
                return Err(self.read_error(page, "decoder produced a non-8-bit sample buffer"));
            }
        };

        let width = info.width_px;
        let height = info.height_px;
        let packed_stride = width.div_ceil(8) as usize;
        let pixels = width as usize * height as usize;

        // Bilevel data arrives either still packed (one bit per pixel) or
        // expanded to one raw sample value per byte.
        let mut bitmap = if data.len() == packed_stride * height as usize {
            Bitmap::from_packed_rows(width, height, &data, packed_stride)
        } else if data.len() == pixels {
            let mut bitmap = Bitmap::new(width, height);
            for y in 0..height {
                let row = &data[y as usize * width as usize..][..width as usize];
                for (x, sample) in row.iter().enumerate() {
                    if *sample != 0 {
                        bitmap.set(x as u32, y, true);
                    }
                }
            }
            bitmap
        } else {
            warn!(
                len = data.len(),
                expected_packed = packed_stride * height as usize,
                expected_expanded = pixels,
                "unexpected decode buffer size"
            );
            return Err(self.read_error(page, "unexpected decode buffer size"));
        };

        // Normalise polarity to bit 1 = black.
        if photometric != PHOTOMETRIC_MIN_IS_WHITE {
            bitmap.invert();
        }
        Ok(bitmap)
    }
}

fn value_to_u16(value: Value) -> Option<u16> {
    match value {
        Value::Byte(b) => Some(b as u16),
        Value::Short(s) => Some(s),
        Value::Unsigned(u) => u16::try_from(u).ok(),
        Value::List(values) => values.into_iter().next().and_then(value_to_u16),
        _ => None,
    }
}

fn value_to_f32(value: Value) -> Option<f32> {
    match value {
        Value::Rational(n, d) if d != 0 => Some(n as f32 / d as f32),
        Value::Float(f) => Some(f),
        Value::Double(d) => Some(d as f32),
        Value::Byte(b) => Some(b as f32),
        Value::Short(s) => Some(s as f32),
        Value::Unsigned(u) => Some(u as f32),
        Value::List(values) => values.into_iter().next().and_then(value_to_f32),
        _ => None,
    }
}
