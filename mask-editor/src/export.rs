use std::sync::Arc;

use image::{DynamicImage, imageops::FilterType};

use crate::{
    BoxFuture, EncodedImage, RasterError, decode_oriented, encode_jpeg, mask::encode_rgba_png,
    spawn_blocking,
};

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExportSettings {
    /// Longest side of the exported pair in pixels
    pub max_side: u32,
    /// JPEG quality (1-100) of the exported image
    pub jpeg_quality: u8,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            max_side: 1536,
            jpeg_quality: 85,
        }
    }
}

impl ExportSettings {
    pub fn new(max_side: u32, jpeg_quality: u8) -> Self {
        Self {
            max_side,
            jpeg_quality,
        }
    }
}

/// Target resolution shared by image and mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSize {
    pub width: u32,
    pub height: u32,
}

impl ExportSize {
    /// Scales `original` down until its longest side is at most `max_side`.
    /// Never upscales, and never returns a zero length side.
    pub fn fit([width, height]: [u32; 2], max_side: u32) -> Self {
        let longest = width.max(height);
        let scale = if longest == 0 {
            1.0
        } else {
            (max_side as f64 / longest as f64).min(1.0)
        };
        let scaled = |len: u32| ((len as f64 * scale).round() as u32).max(1);
        Self {
            width: scaled(width),
            height: scaled(height),
        }
    }

    pub fn as_array(&self) -> [u32; 2] {
        [self.width, self.height]
    }
}

/// Image and mask, resampled to the same size and encoded for transmission.
#[derive(Debug, Clone)]
pub struct ExportPair {
    pub image: EncodedImage,
    pub mask: EncodedImage,
    pub size: ExportSize,
}

/// Decodes the original file and the exported mask, then resamples both to one
/// [`ExportSize`] derived from the original image.
pub fn export_pair(
    source: &[u8],
    mask_png: &[u8],
    settings: &ExportSettings,
) -> Result<ExportPair, RasterError> {
    let image = decode_oriented(source)?;
    let mask = decode_oriented(mask_png)?;

    let size = ExportSize::fit([image.width(), image.height()], settings.max_side);
    log::debug!(
        "Export {}x{} -> {}x{}",
        image.width(),
        image.height(),
        size.width,
        size.height
    );

    let image = encode_jpeg(
        &resample(image, size, FilterType::CatmullRom),
        settings.jpeg_quality,
    )?;
    // Mask follows the image size, even if it got out of sync with the source
    let mask = encode_rgba_png(&resample(mask, size, FilterType::Triangle).to_rgba8())?;

    Ok(ExportPair { image, mask, size })
}

pub fn export_pair_async(
    source: Arc<[u8]>,
    mask: EncodedImage,
    settings: ExportSettings,
) -> BoxFuture<'static, Result<ExportPair, RasterError>> {
    spawn_blocking(move || export_pair(&source, &mask.bytes, &settings))
}

fn resample(image: DynamicImage, size: ExportSize, filter: FilterType) -> DynamicImage {
    if (image.width(), image.height()) == (size.width, size.height) {
        image
    } else {
        image.resize_exact(size.width, size.height, filter)
    }
}
