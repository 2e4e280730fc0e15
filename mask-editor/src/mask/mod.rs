use std::io::Cursor;

use egui::Pos2;
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgba, RgbaImage};

use crate::{EncodedImage, RasterError};

mod stroke;

pub use stroke::*;

#[derive(Debug, Eq, PartialEq, Clone)]
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MaskSettings {
    /// Opacity of painted pixels on screen. The exported mask is always fully opaque.
    pub overlay_opacity: u8,
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self {
            overlay_opacity: 160,
        }
    }
}

/// Pixel area `min..max` (exclusive) that changed on a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub min: [u32; 2],
    pub max: [u32; 2],
}

impl DirtyRect {
    pub fn full([width, height]: [u32; 2]) -> Self {
        Self {
            min: [0, 0],
            max: [width, height],
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.min[0]..self.max[0]).contains(&x) && (self.min[1]..self.max[1]).contains(&y)
    }
}

/// Single channel coverage raster. 0 keeps a pixel, 255 marks it for removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskRaster(GrayImage);

impl MaskRaster {
    pub fn new(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    pub fn size(&self) -> [u32; 2] {
        let (w, h) = self.0.dimensions();
        [w, h]
    }

    pub fn coverage(&self, x: u32, y: u32) -> Option<u8> {
        self.0.get_pixel_checked(x, y).map(|Luma([v])| *v)
    }

    pub fn is_blank(&self) -> bool {
        self.0.as_raw().iter().all(|v| *v == 0)
    }

    pub fn clear(&mut self) {
        for Luma([v]) in self.0.pixels_mut() {
            *v = 0;
        }
    }

    pub fn stroke(&mut self, from: Pos2, to: Pos2, brush: Brush) -> Option<DirtyRect> {
        composite_segment(&mut self.0, from, to, brush)
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    /// Takes the alpha channel of `image` as coverage
    pub fn from_alpha(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (w, h) = rgba.dimensions();
        Self(GrayImage::from_fn(w, h, |x, y| {
            let Rgba([_, _, _, a]) = *rgba.get_pixel(x, y);
            Luma([a])
        }))
    }

    /// White where painted, coverage as alpha. Same look as an opaque white brush on a cleared canvas.
    pub fn to_rgba(&self) -> RgbaImage {
        let (w, h) = self.0.dimensions();
        RgbaImage::from_fn(w, h, |x, y| {
            let Luma([v]) = *self.0.get_pixel(x, y);
            Rgba([255, 255, 255, v])
        })
    }

    pub fn encode_png(&self) -> Result<EncodedImage, RasterError> {
        encode_rgba_png(&self.to_rgba())
    }
}

pub(crate) fn encode_rgba_png(image: &RgbaImage) -> Result<EncodedImage, RasterError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(RasterError::Encoding)?;
    Ok(EncodedImage {
        bytes,
        format: ImageFormat::Png,
        size: [image.width(), image.height()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_raster_is_blank() {
        let raster = MaskRaster::new(7, 3);
        assert_eq!(raster.size(), [7, 3]);
        assert!(raster.is_blank());
        assert_eq!(raster.coverage(7, 0), None);
    }

    #[test]
    fn clear_keeps_dimensions() {
        let mut raster = MaskRaster::new(16, 9);
        raster.stroke(
            Pos2::new(1.0, 1.0),
            Pos2::new(14.0, 7.0),
            Brush::new(3.0, BrushMode::Paint),
        );
        assert!(!raster.is_blank());
        raster.clear();
        assert!(raster.is_blank());
        assert_eq!(raster.size(), [16, 9]);
    }

    #[test]
    fn png_keeps_coverage_in_alpha() {
        let mut raster = MaskRaster::new(12, 12);
        raster.stroke(
            Pos2::new(6.0, 6.0),
            Pos2::new(6.01, 6.01),
            Brush::new(4.0, BrushMode::Paint),
        );
        let encoded = raster.encode_png().unwrap();
        assert_eq!(encoded.format, ImageFormat::Png);
        assert_eq!(encoded.size, [12, 12]);

        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(MaskRaster::from_alpha(&decoded), raster);
        assert_eq!(decoded.to_rgba8().get_pixel(6, 6).0, [255, 255, 255, 255]);
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0[3], 0);
    }
}
