use std::f32::consts::FRAC_1_SQRT_2;

use egui::{Pos2, Vec2};
use image::{GrayImage, Luma};

use super::DirtyRect;

/// Offset added to the end of a tap, so a click without movement still leaves a dot.
pub const TAP_NUDGE: f32 = 0.01;

/// Smallest radius the compositor uses. Guarantees the pixel under the pointer is hit.
const MIN_RADIUS: f32 = FRAC_1_SQRT_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BrushMode {
    /// Union with opaque paint ("source-over")
    #[default]
    Paint,
    /// Subtracts the stroke area ("destination-out")
    Erase,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    /// Diameter in raster pixels
    pub width: f32,
    pub mode: BrushMode,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            width: 24.0,
            mode: BrushMode::Paint,
        }
    }
}

impl Brush {
    pub fn new(width: f32, mode: BrushMode) -> Self {
        Self { width, mode }
    }

    fn radius(&self) -> f32 {
        (self.width * 0.5).max(MIN_RADIUS)
    }

    fn value(&self) -> u8 {
        match self.mode {
            BrushMode::Paint => u8::MAX,
            BrushMode::Erase => 0,
        }
    }
}

/// Draws a round-capped segment of `brush.width` from `from` to `to`.
///
/// A pixel belongs to the stroke when its center is within the brush radius of
/// the segment. Covered pixels become fully opaque (paint) or fully transparent
/// (erase), everything else is left as is.
///
/// Returns the pixels that may have changed, `None` if the segment missed the raster.
pub fn composite_segment(
    raster: &mut GrayImage,
    from: Pos2,
    to: Pos2,
    brush: Brush,
) -> Option<DirtyRect> {
    if !(from.is_finite() && to.is_finite()) {
        log::debug!("Ignore segment with non finite coordinates {from:?} -> {to:?}");
        return None;
    }
    let (width, height) = raster.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let radius = brush.radius();
    let min = from.min(to) - Vec2::splat(radius);
    let max = from.max(to) + Vec2::splat(radius);
    let xs = pixel_span(min.x, max.x, width)?;
    let ys = pixel_span(min.y, max.y, height)?;
    let dirty = DirtyRect {
        min: [*xs.start(), *ys.start()],
        max: [*xs.end() + 1, *ys.end() + 1],
    };

    let value = Luma([brush.value()]);
    let radius_sq = radius * radius;
    let direction = to - from;
    let length_sq = direction.length_sq();

    for y in ys {
        for x in xs.clone() {
            let center = Pos2::new(x as f32 + 0.5, y as f32 + 0.5);
            let t = if length_sq > 0.0 {
                ((center - from).dot(direction) / length_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let closest = from + direction * t;
            if (center - closest).length_sq() <= radius_sq {
                raster.put_pixel(x, y, value);
            }
        }
    }
    Some(dirty)
}

/// Pixel indices whose centers may lie within `[min, max]`, clipped to the raster.
fn pixel_span(min: f32, max: f32, len: u32) -> Option<std::ops::RangeInclusive<u32>> {
    let first = min.floor().max(0.0);
    let last = max.ceil().min(len as f32 - 1.0);
    (first <= last).then(|| first as u32..=last as u32)
}
