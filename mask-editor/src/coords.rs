use egui::{Pos2, Rect, Vec2};

/// Scale between the on-screen rect of the surface and the raster behind it.
///
/// Built fresh from the current layout for every pointer event. Each axis is
/// scaled on its own, keeping the aspect ratio is up to whoever lays out the rect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayTransform {
    origin: Pos2,
    scale: Vec2,
}

impl DisplayTransform {
    /// `None` if the rect has collapsed to zero width or height.
    pub fn new(rendered: Rect, raster_size: [u32; 2]) -> Option<Self> {
        let size = rendered.size();
        if !(size.x > 0.0 && size.y > 0.0) {
            return None;
        }
        Some(Self {
            origin: rendered.min,
            scale: Vec2::new(raster_size[0] as f32 / size.x, raster_size[1] as f32 / size.y),
        })
    }

    /// Raster pixels per screen point, per axis
    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    pub fn to_raster(&self, pointer: Pos2) -> Pos2 {
        ((pointer - self.origin) * self.scale).to_pos2()
    }
}

/// Maps a pointer position in viewport coordinates onto raster pixel coordinates.
pub fn to_raster_pos(pointer: Pos2, rendered: Rect, raster_size: [u32; 2]) -> Option<Pos2> {
    DisplayTransform::new(rendered, raster_size).map(|t| t.to_raster(pointer))
}
