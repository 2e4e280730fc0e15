use std::ops::Range;

use egui::{
    self, Align2, Color32, ColorImage, CursorIcon, FontId, Pos2, Rect, Sense, Stroke, TextureHandle,
    TextureOptions, Vec2,
};
use image::imageops::FilterType;

use crate::{
    DirtyRect, DisplayTransform, ExportSize, MaskRaster, MaskSettings, MaskSurface, SurfaceState,
    to_raster_pos,
};

/// Height of the placeholder shown before an image is loaded
const PLACEHOLDER_HEIGHT: f32 = 360.0;
/// Upper bound for the side length of on-screen textures. Painting always happens at full resolution.
const PREVIEW_MAX_SIDE: u32 = 2048;

/// Renders the source image with the mask on top and forwards pointer input to a [`MaskSurface`].
pub struct MaskCanvas {
    max_width: f32,
    image_texture: Option<(u64, TextureHandle)>,
    mask_texture: Option<(u64, TextureHandle)>,
    opacity_lut: [u8; 256],
}

impl MaskCanvas {
    pub fn new(max_width: f32, settings: MaskSettings) -> Self {
        Self {
            max_width,
            image_texture: None,
            mask_texture: None,
            opacity_lut: build_opacity_lut(settings.overlay_opacity),
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, surface: &mut MaskSurface) -> egui::Response {
        if surface.update() {
            ui.ctx().request_repaint();
        }
        if surface.is_loading() {
            ui.ctx().request_repaint();
        }

        let size = display_size(surface.size(), self.max_width, ui.available_width());
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let painter = ui.painter().with_clip_rect(rect);
        painter.rect_filled(rect, 4.0, ui.visuals().extreme_bg_color);

        let Some(transform) = surface
            .size()
            .and_then(|raster_size| DisplayTransform::new(rect, raster_size))
        else {
            self.image_texture = None;
            self.mask_texture = None;
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                surface.status(),
                FontId::default(),
                ui.visuals().weak_text_color(),
            );
            return response;
        };

        handle_pointer(ui, &response, rect, surface);
        self.refresh_textures(ui.ctx(), surface);

        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
        for (_, texture) in self.image_texture.iter().chain(self.mask_texture.iter()) {
            painter.image(texture.id(), rect, uv, Color32::WHITE);
        }

        if let Some(hover) = response.hover_pos() {
            let radius = surface.brush().width * 0.5 / transform.scale().x;
            painter.circle_stroke(hover, radius, Stroke::new(1.0, Color32::WHITE));
        }
        response.on_hover_cursor(CursorIcon::Crosshair)
    }

    fn refresh_textures(&mut self, ctx: &egui::Context, surface: &mut MaskSurface) {
        let dirty = surface.take_dirty();
        let (Some(source), Some(mask)) = (surface.source(), surface.mask()) else {
            return;
        };
        let max_side = ctx
            .input(|i| i.max_texture_side)
            .min(PREVIEW_MAX_SIDE as usize) as u32;
        let preview = ExportSize::fit(source.size(), max_side);
        let texture_options = TextureOptions {
            magnification: egui::TextureFilter::Nearest,
            ..Default::default()
        };

        if !matches!(&self.image_texture, Some((rev, _)) if *rev == surface.image_revision()) {
            log::debug!("Upload image preview {preview:?}");
            let rgba = source
                .image()
                .resize_exact(preview.width, preview.height, FilterType::Triangle)
                .to_rgba8();
            let image = ColorImage::from_rgba_unmultiplied(
                [rgba.width() as usize, rgba.height() as usize],
                rgba.as_raw(),
            );
            let handle = ctx.load_texture("Source", image, texture_options);
            self.image_texture = Some((surface.image_revision(), handle));
        }

        if !matches!(&self.mask_texture, Some((rev, _)) if *rev == surface.mask_revision()) {
            let revision = surface.mask_revision();
            match (&mut self.mask_texture, dirty) {
                (Some((rev, handle)), Some(dirty))
                    if handle.size() == [preview.width as usize, preview.height as usize] =>
                {
                    let region = preview_region(dirty, mask.size(), preview);
                    if !region[0].is_empty() && !region[1].is_empty() {
                        log::trace!("Update mask preview {region:?}");
                        let pos = [region[0].start, region[1].start];
                        let image = overlay_image(&self.opacity_lut, mask, preview, region);
                        handle.set_partial(pos, image, texture_options);
                    }
                    *rev = revision;
                }
                _ => {
                    let full = [0..preview.width as usize, 0..preview.height as usize];
                    let image = overlay_image(&self.opacity_lut, mask, preview, full);
                    let handle = ctx.load_texture("Mask", image, texture_options);
                    self.mask_texture = Some((revision, handle));
                }
            }
        }
    }
}

fn handle_pointer(ui: &egui::Ui, response: &egui::Response, rect: Rect, surface: &mut MaskSurface) {
    let Some(raster_size) = surface.size() else {
        return;
    };
    let (pressed, down, latest) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_down(),
            i.pointer.latest_pos(),
        )
    });

    let positions = latest.and_then(|pos| Some((pos, to_raster_pos(pos, rect, raster_size)?)));
    match (surface.state(), positions) {
        (SurfaceState::Ready, Some((pos, raster)))
            if pressed && response.hovered() && rect.contains(pos) =>
        {
            surface.begin_stroke(raster);
        }
        // Keeps following the pointer outside of the rect until it is released
        (SurfaceState::Painting, Some((_, raster))) if down => {
            surface.continue_stroke(raster);
        }
        (SurfaceState::Painting, _) => surface.end_stroke(),
        _ => {}
    }
}

/// On-screen size of the surface.
///
/// No wider than `max_width`, the image itself or the available space. The height
/// follows the aspect ratio of the image.
pub fn display_size(image_size: Option<[u32; 2]>, max_width: f32, available_width: f32) -> Vec2 {
    let max_width = max_width.min(available_width).max(1.0);
    match image_size {
        Some([w, h]) if w > 0 && h > 0 => {
            let width = max_width.min(w as f32);
            Vec2::new(width, (width * h as f32 / w as f32).round().max(1.0))
        }
        _ => Vec2::new(max_width, PLACEHOLDER_HEIGHT),
    }
}

/// Preview pixels that sample from the raster area `dirty`.
fn preview_region(dirty: DirtyRect, raster_size: [u32; 2], preview: ExportSize) -> [Range<usize>; 2] {
    let span = |axis: usize, preview_len: u32| {
        let scale = preview_len as f64 / raster_size[axis].max(1) as f64;
        let start = (dirty.min[axis] as f64 * scale).floor() as usize;
        let end = ((dirty.max[axis] as f64 * scale).ceil() as usize).min(preview_len as usize);
        start.min(end)..end
    };
    [span(0, preview.width), span(1, preview.height)]
}

/// Overlay pixels of `region` within a preview of `preview` size, sampled nearest neighbour.
fn overlay_image(
    lut: &[u8; 256],
    mask: &MaskRaster,
    preview: ExportSize,
    [xs, ys]: [Range<usize>; 2],
) -> ColorImage {
    let [width, height] = mask.size();
    let sample = |p: usize, preview_len: u32, raster_len: u32| {
        (((p as f64 + 0.5) * raster_len as f64 / preview_len as f64) as u32).min(raster_len - 1)
    };
    let gray = mask.as_gray();
    let mut pixels = Vec::with_capacity(xs.len() * ys.len());
    for y in ys.clone() {
        let ry = sample(y, preview.height, height);
        for x in xs.clone() {
            let a = lut[gray.get_pixel(sample(x, preview.width, width), ry).0[0] as usize];
            pixels.push(Color32::from_rgba_premultiplied(a, a, a, a));
        }
    }
    ColorImage {
        size: [xs.len(), ys.len()],
        pixels,
    }
}

fn build_opacity_lut(opacity: u8) -> [u8; 256] {
    std::array::from_fn(|i| ((i as u32 * opacity as u32 + 127) / 255) as u8)
}
