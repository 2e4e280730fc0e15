use egui::{Pos2, Vec2};
use futures::FutureExt;
use log::{debug, info, warn};

use crate::{
    AsyncTask, BoxFuture, Brush, DirtyRect, EncodedImage, MaskRaster, RasterError, SourceImage, TAP_NUDGE,
    decode_oriented, spawn_blocking,
};

const STATUS_EMPTY: &str = "Upload an image.";
const STATUS_LOADING: &str = "Loading image...";
const STATUS_DECODE_FAILED: &str = "Image could not be loaded (check the file format).";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// No decoded image, nothing can be drawn
    Empty,
    Ready,
    /// Pointer is down and strokes are being composited
    Painting,
}

struct Loaded {
    source: SourceImage,
    mask: MaskRaster,
    /// Last stroke position, while the pointer is down
    stroke: Option<Pos2>,
}

/// Owns the source image and its mask raster, and drives the painting state machine.
///
/// Image and mask are only ever replaced together: a new image becomes visible
/// once it has been decoded completely, at which point the mask is reallocated
/// at the new size. A decode that fails leaves the current image untouched.
pub struct MaskSurface {
    loaded: Option<Loaded>,
    decoding: Option<AsyncTask<Result<SourceImage, RasterError>>>,
    brush: Brush,
    status: String,
    image_revision: u64,
    mask_revision: u64,
    /// Area of the mask changed since the last [`MaskSurface::take_dirty`]
    dirty: Option<DirtyRect>,
}

impl Default for MaskSurface {
    fn default() -> Self {
        Self {
            loaded: None,
            decoding: None,
            brush: Brush::default(),
            status: STATUS_EMPTY.into(),
            image_revision: 0,
            mask_revision: 0,
            dirty: None,
        }
    }
}

impl MaskSurface {
    pub fn new(brush: Brush) -> Self {
        Self {
            brush,
            ..Default::default()
        }
    }

    pub fn state(&self) -> SurfaceState {
        match &self.loaded {
            None => SurfaceState::Empty,
            Some(Loaded { stroke: None, .. }) => SurfaceState::Ready,
            Some(Loaded {
                stroke: Some(_), ..
            }) => SurfaceState::Painting,
        }
    }

    /// Human readable description of the last load
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.decoding.is_some()
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.loaded.as_ref().map(|l| &l.source)
    }

    pub fn mask(&self) -> Option<&MaskRaster> {
        self.loaded.as_ref().map(|l| &l.mask)
    }

    pub fn size(&self) -> Option<[u32; 2]> {
        self.source().map(SourceImage::size)
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }

    pub fn brush_mut(&mut self) -> &mut Brush {
        &mut self.brush
    }

    /// Changes whenever a different source image got loaded
    pub fn image_revision(&self) -> u64 {
        self.image_revision
    }

    /// Changes whenever the mask raster got modified
    pub fn mask_revision(&self) -> u64 {
        self.mask_revision
    }

    /// Mask area changed since the last call, `None` if nothing changed.
    pub fn take_dirty(&mut self) -> Option<DirtyRect> {
        self.dirty.take()
    }

    fn mark_dirty(&mut self, area: DirtyRect) {
        self.dirty = Some(match self.dirty {
            Some(dirty) => dirty.union(area),
            None => area,
        });
        self.mask_revision += 1;
    }

    /// Starts decoding `bytes` in the background. Call [`Self::update`] to pick up the result.
    pub fn load(&mut self, bytes: Vec<u8>) {
        info!("Decode image of {} bytes", bytes.len());
        self.load_with(SourceImage::decode_async(bytes));
    }

    pub fn load_with(&mut self, decode: BoxFuture<'static, Result<SourceImage, RasterError>>) {
        self.end_stroke();
        self.status = STATUS_LOADING.into();
        self.decoding = Some(AsyncTask::new(decode));
    }

    /// Polls a pending decode. Returns true if the surface changed.
    pub fn update(&mut self) -> bool {
        let Some(result) = self.decoding.as_mut().and_then(AsyncTask::data) else {
            return false;
        };
        self.decoding = None;
        self.finish_load(result)
    }

    /// Applies the outcome of a decode. Returns true if a new image was installed.
    pub fn finish_load(&mut self, result: Result<SourceImage, RasterError>) -> bool {
        match result {
            Ok(source) => {
                let [w, h] = source.size();
                info!("Loaded image {w}x{h}");
                self.status = format!("Loaded: {w} x {h}px");
                self.loaded = Some(Loaded {
                    source,
                    mask: MaskRaster::new(w, h),
                    stroke: None,
                });
                self.image_revision += 1;
                self.dirty = None;
                self.mark_dirty(DirtyRect::full([w, h]));
                true
            }
            Err(e) => {
                warn!("Image load failed: {e}");
                self.status = STATUS_DECODE_FAILED.into();
                false
            }
        }
    }

    /// Drops image, mask and any pending decode.
    pub fn unload(&mut self) {
        self.decoding = None;
        if self.loaded.take().is_some() {
            self.image_revision += 1;
            self.mask_revision += 1;
            self.dirty = None;
        }
        self.status = STATUS_EMPTY.into();
    }

    pub fn clear(&mut self) {
        if let Some(loaded) = &mut self.loaded {
            info!("Clear mask");
            loaded.mask.clear();
            let full = DirtyRect::full(loaded.mask.size());
            self.mark_dirty(full);
        }
    }

    /// Pointer went down at `pos` (raster coordinates). Leaves a dot even without movement.
    pub fn begin_stroke(&mut self, pos: Pos2) {
        let brush = self.brush;
        let Some(loaded) = &mut self.loaded else {
            return;
        };
        loaded.stroke = Some(pos);
        let area = loaded.mask.stroke(pos, pos + Vec2::splat(TAP_NUDGE), brush);
        if let Some(area) = area {
            self.mark_dirty(area);
        }
    }

    pub fn continue_stroke(&mut self, pos: Pos2) {
        let brush = self.brush;
        let Some(Loaded {
            mask,
            stroke: Some(last),
            ..
        }) = &mut self.loaded
        else {
            return;
        };
        log::trace!("Stroke {last:?} -> {pos:?}");
        let area = mask.stroke(*last, pos, brush);
        *last = pos;
        if let Some(area) = area {
            self.mark_dirty(area);
        }
    }

    /// Pointer released, cancelled or left. Safe to call without an active stroke.
    pub fn end_stroke(&mut self) {
        if let Some(loaded) = &mut self.loaded {
            loaded.stroke = None;
        }
    }

    /// Serializes a snapshot of the mask as PNG.
    ///
    /// The snapshot is taken when this is called. Strokes drawn while the
    /// returned future is pending are not part of the result. Resolves to
    /// `None` if no image is loaded.
    pub fn export_mask(&self) -> BoxFuture<'static, Result<Option<EncodedImage>, RasterError>> {
        match self.mask() {
            Some(mask) => {
                let snapshot = mask.clone();
                debug!("Export mask {:?}", snapshot.size());
                spawn_blocking(move || snapshot.encode_png().map(Some))
            }
            None => futures::future::ready(Ok(None)).boxed(),
        }
    }

    /// Replaces the mask with the alpha channel of `png`, which has to match the image size.
    pub fn import_mask(&mut self, png: &[u8]) -> Result<(), RasterError> {
        let Some(loaded) = &mut self.loaded else {
            debug!("Ignore mask import without image");
            return Ok(());
        };
        let decoded = decode_oriented(png)?;
        let mask = MaskRaster::from_alpha(&decoded);
        let expected = loaded.mask.size();
        if mask.size() != expected {
            return Err(RasterError::SizeMismatch {
                expected,
                actual: mask.size(),
            });
        }
        loaded.mask = mask;
        loaded.stroke = None;
        self.mark_dirty(DirtyRect::full(expected));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::{
        BrushMode,
        image_utils::{png_bytes, rotated_png_bytes},
    };

    fn loaded_surface(width: u32, height: u32) -> MaskSurface {
        let mut surface = MaskSurface::new(Brush::new(4.0, BrushMode::Paint));
        assert!(surface.finish_load(SourceImage::decode(png_bytes(width, height))));
        surface
    }

    fn export(surface: &MaskSurface) -> Option<MaskRaster> {
        block_on(surface.export_mask())
            .unwrap()
            .map(|e| MaskRaster::from_alpha(&image::load_from_memory(&e.bytes).unwrap()))
    }

    #[test]
    fn empty_surface_ignores_drawing() {
        let mut surface = MaskSurface::default();
        surface.begin_stroke(Pos2::new(1.0, 1.0));
        surface.continue_stroke(Pos2::new(2.0, 2.0));
        surface.end_stroke();
        surface.clear();
        assert_eq!(surface.state(), SurfaceState::Empty);
        assert_eq!(surface.mask_revision(), 0);
        assert_eq!(surface.status(), STATUS_EMPTY);
        assert!(export(&surface).is_none());
    }

    #[test]
    fn load_allocates_blank_mask_of_image_size() {
        let surface = loaded_surface(30, 20);
        assert_eq!(surface.state(), SurfaceState::Ready);
        assert_eq!(surface.status(), "Loaded: 30 x 20px");
        let mask = surface.mask().unwrap();
        assert_eq!(mask.size(), [30, 20]);
        assert!(mask.is_blank());
    }

    #[test]
    fn rotated_image_gets_mask_in_viewing_orientation() {
        let mut surface = MaskSurface::default();
        assert!(surface.finish_load(SourceImage::decode(rotated_png_bytes(30, 10))));
        assert_eq!(surface.size(), Some([10, 30]));
        assert_eq!(surface.mask().unwrap().size(), [10, 30]);
    }

    #[test]
    fn dirty_area_follows_changes() {
        let mut surface = loaded_surface(100, 80);
        assert_eq!(surface.take_dirty(), Some(DirtyRect::full([100, 80])));
        assert_eq!(surface.take_dirty(), None);

        surface.begin_stroke(Pos2::new(10.0, 10.0));
        surface.continue_stroke(Pos2::new(40.0, 20.0));
        surface.end_stroke();
        let dirty = surface.take_dirty().unwrap();
        assert!(dirty.contains(10, 10) && dirty.contains(40, 20));
        assert!(!dirty.contains(90, 70));

        surface.clear();
        assert_eq!(surface.take_dirty(), Some(DirtyRect::full([100, 80])));
    }

    #[test]
    fn stroke_cycle_moves_through_states() {
        let mut surface = loaded_surface(40, 40);
        surface.continue_stroke(Pos2::new(5.0, 5.0));
        assert!(surface.mask().unwrap().is_blank());

        surface.begin_stroke(Pos2::new(10.0, 10.0));
        assert_eq!(surface.state(), SurfaceState::Painting);
        assert_eq!(surface.mask().unwrap().coverage(10, 10), Some(255));

        surface.continue_stroke(Pos2::new(30.0, 10.0));
        assert_eq!(surface.mask().unwrap().coverage(20, 10), Some(255));

        surface.end_stroke();
        assert_eq!(surface.state(), SurfaceState::Ready);
        surface.end_stroke();
        assert_eq!(surface.state(), SurfaceState::Ready);

        surface.continue_stroke(Pos2::new(30.0, 30.0));
        assert_eq!(surface.mask().unwrap().coverage(30, 25), Some(0));
    }

    #[test]
    fn brush_mode_is_read_at_stroke_time() {
        let mut surface = loaded_surface(40, 40);
        surface.begin_stroke(Pos2::new(5.0, 20.0));
        surface.continue_stroke(Pos2::new(35.0, 20.0));
        surface.end_stroke();

        surface.brush_mut().mode = BrushMode::Erase;
        surface.begin_stroke(Pos2::new(5.0, 20.0));
        surface.continue_stroke(Pos2::new(35.0, 20.0));
        surface.end_stroke();
        assert!(surface.mask().unwrap().is_blank());
    }

    #[test]
    fn clear_while_painting_keeps_stroke() {
        let mut surface = loaded_surface(20, 20);
        surface.begin_stroke(Pos2::new(3.0, 3.0));
        surface.clear();
        assert_eq!(surface.state(), SurfaceState::Painting);
        assert!(surface.mask().unwrap().is_blank());
    }

    #[test]
    fn clear_exports_transparent_mask_of_image_size() {
        let mut surface = loaded_surface(25, 15);
        surface.begin_stroke(Pos2::new(12.0, 7.0));
        surface.end_stroke();
        surface.clear();
        let exported = export(&surface).unwrap();
        assert_eq!(exported.size(), [25, 15]);
        assert!(exported.is_blank());
    }

    #[test]
    fn export_is_a_snapshot() {
        let mut surface = loaded_surface(20, 20);
        surface.begin_stroke(Pos2::new(5.0, 5.0));
        let pending = surface.export_mask();
        surface.continue_stroke(Pos2::new(15.0, 15.0));
        surface.end_stroke();

        let exported = block_on(pending).unwrap().unwrap();
        let exported = MaskRaster::from_alpha(&image::load_from_memory(&exported.bytes).unwrap());
        assert_eq!(exported.coverage(5, 5), Some(255));
        assert_eq!(exported.coverage(15, 15), Some(0));
        assert_eq!(surface.mask().unwrap().coverage(15, 15), Some(255));
    }

    #[test]
    fn failed_decode_keeps_current_image() {
        let mut surface = loaded_surface(10, 10);
        surface.begin_stroke(Pos2::new(4.0, 4.0));
        surface.end_stroke();
        let before = surface.mask().unwrap().clone();

        assert!(!surface.finish_load(SourceImage::decode(b"nope".to_vec())));
        assert_eq!(surface.status(), STATUS_DECODE_FAILED);
        assert_eq!(surface.size(), Some([10, 10]));
        assert_eq!(surface.mask(), Some(&before));
    }

    #[test]
    fn new_image_resets_mask() {
        let mut surface = loaded_surface(10, 10);
        surface.begin_stroke(Pos2::new(4.0, 4.0));
        assert!(surface.finish_load(SourceImage::decode(png_bytes(12, 8))));
        assert_eq!(surface.state(), SurfaceState::Ready);
        assert_eq!(surface.mask().unwrap().size(), [12, 8]);
        assert!(surface.mask().unwrap().is_blank());
    }

    #[test]
    fn background_load_is_picked_up_by_update() {
        let mut surface = MaskSurface::default();
        surface.load(png_bytes(9, 7));
        assert_eq!(surface.status(), STATUS_LOADING);
        assert_eq!(surface.state(), SurfaceState::Empty);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while !surface.update() {
            assert!(std::time::Instant::now() < deadline, "decode never finished");
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert!(!surface.is_loading());
        assert_eq!(surface.size(), Some([9, 7]));
    }

    #[test]
    fn unload_returns_to_empty() {
        let mut surface = loaded_surface(10, 10);
        surface.load(png_bytes(3, 3));
        surface.unload();
        assert_eq!(surface.state(), SurfaceState::Empty);
        assert!(!surface.is_loading());
        assert_eq!(surface.status(), STATUS_EMPTY);
    }

    #[test]
    fn import_mask_requires_matching_size() {
        let mut painted = MaskRaster::new(16, 16);
        painted.stroke(Pos2::new(2.0, 2.0), Pos2::new(14.0, 14.0), Brush::default());
        let png = painted.encode_png().unwrap();

        let mut surface = loaded_surface(16, 16);
        surface.import_mask(&png.bytes).unwrap();
        assert_eq!(surface.mask(), Some(&painted));

        let mut other = loaded_surface(8, 16);
        assert!(matches!(
            other.import_mask(&png.bytes),
            Err(RasterError::SizeMismatch {
                expected: [8, 16],
                actual: [16, 16]
            })
        ));
    }
}
