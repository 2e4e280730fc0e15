use std::{path::PathBuf, sync::Arc};

use egui::{ColorImage, TextureHandle, TextureOptions};
use image::ImageError;
use log::{info, warn};
use mask_editor::{Brush, BrushMode, MaskCanvas, MaskSurface, RasterError, SourceImage, spawn_blocking};

use crate::{InpaintService, Submission, submit};

mod config;
mod native;
mod toolbar;

pub use config::Config;
pub use native::run_native;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif"];

pub(crate) struct InpaintApp {
    config: crate::Config,
    service: Arc<dyn InpaintService + Send + Sync>,
    surface: MaskSurface,
    canvas: MaskCanvas,
    submission: Submission,
    result_texture: Option<(u64, TextureHandle)>,
    save_error: Option<String>,
}

impl InpaintApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: crate::Config,
        service: Arc<dyn InpaintService + Send + Sync>,
        initial_image: Option<PathBuf>,
    ) -> Self {
        let brush = Brush::new(config.brush.initial_size(), BrushMode::Paint);
        let mut app = Self {
            canvas: MaskCanvas::new(config.egui.display_max_width, config.mask.clone()),
            surface: MaskSurface::new(brush),
            service,
            submission: Submission::default(),
            result_texture: None,
            save_error: None,
            config,
        };
        if let Some(path) = initial_image {
            app.open(path);
        }
        app
    }

    fn open(&mut self, path: PathBuf) {
        info!("Open {path:?}");
        self.submission.reset();
        self.surface.load_with(spawn_blocking(move || {
            let bytes = std::fs::read(&path).map_err(|e| RasterError::Decode(ImageError::IoError(e)))?;
            SourceImage::decode(bytes)
        }));
    }

    fn pick_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .set_title("Open Image")
            .pick_file()
        {
            self.open(path);
        }
    }

    fn unload(&mut self) {
        self.surface.unload();
        self.submission.reset();
    }

    fn start_submission(&mut self) {
        let job = submit(
            &self.surface,
            self.service.clone(),
            self.config.export.clone(),
            self.config.hd_strategy,
        );
        self.submission.start(job);
    }

    fn save_result(&mut self) {
        let Some(result) = self.submission.result() else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .set_file_name("result.png")
            .save_file()
        else {
            return;
        };
        self.save_error = match std::fs::write(&path, &result.bytes()[..]) {
            Ok(()) => {
                info!("Saved result to {path:?}");
                None
            }
            Err(e) => {
                warn!("Saving result to {path:?} failed: {e}");
                Some(format!("Error during save: {e}"))
            }
        };
    }

    fn result_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Result");
        let Some(result) = self.submission.result() else {
            self.result_texture = None;
            ui.label("No result.");
            return;
        };

        let revision = self.submission.revision();
        if !matches!(&self.result_texture, Some((rev, _)) if *rev == revision) {
            let image = color_image(result);
            // Replacing the handle frees the texture of the previous result
            self.result_texture = Some((
                revision,
                ui.ctx().load_texture("Result", image, TextureOptions::default()),
            ));
        }
        if let Some((_, handle)) = &self.result_texture {
            ui.add(egui::Image::new(handle).max_width(self.config.egui.display_max_width));
        }
        if ui.button("Save").clicked() {
            self.save_result();
        }
        if let Some(e) = &self.save_error {
            ui.colored_label(ui.visuals().error_fg_color, e);
        }
    }
}

impl eframe::App for InpaintApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.submission.poll();
        if self.submission.in_flight() {
            ctx.request_repaint();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Object removal");
                self.toolbar_ui(ui);
                ui.separator();
                self.canvas.ui(ui, &mut self.surface);
                self.submit_ui(ui);
                ui.separator();
                self.result_ui(ui);
            });
        });
    }
}

fn color_image(image: &SourceImage) -> ColorImage {
    let rgba = image.image().to_rgba8();
    ColorImage::from_rgba_unmultiplied([rgba.width() as usize, rgba.height() as usize], rgba.as_raw())
}
