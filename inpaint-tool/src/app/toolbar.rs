use mask_editor::{BrushMode, SurfaceState};

use super::InpaintApp;

impl InpaintApp {
    pub(super) fn toolbar_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open image").clicked() {
                self.pick_file();
            }
            ui.add_enabled_ui(self.surface.state() != SurfaceState::Empty, |ui| {
                if ui.button("Unload").clicked() {
                    self.unload();
                }
            });
            ui.label(self.surface.status());
        });

        ui.horizontal(|ui| {
            let range = self.config.brush.range();
            let brush = self.surface.brush_mut();
            ui.add(egui::Slider::new(&mut brush.width, range).text("Brush"));
            ui.selectable_value(&mut brush.mode, BrushMode::Paint, "Draw");
            ui.selectable_value(&mut brush.mode, BrushMode::Erase, "Erase");

            ui.add_enabled_ui(self.surface.state() != SurfaceState::Empty, |ui| {
                if ui.button("Clear mask").clicked() {
                    self.surface.clear();
                }
            });
        });
    }

    pub(super) fn submit_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let in_flight = self.submission.in_flight();
            let enabled = self.surface.state() != SurfaceState::Empty && !in_flight;
            let label = if in_flight { "Removing..." } else { "Remove" };
            if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                self.start_submission();
            }
            if in_flight {
                ui.spinner();
            }
        });
        if let Some(error) = self.submission.error() {
            ui.colored_label(ui.visuals().error_fg_color, error);
        }
    }
}
