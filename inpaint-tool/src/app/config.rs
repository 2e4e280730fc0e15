use egui::Vec2;

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub viewport: Vec2,
    /// Widest the editor is ever drawn, in points
    pub display_max_width: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewport: [1100.0, 800.0].into(),
            display_max_width: 640.0,
        }
    }
}
