use mask_editor::{ExportSettings, MaskSettings};

#[derive(serde::Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    /// Url the image and mask are posted to
    pub endpoint: String,
    pub timeout_secs: u64,
    pub export: ExportSettings,
    pub hd_strategy: HdStrategy,
    pub brush: BrushConfig,
    pub mask: MaskSettings,
    pub egui: crate::app::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8090/api/v1/inpaint".into(),
            timeout_secs: 120,
            export: Default::default(),
            hd_strategy: Default::default(),
            brush: Default::default(),
            mask: Default::default(),
            egui: Default::default(),
        }
    }
}

/// How the service treats images larger than its model resolution
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HdStrategy {
    #[default]
    Crop,
    Resize,
    Original,
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BrushConfig {
    pub default_size: f32,
    pub min_size: f32,
    pub max_size: f32,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            default_size: 24.0,
            min_size: 4.0,
            max_size: 80.0,
        }
    }
}

impl BrushConfig {
    pub fn range(&self) -> std::ops::RangeInclusive<f32> {
        let min = self.min_size.max(0.0);
        min..=self.max_size.max(min)
    }

    pub fn initial_size(&self) -> f32 {
        let range = self.range();
        self.default_size.clamp(*range.start(), *range.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.endpoint, "http://127.0.0.1:8090/api/v1/inpaint");
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.export, ExportSettings::default());
        assert_eq!(config.hd_strategy, HdStrategy::Crop);
        assert_eq!(config.brush, BrushConfig::default());
        assert_eq!(config.egui.display_max_width, 640.0);
    }

    #[test]
    fn partial_sections_are_merged_with_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "endpoint": "https://inpaint.example.com/run",
                "export": { "jpeg_quality": 70 },
                "brush": { "max_size": 120 },
                "egui": { "viewport": [1200.0, 900.0] }
            }"#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "https://inpaint.example.com/run");
        assert_eq!(config.export, ExportSettings::new(1536, 70));
        assert_eq!(config.brush.max_size, 120.0);
        assert_eq!(config.brush.default_size, 24.0);
        assert_eq!(config.egui.viewport, egui::Vec2::new(1200.0, 900.0));
    }

    #[test]
    fn brush_size_is_kept_in_range() {
        let brush = BrushConfig {
            default_size: 200.0,
            min_size: 4.0,
            max_size: 80.0,
        };
        assert_eq!(brush.initial_size(), 80.0);

        let inverted = BrushConfig {
            default_size: 10.0,
            min_size: 30.0,
            max_size: 5.0,
        };
        assert_eq!(inverted.range(), 30.0..=30.0);
        assert_eq!(inverted.initial_size(), 30.0);
    }
}
