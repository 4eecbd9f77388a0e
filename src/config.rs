use serde::{Deserialize, Serialize};

use crate::error::{CanvasError, CanvasResult};
use crate::generation::StaleResultPolicy;
use crate::input::Tool;
use crate::raster::Rgba;

pub const HISTORY_LIMIT: usize = 20;
pub const ZOOM_STEP: f64 = 1.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasPreset {
    Square512,
    Square768,
    #[default]
    Square1024,
    Wide1024x576,
    Square2048,
    Uhd3840x2160,
}

impl CanvasPreset {
    pub fn all() -> &'static [CanvasPreset] {
        &[
            CanvasPreset::Square512,
            CanvasPreset::Square768,
            CanvasPreset::Square1024,
            CanvasPreset::Wide1024x576,
            CanvasPreset::Square2048,
            CanvasPreset::Uhd3840x2160,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            CanvasPreset::Square512 => "512x512",
            CanvasPreset::Square768 => "768x768",
            CanvasPreset::Square1024 => "1024x1024",
            CanvasPreset::Wide1024x576 => "1024x576",
            CanvasPreset::Square2048 => "2048x2048",
            CanvasPreset::Uhd3840x2160 => "3840x2160",
        }
    }

    /// Accepts either the label (`"1024x576"`) or the serde name (`"wide1024x576"`).
    pub fn parse(s: &str) -> CanvasResult<Self> {
        let s = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|p| p.label() == s)
            .or_else(|| serde_json::from_value(serde_json::Value::String(s.to_string())).ok())
            .ok_or_else(|| CanvasError::config(format!("unknown canvas preset {s:?}")))
    }
}

impl From<CanvasPreset> for CanvasConfig {
    fn from(preset: CanvasPreset) -> Self {
        let (width, height) = match preset {
            CanvasPreset::Square512 => (512, 512),
            CanvasPreset::Square768 => (768, 768),
            CanvasPreset::Square1024 => (1024, 1024),
            CanvasPreset::Wide1024x576 => (1024, 576),
            CanvasPreset::Square2048 => (2048, 2048),
            CanvasPreset::Uhd3840x2160 => (3840, 2160),
        };
        CanvasConfig { width, height }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub preset: CanvasPreset,
    pub background: Rgba,
    pub brush_color: Rgba,
    pub brush_radius: f32,
    pub mask_color: Rgba,
    pub history_limit: usize,
    pub zoom_step: f64,
    pub stale_results: StaleResultPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preset: CanvasPreset::default(),
            background: [255, 255, 255, 255],
            brush_color: [0, 0, 0, 255],
            brush_radius: 6.0,
            mask_color: [255, 0, 0, 128],
            history_limit: HISTORY_LIMIT,
            zoom_step: ZOOM_STEP,
            stale_results: StaleResultPolicy::default(),
        }
    }
}

/// The slice of editor state the surrounding shell may persist between sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub brush_size: f32,
    pub last_tool: Tool,
    pub preset: CanvasPreset,
}

impl Settings {
    pub fn to_json(&self) -> CanvasResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CanvasError::config(format!("failed to serialize settings: {e}")))
    }

    pub fn from_json(json: &str) -> CanvasResult<Self> {
        serde_json::from_str(json).map_err(|e| CanvasError::config(format!("failed to parse settings: {e}")))
    }
}
