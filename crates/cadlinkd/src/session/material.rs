//! Materials and render settings.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumString};

/// Default base colour of new materials.
pub const DEFAULT_COLOR: [f64; 4] = [0.8, 0.8, 0.8, 1.0];

/// A named surface material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Unique name.
    pub name: String,
    /// Linear RGBA base colour.
    pub color: [f64; 4],
    /// Metallic factor in `0..=1`.
    pub metallic: f64,
    /// Roughness factor in `0..=1`.
    pub roughness: f64,
}

impl Material {
    /// Builds a material with the default colour and a half-rough dielectric
    /// surface.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: DEFAULT_COLOR,
            metallic: 0.0,
            roughness: 0.5,
        }
    }

    /// Wire representation.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "color": self.color,
            "metallic": self.metallic,
            "roughness": self.roughness,
        })
    }
}

/// Renderer used by `render_image`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum RenderEngine {
    /// Path tracer.
    #[default]
    Cycles,
    /// Real-time rasteriser.
    BlenderEevee,
    /// Next-generation real-time rasteriser.
    BlenderEeveeNext,
    /// Flat preview renderer.
    BlenderWorkbench,
}

/// Output settings for renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Renderer.
    pub engine: RenderEngine,
    /// Base width in pixels.
    pub resolution_x: u32,
    /// Base height in pixels.
    pub resolution_y: u32,
    /// Scale applied to the base resolution.
    pub percentage: u32,
    /// Samples per pixel.
    pub samples: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            engine: RenderEngine::default(),
            resolution_x: 1920,
            resolution_y: 1080,
            percentage: 100,
            samples: 128,
        }
    }
}

impl RenderSettings {
    /// Output size after applying the percentage, never below one pixel.
    #[must_use]
    pub fn output_size(&self) -> (u32, u32) {
        let scale = |base: u32| {
            let scaled = u64::from(base) * u64::from(self.percentage) / 100;
            u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
        };
        (scale(self.resolution_x), scale(self.resolution_y))
    }

    /// Wire representation.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "engine": self.engine.to_string(),
            "resolution_x": self.resolution_x,
            "resolution_y": self.resolution_y,
            "resolution_percentage": self.percentage,
            "samples": self.samples,
        })
    }
}
