//! Render settings.
//!
//! Every field has a default, so a JSON document only needs to name the
//! settings it changes.

use lux_core::Color;
use lux_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Constant sky/ground split seen by rays that leave the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Radiance for directions with `y >= 0`
    pub sky: Color,
    /// Radiance for directions with `y < 0`
    pub ground: Color,
}

impl Environment {
    /// No light from outside the scene.
    pub const BLACK: Environment = Environment {
        sky: Color::ZERO,
        ground: Color::ZERO,
    };

    pub fn uniform(radiance: Color) -> Self {
        Self {
            sky: radiance,
            ground: radiance,
        }
    }

    #[inline]
    pub fn radiance(&self, direction: Vec3) -> Color {
        if direction.y >= 0.0 {
            self.sky
        } else {
            self.ground
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            sky: Color::new(0.6, 0.7, 0.9),
            ground: Color::new(0.2, 0.2, 0.2),
        }
    }
}

/// What each pixel records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Full light transport
    #[default]
    PathTracing,
    /// Distance to the first hit, the far clip distance on a miss
    Depth,
    /// Shading normal remapped to `[0, 1]`
    Normal,
    /// Base color of the first hit
    Albedo,
}

/// Settings for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Camera rays per pixel
    pub samples_per_pixel: u32,
    /// Maximum number of path segments
    pub max_depth: u32,
    /// Bounce from which Russian roulette may end a path
    pub russian_roulette_depth: u32,
    /// Seed of every per-pixel random stream
    pub seed: u64,
    /// Jitter camera rays inside the pixel instead of using its center
    pub jitter: bool,
    /// Edge length of a render bucket in pixels
    pub bucket_size: u32,
    /// Worker threads; `None` uses the global rayon pool
    pub threads: Option<usize>,
    pub mode: RenderMode,
    pub environment: Environment,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 16,
            max_depth: 8,
            russian_roulette_depth: 3,
            seed: 0,
            jitter: true,
            bucket_size: 32,
            threads: None,
            mode: RenderMode::PathTracing,
            environment: Environment::default(),
        }
    }
}

impl RenderConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> RenderResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty-printed JSON form.
    pub fn to_json(&self) -> RenderResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the number of camera samples per pixel.
    pub fn with_samples(mut self, samples_per_pixel: u32) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self
    }

    /// Set the maximum number of path segments.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set what each camera ray records.
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the radiance seen by rays that escape the scene.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the seed all pixel streams derive from.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject settings that cannot produce an image.
    pub fn validate(&self) -> RenderResult<()> {
        if self.samples_per_pixel == 0 {
            return Err(RenderError::InvalidConfig("samples_per_pixel must be at least 1"));
        }
        if self.max_depth == 0 {
            return Err(RenderError::InvalidConfig("max_depth must be at least 1"));
        }
        if self.bucket_size == 0 {
            return Err(RenderError::InvalidConfig("bucket_size must be at least 1"));
        }
        if self.threads == Some(0) {
            return Err(RenderError::InvalidConfig("threads must be at least 1"));
        }
        Ok(())
    }
}
