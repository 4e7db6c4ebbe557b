pub mod detect;
pub mod display;
pub mod pipeline;
pub mod source;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::display::overlay::OverlayStyle;
use crate::source::CameraFacing;

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub width: u32,
    pub height: u32,
    /// Frames per second the source paces itself to; 0 = unpaced.
    pub fps: u32,
    pub facing: CameraFacing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Depth of the capture -> display preview queue. A full queue evicts
    /// the oldest frame rather than blocking the capture thread.
    pub preview_queue_depth: usize,
    /// Depth of the decode -> display outcome queue.
    pub outcome_queue_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Shown whenever a decode cycle finds nothing.
    pub not_found_message: String,
    pub overlay: OverlayStyle,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            facing: CameraFacing::Back,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preview_queue_depth: 8,
            outcome_queue_depth: 4,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            not_found_message: "No barcode detected".into(),
            overlay: OverlayStyle::default(),
        }
    }
}

impl Config {
    /// Layered load: defaults, then an optional `argus.toml` in the working
    /// directory, then `ARGUS_*` environment overrides (`ARGUS_SOURCE__FPS=15`).
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("argus").required(false))
            .add_source(
                config::Environment::with_prefix("ARGUS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
