pub mod capture;
pub mod decode;
pub mod error;
pub mod math;
pub mod pipeline;
pub mod render;
pub mod scanner;

use std::path::Path;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

pub use capture::{Frame, FrameSource, PixelFormat};
pub use decode::{CodeResult, Decoder, DecoderOptions, Symbology};
pub use error::{Error, Result};
pub use render::{DisplayTarget, RenderMode, Viewport};
pub use scanner::CameraScanner;

use capture::Orientation;

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
    pub render: RenderConfig,
    pub decode: DecodeConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Defaults, overlaid by an optional TOML file, overlaid by `ARGUS__*`
    /// environment variables (`ARGUS__DECODE__POLL_INTERVAL_MS=2`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("ARGUS")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
    pub orientation: Orientation,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            format: PixelFormat::Rgb24,
            orientation: Orientation::Deg0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    /// Camera viewport as a fraction of the screen
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub refresh_hz: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            viewport_width: 1.0,
            viewport_height: 1.0,
            refresh_hz: 60,
        }
    }
}

impl DisplayConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport {
            screen_width: self.width,
            screen_height: self.height,
            rect_width: self.viewport_width,
            rect_height: self.viewport_height,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_hz.max(1) as f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub mode: RenderMode,
    pub display_target: DisplayTarget,
    /// Mirror the camera target into an off-screen texture
    pub offscreen_target: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::Normal,
            display_target: DisplayTarget::Normal,
            offscreen_target: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    pub poll_interval_ms: u64,
    /// Upper bound on joining the worker at shutdown
    pub shutdown_timeout_ms: u64,
    pub options: DecoderOptions,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1,
            shutdown_timeout_ms: 500,
            options: DecoderOptions::default(),
        }
    }
}

impl DecodeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "argus=info".into(),
        }
    }
}

/// Pipeline counters collected by the scanner
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_rendered: u64,
    pub frames_missing: u64,
    pub frames_published: u64,
    pub frames_dropped: u64,
    pub frames_decoded: u64,
    pub results_published: u64,
}
