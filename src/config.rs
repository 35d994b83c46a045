//! Configuration constants and settings for the tracking bridge
//!
//! Fixed parameters (scheme name, codec settings, simulator rates) live here as
//! constants. Values a deployment may reasonably change are collected in
//! [`BridgeConfig`], which can be loaded from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Custom URI scheme serving encoded camera frames (`arframe://frame`)
pub const FRAME_SCHEME: &str = "arframe";

/// Environment variable naming an optional JSON config file
pub const CONFIG_ENV_VAR: &str = "ARBRIDGE_CONFIG";

/// Image compression settings
pub mod compression {
    /// JPEG quality level (0-100, higher = better quality but larger size)
    pub const JPEG_QUALITY: u8 = 85;

    /// Fixed downscale applied after cropping, in both axes
    pub const DOWNSCALE_FACTOR: u32 = 2;
}

/// Values reported to the page
pub mod session {
    /// Ambient light intensity used when the tracker has no estimate
    pub const DEFAULT_LIGHT_INTENSITY: f64 = 1000.0;

    /// World mapping is not tracked, so the status is constant
    pub const WORLD_MAPPING_STATUS: &str = "ar_worldmapping_not_available";

    /// Reply sent for `initAR`
    pub const DEVICE_ID: &str = "arbridge-desktop";

    /// Callback name the injected error hook uses on the `initAR` channel
    pub const ERROR_BRIDGE_CALLBACK: &str = "console_error_bridge";
}

/// Simulated tracker settings
pub mod simulator {
    /// Samples per second delivered by the simulated tracker
    pub const SAMPLE_RATE_HZ: f64 = 60.0;

    /// Sensor-native (landscape) camera resolution
    pub const CAMERA_WIDTH: u32 = 1280;
    pub const CAMERA_HEIGHT: u32 = 720;

    /// Vertical field of view of the simulated camera (radians)
    pub const FIELD_OF_VIEW_Y: f32 = 1.05;

    /// Orbit radius and angular speed of the simulated device
    pub const ORBIT_RADIUS: f32 = 1.5;
    pub const ORBIT_SPEED: f32 = 0.4;

    /// Device height above the tracking origin
    pub const EYE_HEIGHT: f32 = 1.4;
}

/// Frame transfer strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Publish frames to the cache; the page fetches `arframe://frame`
    #[default]
    Binary,
    /// Embed Base64 frames in every gated payload
    Inline,
}

/// Runtime configuration of the session bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub transfer_mode: TransferMode,
    /// Image work runs on every `skip_interval`-th tick
    pub skip_interval: u32,
    pub jpeg_quality: u8,
    pub device_id: String,
    pub default_light_intensity: f64,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            transfer_mode: TransferMode::Binary,
            skip_interval: 4,
            jpeg_quality: compression::JPEG_QUALITY,
            device_id: session::DEVICE_ID.to_string(),
            default_light_intensity: session::DEFAULT_LIGHT_INTENSITY,
            near_plane: 0.001,
            far_plane: 1000.0,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Load from the file named by [`CONFIG_ENV_VAR`], or defaults when unset
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.skip_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "skip_interval",
                message: "must be at least 1".into(),
            });
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::Invalid {
                field: "jpeg_quality",
                message: format!("{} is outside 1..=100", self.jpeg_quality),
            });
        }
        if !(self.near_plane > 0.0 && self.far_plane > self.near_plane) {
            return Err(ConfigError::Invalid {
                field: "near_plane",
                message: format!(
                    "clip planes must satisfy 0 < near < far (near={}, far={})",
                    self.near_plane, self.far_plane
                ),
            });
        }
        Ok(())
    }
}
