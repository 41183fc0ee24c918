//! TOML configuration: network endpoints, per-axis input sources, thresholds.
//!
//! A default file is written on first run so every knob is discoverable
//! without reading source.

use crate::control::controller_handle::ControllerSettings;
use crate::control::event_router::{AxisMode, AxisModes};
use crate::control::scheduler::SchedulerSettings;
use crate::control::Axis;
use crate::sensor::adapter::{
    DoubleTapAdapter, OrientationAdapter, PadAxisAdapter, ShakeAdapter,
};
use crate::sensor::{ListenerSettings, OrientationAngle, PadAxis, SensorAdapter};
use crate::transport::EmitterSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to write default config: {0}")]
    WriteError(#[from] toml::ser::Error),
}

/// Input source driving one axis.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AxisInput {
    /// Pad axis, edge-classified press/release only.
    PadDiscrete,
    /// Pad axis with duty-cycle approximation of the magnitude.
    PadContinuous,
    /// Orientation angle, discrete by nature (the angle carries no magnitude).
    Orientation,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct NetworkConfig {
    /// Local address the OSC listener binds to.
    pub listen_addr: String,
    /// Consumer address command datagrams go to.
    pub target_addr: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            target_addr: "127.0.0.1:6006".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct ControlConfig {
    pub steering: AxisInput,
    pub acceleration: AxisInput,
    /// Scheduler tick frequency in Hz.
    pub tick_hz: u32,
    /// Duty-cycle window in milliseconds.
    pub cycle_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            steering: AxisInput::PadDiscrete,
            acceleration: AxisInput::PadDiscrete,
            tick_hz: 60,
            cycle_ms: 500,
        }
    }
}

/// Per-adapter thresholds, tuned to the sensor app's value ranges.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct AdapterConfig {
    /// Pad deflection below this counts as rest.
    pub pad_threshold: f32,
    /// Yaw band half-width for orientation steering (degrees).
    pub steer_angle_threshold: f32,
    /// Roll band half-width for orientation acceleration (degrees).
    pub accel_angle_threshold: f32,
    /// Roll band center for orientation acceleration (degrees).
    pub accel_angle_offset: f32,
    pub shake_enabled: bool,
    /// Shake vector magnitude that triggers the rescue command.
    pub shake_threshold: f32,
    pub double_tap_enabled: bool,
    /// Second tap within this window triggers the fire command.
    pub double_tap_window_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            pad_threshold: 0.4,
            steer_angle_threshold: 20.0,
            accel_angle_threshold: 15.0,
            accel_angle_offset: -50.0,
            shake_enabled: true,
            shake_threshold: 2.5,
            double_tap_enabled: true,
            double_tap_window_ms: 400,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub control: ControlConfig,
    pub adapters: AdapterConfig,
}

impl Config {
    /// Loads the config from `path`, or from the per-user config dir when no
    /// path is given. Writes a default file on first run.
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.unwrap_or_else(default_config_path);

        if !path.exists() {
            info!("No config at {}, writing defaults", path.display());
            let config = Config::default();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, toml::to_string_pretty(&config)?)?;
            return Ok(config);
        }

        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(&path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// The adapter set selected by this config. Exactly one adapter drives
    /// each axis; one-shot adapters are appended when enabled.
    pub fn adapter_set(&self) -> Vec<Box<dyn SensorAdapter>> {
        let mut adapters: Vec<Box<dyn SensorAdapter>> = Vec::new();

        match self.control.steering {
            AxisInput::PadDiscrete | AxisInput::PadContinuous => {
                adapters.push(Box::new(PadAxisAdapter::new(
                    Axis::Steering,
                    PadAxis::Y,
                    self.adapters.pad_threshold,
                )));
            }
            AxisInput::Orientation => {
                // Positive yaw tilts the device right but steers left.
                adapters.push(Box::new(OrientationAdapter::new(
                    Axis::Steering,
                    OrientationAngle::Yaw,
                    self.adapters.steer_angle_threshold,
                    0.0,
                    true,
                )));
            }
        }

        match self.control.acceleration {
            AxisInput::PadDiscrete | AxisInput::PadContinuous => {
                adapters.push(Box::new(PadAxisAdapter::new(
                    Axis::Acceleration,
                    PadAxis::X,
                    self.adapters.pad_threshold,
                )));
            }
            AxisInput::Orientation => {
                adapters.push(Box::new(OrientationAdapter::new(
                    Axis::Acceleration,
                    OrientationAngle::Roll,
                    self.adapters.accel_angle_threshold,
                    self.adapters.accel_angle_offset,
                    false,
                )));
            }
        }

        if self.adapters.shake_enabled {
            adapters.push(Box::new(ShakeAdapter::new(self.adapters.shake_threshold)));
        }
        if self.adapters.double_tap_enabled {
            adapters.push(Box::new(DoubleTapAdapter::new(
                self.adapters.double_tap_window_ms,
            )));
        }

        adapters
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            modes: AxisModes {
                steering: axis_mode(self.control.steering),
                acceleration: axis_mode(self.control.acceleration),
            },
            scheduler: SchedulerSettings {
                tick_hz: self.control.tick_hz,
                cycle_ms: self.control.cycle_ms,
            },
        }
    }

    pub fn listener_settings(&self) -> ListenerSettings {
        ListenerSettings {
            bind_addr: self.network.listen_addr.clone(),
        }
    }

    pub fn emitter_settings(&self) -> EmitterSettings {
        EmitterSettings {
            target_addr: self.network.target_addr.clone(),
        }
    }
}

fn axis_mode(input: AxisInput) -> AxisMode {
    match input {
        AxisInput::PadContinuous => AxisMode::Continuous,
        AxisInput::PadDiscrete | AxisInput::Orientation => AxisMode::Discrete,
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("oscpad")
        .join("config.toml")
}
