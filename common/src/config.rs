use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    display::{is_valid_time_format, DEFAULT_DISPLAY_WIDTH},
    error::ConfigError,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThermostatConfig {
    pub initial_set_point_f: i32,
}

impl Default for ThermostatConfig {
    fn default() -> Self {
        Self {
            initial_set_point_f: 72,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: usize,
    pub time_format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_DISPLAY_WIDTH,
            time_format: "%b %d  %H:%M:%S".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorFailurePolicy {
    /// Log the failed tick and leave the previous frame on screen.
    #[default]
    Skip,
    /// Stop the render loop and surface the error to the process.
    Halt,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    pub tick_ms: u64,
    pub alternation_window: u32,
    pub temperature_ticks: u32,
    pub telemetry_interval: u32,
    pub sensor_failure: SensorFailurePolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1_000,
            alternation_window: 10,
            temperature_ticks: 5,
            telemetry_interval: 30,
            sensor_failure: SensorFailurePolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SerialConfig {
    pub path: Option<PathBuf>,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: None,
            baud_rate: 115_200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatedSensorConfig {
    pub base_celsius: f32,
    pub humidity_percent: f32,
}

impl Default for SimulatedSensorConfig {
    fn default() -> Self {
        Self {
            base_celsius: 21.0,
            humidity_percent: 45.0,
        }
    }
}

/// Physical wiring of the three push buttons (BCM numbering).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ButtonConfig {
    pub mode: u8,
    pub up: u8,
    pub down: u8,
    /// Stop the thermostat once the button source closes.
    pub end_on_close: bool,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            mode: 24,
            up: 25,
            down: 12,
            end_on_close: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub thermostat: ThermostatConfig,
    pub display: DisplayConfig,
    pub render: RenderConfig,
    pub serial: SerialConfig,
    pub sensor: SimulatedSensorConfig,
    pub buttons: ButtonConfig,
}

impl RuntimeConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(raw)?;
        config.sanitize();
        Ok(config)
    }

    pub fn sanitize(&mut self) {
        self.display.sanitize();
        self.render.sanitize();
    }
}

impl DisplayConfig {
    pub fn sanitize(&mut self) {
        self.width = self.width.clamp(8, 40);
        if self.time_format.trim().is_empty() || !is_valid_time_format(&self.time_format) {
            self.time_format = Self::default().time_format;
        }
    }
}

impl RenderConfig {
    pub fn sanitize(&mut self) {
        self.tick_ms = self.tick_ms.clamp(100, 60_000);
        self.alternation_window = self.alternation_window.max(2);
        self.temperature_ticks = self
            .temperature_ticks
            .clamp(1, self.alternation_window - 1);
        self.telemetry_interval = self.telemetry_interval.max(1);
    }
}
