pub mod config;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod indicator;
pub mod ports;
pub mod render;
pub mod sensor;
pub mod telemetry;
pub mod thermostat;
pub mod types;

pub use config::{RuntimeConfig, SensorFailurePolicy};
pub use dispatch::dispatch;
pub use display::DisplayFrame;
pub use error::{DisplayError, PortError, RenderError, SensorError};
pub use indicator::{IndicatorCommand, IndicatorPair};
pub use render::{Renderer, TickReport};
pub use telemetry::TelemetryRecord;
pub use thermostat::{CommandError, CommandOutcome, ThermostatMachine};
pub use types::{Button, Measurement, Snapshot, ThermostatState};
