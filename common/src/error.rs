use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    #[error("sensor bus read failed: {0}")]
    Bus(String),
    #[error("sensor returned a non-finite reading")]
    InvalidReading,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortError {
    #[error("serial port unavailable: {0}")]
    Unavailable(String),
    #[error("serial write failed: {0}")]
    Write(String),
    #[error("telemetry line is not single-byte text")]
    NonAscii,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DisplayError {
    #[error("display write failed: {0}")]
    Write(String),
    #[error("display clear failed: {0}")]
    Clear(String),
    #[error("display release failed: {0}")]
    Release(String),
    #[error("display already released")]
    Released,
    #[error("invalid time format `{0}`")]
    TimeFormat(String),
}

/// Failure of a single render tick. Serial failures are not part of this
/// type; they are reported through the tick report instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryParseError {
    #[error("telemetry line must end with a newline")]
    MissingTerminator,
    #[error("expected 3 comma separated fields, found {0}")]
    FieldCount(usize),
    #[error("unknown mode `{0}`")]
    UnknownMode(String),
    #[error("invalid integer field `{0}`")]
    InvalidInteger(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid runtime config json: {0}")]
    Json(#[from] serde_json::Error),
}
