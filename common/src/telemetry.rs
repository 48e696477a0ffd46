use std::{fmt, str::FromStr};

use crate::{error::TelemetryParseError, types::ThermostatState};

/// One line of the serial contract: `<mode>,<tempF>,<setPoint>\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub state: ThermostatState,
    pub temp_f: i32,
    pub set_point: i32,
}

impl TelemetryRecord {
    pub fn new(state: ThermostatState, temp_f: i32, set_point: i32) -> Self {
        Self {
            state,
            temp_f,
            set_point,
        }
    }

    pub fn encode(&self) -> String {
        format!("{self}\n")
    }
}

/// Renders the record without the trailing line break.
impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.state.as_str(), self.temp_f, self.set_point)
    }
}

impl FromStr for TelemetryRecord {
    type Err = TelemetryParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let body = line
            .strip_suffix('\n')
            .ok_or(TelemetryParseError::MissingTerminator)?;
        let body = body.strip_suffix('\r').unwrap_or(body);

        let fields: Vec<&str> = body.split(',').collect();
        let [mode, temp_f, set_point] = fields.as_slice() else {
            return Err(TelemetryParseError::FieldCount(fields.len()));
        };

        let state = ThermostatState::from_wire(mode)
            .ok_or_else(|| TelemetryParseError::UnknownMode(mode.to_string()))?;
        let parse_int = |value: &str| {
            value
                .parse::<i32>()
                .map_err(|_| TelemetryParseError::InvalidInteger(value.to_string()))
        };

        Ok(Self {
            state,
            temp_f: parse_int(temp_f)?,
            set_point: parse_int(set_point)?,
        })
    }
}

pub fn encode(state: ThermostatState, temp_f: i32, set_point: i32) -> String {
    TelemetryRecord::new(state, temp_f, set_point).encode()
}
