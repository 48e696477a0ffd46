use std::fmt::Write;

use chrono::{
    format::{Item, StrftimeItems},
    NaiveDateTime,
};

use crate::{error::DisplayError, types::ThermostatState};

pub const DEFAULT_DISPLAY_WIDTH: usize = 16;

/// Two lines, each exactly `width` characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    line1: String,
    line2: String,
}

impl DisplayFrame {
    pub fn new(line1: &str, line2: &str, width: usize) -> Self {
        Self {
            line1: fit_line(line1, width),
            line2: fit_line(line2, width),
        }
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }

    /// Both lines joined the way a character LCD takes a message.
    pub fn message(&self) -> String {
        format!("{}\n{}", self.line1, self.line2)
    }
}

/// Truncates at a character boundary or right-pads with spaces so the
/// result is exactly `width` characters long.
pub fn fit_line(text: &str, width: usize) -> String {
    let mut line: String = text.chars().take(width).collect();
    let len = line.chars().count();
    line.extend(std::iter::repeat(' ').take(width - len));
    line
}

pub fn is_valid_time_format(time_format: &str) -> bool {
    !StrftimeItems::new(time_format).any(|item| matches!(item, Item::Error))
}

pub fn timestamp_line(now: NaiveDateTime, time_format: &str) -> Result<String, DisplayError> {
    let mut line = String::new();
    write!(line, "{}", now.format(time_format))
        .map_err(|_| DisplayError::TimeFormat(time_format.to_string()))?;
    Ok(line)
}

pub fn temperature_line(temp_f: i32) -> String {
    format!("Temp:{temp_f}F")
}

pub fn mode_line(state: ThermostatState, set_point: i32) -> String {
    format!("{} SP:{set_point}F", state.as_upper_str())
}
