use chrono::NaiveDateTime;

use crate::{
    config::{DisplayConfig, RenderConfig},
    display::{mode_line, temperature_line, timestamp_line, DisplayFrame},
    error::{PortError, RenderError},
    indicator::IndicatorPair,
    ports::{Display, Indicator, SerialPort, TemperatureSensor},
    telemetry::TelemetryRecord,
    thermostat::ThermostatMachine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondLine {
    Temperature,
    Mode,
}

/// Tick counters for the display alternation and telemetry cadence.
///
/// Ticks are numbered from 1. Within each alternation window the first
/// `temperature_ticks` ticks show the temperature and the rest show the mode,
/// so the reference 10/5 settings give a 5/5 split. Telemetry fires on every
/// `telemetry_interval`-th tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCadence {
    alternation_window: u32,
    temperature_ticks: u32,
    telemetry_interval: u32,
    window_position: u32,
    ticks_since_telemetry: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    pub second_line: SecondLine,
    /// Last tick of an alternation window.
    pub refresh_indicators: bool,
    pub emit_telemetry: bool,
}

impl RenderCadence {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            alternation_window: config.alternation_window.max(1),
            temperature_ticks: config.temperature_ticks,
            telemetry_interval: config.telemetry_interval.max(1),
            window_position: 0,
            ticks_since_telemetry: 0,
        }
    }

    pub fn advance(&mut self) -> TickPlan {
        let position = self.window_position;
        self.window_position = (self.window_position + 1) % self.alternation_window;

        self.ticks_since_telemetry += 1;
        let emit_telemetry = self.ticks_since_telemetry >= self.telemetry_interval;
        if emit_telemetry {
            self.ticks_since_telemetry = 0;
        }

        TickPlan {
            second_line: if position < self.temperature_ticks {
                SecondLine::Temperature
            } else {
                SecondLine::Mode
            },
            refresh_indicators: position + 1 == self.alternation_window,
            emit_telemetry,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub frame: DisplayFrame,
    pub indicators: Option<IndicatorPair>,
    pub telemetry: Option<TelemetryRecord>,
    pub telemetry_error: Option<PortError>,
    pub humidity: f32,
}

/// Owns the display and serial port and renders one frame per tick from a
/// fresh sensor reading and a snapshot of the machine.
pub struct Renderer<D, P> {
    display: D,
    serial: P,
    cadence: RenderCadence,
    width: usize,
    time_format: String,
    ticks: u64,
}

impl<D, P> Renderer<D, P>
where
    D: Display,
    P: SerialPort,
{
    pub fn new(
        render: &RenderConfig,
        display_config: &DisplayConfig,
        display: D,
        serial: P,
    ) -> Self {
        Self {
            display,
            serial,
            cadence: RenderCadence::new(render),
            width: display_config.width,
            time_format: display_config.time_format.clone(),
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs one tick. The caller holds the machine exclusively for the whole
    /// call, so the snapshot, reading and indicator refresh are consistent.
    ///
    /// A sensor failure aborts the tick before the display is touched. A
    /// serial failure does not; it is returned in the report.
    pub fn tick<S, I>(
        &mut self,
        now: NaiveDateTime,
        machine: &mut ThermostatMachine<S, I>,
    ) -> Result<TickReport, RenderError>
    where
        S: TemperatureSensor,
        I: Indicator,
    {
        self.ticks += 1;
        let plan = self.cadence.advance();

        let reading = machine.read_sensor()?;
        let indicators = plan
            .refresh_indicators
            .then(|| machine.apply_reading(&reading));
        let snapshot = machine.snapshot();
        let temp_f = reading.whole_f();

        let line2 = match plan.second_line {
            SecondLine::Temperature => temperature_line(temp_f),
            SecondLine::Mode => mode_line(snapshot.state, snapshot.set_point),
        };
        let line1 = timestamp_line(now, &self.time_format)?;
        let frame = DisplayFrame::new(&line1, &line2, self.width);
        self.display.write(&frame)?;

        let mut telemetry = None;
        let mut telemetry_error = None;
        if plan.emit_telemetry {
            let record = TelemetryRecord::new(snapshot.state, temp_f, snapshot.set_point);
            match self.serial.write_line(&record.encode()) {
                Ok(()) => telemetry = Some(record),
                Err(err) => telemetry_error = Some(err),
            }
        }

        Ok(TickReport {
            frame,
            indicators,
            telemetry,
            telemetry_error,
            humidity: reading.humidity(),
        })
    }

    /// Clears the screen and releases the display pins. Release is attempted
    /// even when the clear fails; the first failure is returned.
    pub fn teardown(&mut self) -> Result<(), RenderError> {
        let cleared = self.display.clear();
        let released = self.display.release();
        cleared?;
        released?;
        Ok(())
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn serial(&self) -> &P {
        &self.serial
    }
}
