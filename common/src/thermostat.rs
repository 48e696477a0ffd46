use crate::{
    config::ThermostatConfig,
    error::SensorError,
    indicator::{self, IndicatorPair},
    ports::{Indicator, TemperatureSensor},
    sensor::{Reading, SensorReader},
    types::{Snapshot, ThermostatState},
};

/// Result of a command: the state it left behind and the indicator commands
/// that were driven afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    pub snapshot: Snapshot,
    pub indicators: IndicatorPair,
}

/// A command whose mutation was applied but whose indicator refresh could not
/// read the sensor. Indicators were forced off.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{snapshot:?} applied, indicators forced off: {source}")]
pub struct CommandError {
    pub snapshot: Snapshot,
    #[source]
    pub source: SensorError,
}

pub type CommandResult = Result<CommandOutcome, CommandError>;

pub struct ThermostatMachine<S, I> {
    state: ThermostatState,
    set_point: i32,
    sensor: SensorReader<S>,
    heat_indicator: I,
    cool_indicator: I,
}

impl<S, I> ThermostatMachine<S, I>
where
    S: TemperatureSensor,
    I: Indicator,
{
    pub fn new(config: &ThermostatConfig, sensor: S, heat_indicator: I, cool_indicator: I) -> Self {
        Self {
            state: ThermostatState::Off,
            set_point: config.initial_set_point_f,
            sensor: SensorReader::new(sensor),
            heat_indicator,
            cool_indicator,
        }
    }

    pub fn state(&self) -> ThermostatState {
        self.state
    }

    pub fn set_point(&self) -> i32 {
        self.set_point
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            set_point: self.set_point,
        }
    }

    pub fn cycle_state(&mut self) -> CommandResult {
        self.state = self.state.next();
        self.recompute_indicators()
    }

    pub fn increment_set_point(&mut self) -> CommandResult {
        self.set_point = self.set_point.wrapping_add(1);
        self.recompute_indicators()
    }

    pub fn decrement_set_point(&mut self) -> CommandResult {
        self.set_point = self.set_point.wrapping_sub(1);
        self.recompute_indicators()
    }

    /// Runs the indicator policy against a fresh reading. Off never needs the
    /// sensor, so switching to Off cannot fail.
    pub fn recompute_indicators(&mut self) -> CommandResult {
        let snapshot = self.snapshot();
        if self.state == ThermostatState::Off {
            let indicators = self.drive(IndicatorPair::OFF);
            return Ok(CommandOutcome {
                snapshot,
                indicators,
            });
        }

        match self.sensor.read() {
            Ok(reading) => Ok(CommandOutcome {
                snapshot,
                indicators: self.apply_reading(&reading),
            }),
            Err(source) => {
                self.drive(IndicatorPair::OFF);
                Err(CommandError { snapshot, source })
            }
        }
    }

    /// Re-evaluates the policy with a reading the caller already took this tick.
    pub fn apply_reading(&mut self, reading: &Reading) -> IndicatorPair {
        let pair = indicator::evaluate(self.state, reading.whole_f(), self.set_point);
        self.drive(pair)
    }

    pub fn read_sensor(&mut self) -> Result<Reading, SensorError> {
        self.sensor.read()
    }

    /// Darkens both indicators. Used on the shutdown path.
    pub fn indicators_off(&mut self) {
        self.drive(IndicatorPair::OFF);
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        self.sensor.sensor_mut()
    }

    pub fn heat_indicator(&self) -> &I {
        &self.heat_indicator
    }

    pub fn cool_indicator(&self) -> &I {
        &self.cool_indicator
    }

    fn drive(&mut self, pair: IndicatorPair) -> IndicatorPair {
        self.heat_indicator.set(pair.heat);
        self.cool_indicator.set(pair.cool);
        pair
    }
}
