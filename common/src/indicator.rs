use crate::types::ThermostatState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndicatorCommand {
    #[default]
    Off,
    SteadyOn,
    Pulse,
}

impl IndicatorCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::SteadyOn => "STEADY_ON",
            Self::Pulse => "PULSE",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorPair {
    pub heat: IndicatorCommand,
    pub cool: IndicatorCommand,
}

impl IndicatorPair {
    pub const OFF: Self = Self {
        heat: IndicatorCommand::Off,
        cool: IndicatorCommand::Off,
    };

    pub fn active_count(&self) -> usize {
        [self.heat, self.cool]
            .into_iter()
            .filter(|command| *command != IndicatorCommand::Off)
            .count()
    }
}

/// Pulse while working toward the set-point, steady once it is satisfied.
/// The indicator of the inactive mode is always off.
pub fn evaluate(state: ThermostatState, temp_f: i32, set_point: i32) -> IndicatorPair {
    match state {
        ThermostatState::Off => IndicatorPair::OFF,
        ThermostatState::Heat => IndicatorPair {
            heat: if temp_f < set_point {
                IndicatorCommand::Pulse
            } else {
                IndicatorCommand::SteadyOn
            },
            cool: IndicatorCommand::Off,
        },
        ThermostatState::Cool => IndicatorPair {
            heat: IndicatorCommand::Off,
            cool: if temp_f > set_point {
                IndicatorCommand::Pulse
            } else {
                IndicatorCommand::SteadyOn
            },
        },
    }
}
