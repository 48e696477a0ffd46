use crate::{
    ports::{Indicator, TemperatureSensor},
    thermostat::{CommandResult, ThermostatMachine},
    types::Button,
};

/// Applies exactly one machine command for one press.
pub fn dispatch<S, I>(machine: &mut ThermostatMachine<S, I>, button: Button) -> CommandResult
where
    S: TemperatureSensor,
    I: Indicator,
{
    match button {
        Button::Mode => machine.cycle_state(),
        Button::Up => machine.increment_set_point(),
        Button::Down => machine.decrement_set_point(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{thermostat::tests::machine_at, types::ThermostatState};

    #[test]
    fn each_button_maps_to_one_command() {
        let mut machine = machine_at(20.0, 72);

        dispatch(&mut machine, Button::Mode).unwrap();
        assert_eq!(machine.state(), ThermostatState::Heat);
        assert_eq!(machine.set_point(), 72);

        dispatch(&mut machine, Button::Up).unwrap();
        assert_eq!(machine.set_point(), 73);
        assert_eq!(machine.state(), ThermostatState::Heat);

        dispatch(&mut machine, Button::Down).unwrap();
        dispatch(&mut machine, Button::Down).unwrap();
        assert_eq!(machine.set_point(), 71);
    }

    #[test]
    fn every_press_refreshes_indicators_once() {
        let mut machine = machine_at(20.0, 72);
        let presses = [Button::Mode, Button::Up, Button::Up, Button::Down, Button::Mode];

        for button in presses {
            dispatch(&mut machine, button).unwrap();
        }

        assert_eq!(machine.heat_indicator().history.len(), presses.len());
        assert_eq!(machine.cool_indicator().history.len(), presses.len());
    }
}
