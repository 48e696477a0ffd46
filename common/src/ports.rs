//! Capability traits for the hardware the controller talks to.
//!
//! The state machine and renderer are generic over these, so hosts inject
//! real drivers or simulations at construction time.

use crate::{
    display::DisplayFrame,
    error::{DisplayError, PortError, SensorError},
    indicator::IndicatorCommand,
    types::Measurement,
};

pub trait TemperatureSensor {
    fn read(&mut self) -> Result<Measurement, SensorError>;
}

pub trait Display {
    /// Replace both lines in one update; implementations must not leave a
    /// half-drawn frame visible.
    fn write(&mut self, frame: &DisplayFrame) -> Result<(), DisplayError>;

    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Release every pin handle. Calling this more than once is a no-op.
    fn release(&mut self) -> Result<(), DisplayError>;
}

pub trait Indicator {
    fn set(&mut self, command: IndicatorCommand);
}

pub trait SerialPort {
    fn write_line(&mut self, line: &str) -> Result<(), PortError>;
}

impl<T: SerialPort + ?Sized> SerialPort for Box<T> {
    fn write_line(&mut self, line: &str) -> Result<(), PortError> {
        (**self).write_line(line)
    }
}
