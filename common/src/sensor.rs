use crate::{error::SensorError, ports::TemperatureSensor, types::Measurement};

pub fn celsius_to_fahrenheit(temp_c: f32) -> f32 {
    temp_c * 9.0 / 5.0 + 32.0
}

/// Whole degrees used for every comparison and for telemetry. Floors toward
/// negative infinity, so -0.5 becomes -1.
pub fn floor_fahrenheit(temp_f: f32) -> i32 {
    temp_f.floor() as i32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub measurement: Measurement,
    pub temperature_f: f32,
}

impl Reading {
    pub fn from_measurement(measurement: Measurement) -> Self {
        Self {
            measurement,
            temperature_f: celsius_to_fahrenheit(measurement.temperature_celsius),
        }
    }

    pub fn whole_f(&self) -> i32 {
        floor_fahrenheit(self.temperature_f)
    }

    pub fn humidity(&self) -> f32 {
        self.measurement.relative_humidity_percent
    }
}

pub struct SensorReader<S> {
    sensor: S,
}

impl<S: TemperatureSensor> SensorReader<S> {
    pub fn new(sensor: S) -> Self {
        Self { sensor }
    }

    /// Takes a fresh measurement. Nothing is cached between calls.
    pub fn read(&mut self) -> Result<Reading, SensorError> {
        let measurement = self.sensor.read()?;
        if !measurement.temperature_celsius.is_finite() {
            return Err(SensorError::InvalidReading);
        }
        Ok(Reading::from_measurement(measurement))
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSensor(Result<Measurement, SensorError>);

    impl TemperatureSensor for FixedSensor {
        fn read(&mut self) -> Result<Measurement, SensorError> {
            self.0.clone()
        }
    }

    #[test]
    fn converts_reference_point() {
        assert!((celsius_to_fahrenheit(22.0) - 71.6).abs() < 1e-4);
        assert!((celsius_to_fahrenheit(0.0) - 32.0).abs() < f32::EPSILON);
        assert!((celsius_to_fahrenheit(-40.0) + 40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn floor_goes_toward_negative_infinity() {
        assert_eq!(floor_fahrenheit(-0.5), -1);
        assert_eq!(floor_fahrenheit(-3.0), -3);
        assert_eq!(floor_fahrenheit(75.92), 75);
        assert_eq!(floor_fahrenheit(0.0), 0);
    }

    #[test]
    fn reader_reports_floored_fahrenheit() {
        let mut reader = SensorReader::new(FixedSensor(Ok(Measurement::new(24.4, 41.0))));
        let reading = reader.read().unwrap();

        assert_eq!(reading.whole_f(), 75);
        assert_eq!(reading.humidity(), 41.0);
    }

    #[test]
    fn reader_propagates_bus_failure() {
        let mut reader = SensorReader::new(FixedSensor(Err(SensorError::Bus("nack".into()))));
        assert_eq!(reader.read(), Err(SensorError::Bus("nack".into())));
    }

    #[test]
    fn reader_rejects_nan() {
        let mut reader = SensorReader::new(FixedSensor(Ok(Measurement::new(f32::NAN, 40.0))));
        assert_eq!(reader.read(), Err(SensorError::InvalidReading));
    }
}
