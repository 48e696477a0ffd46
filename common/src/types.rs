#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ThermostatState {
    #[default]
    Off,
    Heat,
    Cool,
}

impl ThermostatState {
    pub const ALL: [Self; 3] = [Self::Off, Self::Heat, Self::Cool];

    /// Next state in the fixed cycle Off -> Heat -> Cool -> Off.
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::Heat,
            Self::Heat => Self::Cool,
            Self::Cool => Self::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Heat => "heat",
            Self::Cool => "cool",
        }
    }

    pub fn as_upper_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Heat => "HEAT",
            Self::Cool => "COOL",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "off" => Some(Self::Off),
            "heat" => Some(Self::Heat),
            "cool" => Some(Self::Cool),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub temperature_celsius: f32,
    pub relative_humidity_percent: f32,
}

impl Measurement {
    pub fn new(temperature_celsius: f32, relative_humidity_percent: f32) -> Self {
        Self {
            temperature_celsius,
            relative_humidity_percent,
        }
    }
}

/// Consistent copy of the machine's mutable state, taken under its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub state: ThermostatState,
    pub set_point: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Mode,
    Up,
    Down,
}

impl Button {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mode => "mode",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}
