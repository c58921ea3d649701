pub mod hysteresis;
pub mod policy_table;

pub use hysteresis::HysteresisController;
pub use policy_table::PolicyTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FanSpeed {
    speed: u32,
}

impl FanSpeed {
    // Generate a new fan speed point
    // automatically clamp the given value between 0 and 100
    pub fn new(speed: u32) -> FanSpeed {
        FanSpeed { speed: speed.clamp(0, 100) }
    }

    // Return the stored fan speed
    pub fn get(&self) -> u32 {
        self.speed
    }
}

impl From<u32> for FanSpeed {
    fn from(value: u32) -> Self {
        FanSpeed::new(value)
    }
}

// A closed temperature interval mapped to one fan speed.
// The hysteresis is the number of degrees the temperature has to fall
// below `min_temperature` before the controller leaves this band for a
// slower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureBand {
    pub min_temperature: i32,
    pub max_temperature: i32,
    pub fan_speed: FanSpeed,
    pub hysteresis: u32,
}

impl TemperatureBand {
    pub fn new(
        min_temperature: i32,
        max_temperature: i32,
        fan_speed: u32,
        hysteresis: u32,
    ) -> Self {
        Self {
            min_temperature,
            max_temperature,
            fan_speed: FanSpeed::new(fan_speed),
            hysteresis,
        }
    }

    // Inclusive on both ends
    pub fn contains(&self, temp: i32) -> bool {
        self.min_temperature <= temp && temp <= self.max_temperature
    }

    // Highest temperature at which a downward transition out of
    // this band is allowed
    pub fn release_temperature(&self) -> i32 {
        let hysteresis = i32::try_from(self.hysteresis).unwrap_or(i32::MAX);

        self.min_temperature.saturating_sub(hysteresis)
    }
}

impl From<(i32, i32, u32, u32)> for TemperatureBand {
    fn from(value: (i32, i32, u32, u32)) -> Self {
        TemperatureBand::new(value.0, value.1, value.2, value.3)
    }
}
