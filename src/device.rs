use std::fmt;

use crate::fan_curve::{FanSpeed, TemperatureBand};

// Live state of one controlled GPU.
// The fan speeds are the last values successfully applied to each fan,
// the active band is the band the hysteresis controller last committed to.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSession {
    // NVML device index
    index: u32,
    name: String,

    current_speeds: Vec<FanSpeed>,
    active_band: Option<TemperatureBand>,
}

impl DeviceSession {
    // Create a session from the speeds read from the hardware at startup.
    // The fan count is the number of given speeds
    pub fn new(index: u32, name: &str, current_speeds: Vec<FanSpeed>) -> Self {
        Self {
            index,
            name: name.to_string(),
            current_speeds,
            active_band: None,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fan_count(&self) -> u32 {
        self.current_speeds.len() as u32
    }

    pub fn current_speeds(&self) -> &[FanSpeed] {
        &self.current_speeds
    }

    // All fans of a device are driven together, the first fan
    // stands for the whole device
    pub fn representative_speed(&self) -> FanSpeed {
        self.current_speeds.first().copied().unwrap_or_default()
    }

    pub fn active_band(&self) -> Option<&TemperatureBand> {
        self.active_band.as_ref()
    }

    pub(crate) fn set_active_band(&mut self, band: Option<TemperatureBand>) {
        self.active_band = band;
    }

    // Fans whose last applied speed differs from the target
    pub fn fans_out_of_date(&self, target: FanSpeed) -> Vec<u32> {
        self.current_speeds
            .iter()
            .enumerate()
            .filter(|(_, speed)| **speed != target)
            .map(|(fan, _)| fan as u32)
            .collect()
    }

    // Store the speed after a successful write to the fan
    pub(crate) fn record_speed(&mut self, fan: u32, speed: FanSpeed) {
        if let Some(current) = self.current_speeds.get_mut(fan as usize) {
            *current = speed;
        }
    }
}

impl fmt::Display for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPU {} (\"{}\")", self.index(), self.name())
    }
}
