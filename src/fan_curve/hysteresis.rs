use std::cmp::Ordering;

use tracing::trace;

use crate::{
    device::DeviceSession,
    fan_curve::{FanSpeed, PolicyTable},
};

// Decide the fan speed of a device from its temperature.
//
// Faster bands are committed as soon as they are resolved. A slower band
// is only committed once the temperature has fallen to the active band's
// minimum temperature minus its hysteresis, so a reading hovering on a
// band edge does not toggle the fans.
#[derive(Debug, Clone)]
pub struct HysteresisController {
    table: PolicyTable,
}

impl HysteresisController {
    pub fn new(table: PolicyTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PolicyTable {
        &self.table
    }

    // Update the session band for the given temperature and return the
    // committed fan speed. The session fan speeds are left untouched,
    // they are only changed once the speed was applied to the hardware
    pub fn update(&self, session: &mut DeviceSession, temp: i32) -> FanSpeed {
        let current_speed = session.representative_speed();

        // Outside of every band, keep whatever we had
        let Some(candidate) = self.table.resolve(temp).copied() else {
            trace!("{session}: {temp}°C matches no band, holding {current_speed:?}");
            return current_speed;
        };

        match candidate.fan_speed.cmp(&current_speed) {
            Ordering::Greater => {
                session.set_active_band(Some(candidate));

                candidate.fan_speed
            }
            Ordering::Less => {
                let release = session
                    .active_band()
                    .map(|active| active.release_temperature());

                match release {
                    Some(release) if temp > release => {
                        trace!(
                            "{session}: {temp}°C above release point {release}°C, \
                             holding {current_speed:?}"
                        );

                        current_speed
                    }
                    _ => {
                        session.set_active_band(Some(candidate));

                        candidate.fan_speed
                    }
                }
            }
            Ordering::Equal => {
                // Keep the hysteresis reference on the band we are really in
                session.set_active_band(Some(candidate));

                current_speed
            }
        }
    }
}
