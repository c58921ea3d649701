use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    device::DeviceSession,
    fan_curve::FanSpeed,
    gpu_device::{DeviceError, GpuBackend},
};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("unable to get the GPU count")]
    DeviceCount(#[source] DeviceError),
    #[error("no GPU found on the system")]
    NoDevices,
}

// Discover the GPUs on the system and create a session for every one of
// them with controllable fans.
//
// Devices that can't be queried are skipped. An empty list means GPUs
// were found but none of them can be controlled.
pub fn discover_sessions<B: GpuBackend + ?Sized>(
    backend: &B,
) -> Result<Vec<DeviceSession>, DiscoveryError> {
    let device_count =
        backend.device_count().map_err(DiscoveryError::DeviceCount)?;

    if device_count == 0 {
        return Err(DiscoveryError::NoDevices);
    }

    info!("Found {device_count} GPU(s)");

    let mut sessions = Vec::new();

    for index in 0..device_count {
        let name = match backend.device_name(index) {
            Ok(name) => name,
            Err(err) => {
                warn!("Unable to get handle for GPU {index}: {err}. Skipping");
                continue;
            }
        };

        let fan_count = match backend.fan_count(index) {
            Ok(count) if count > 0 => count,
            Ok(_) => {
                info!("GPU {index} reports no controllable fans. Skipping");
                continue;
            }
            Err(err) => {
                info!("GPU {index} fan control not supported: {err}. Skipping");
                continue;
            }
        };

        // Only the per fan read is available, there is no device wide
        // speed to fall back on
        let speeds = (0..fan_count)
            .map(|fan| {
                backend.fan_speed(index, fan).unwrap_or_else(|err| {
                    warn!(
                        "Failed to get initial speed for GPU {index} fan {fan}: \
                         {err}. Using 0"
                    );

                    FanSpeed::new(0)
                })
            })
            .collect::<Vec<_>>();

        let session = DeviceSession::new(index, &name, speeds);

        let speeds_str = format_speeds(session.current_speeds());
        match backend.temperature(index) {
            Ok(temp) => {
                info!("Initialized {session}: temp {temp}°C, fan speeds {speeds_str}")
            }
            Err(err) => {
                debug!("Failed to read the temperature of GPU {index}: {err}");
                info!("Initialized {session}: temp unavailable, fan speeds {speeds_str}")
            }
        }

        sessions.push(session);
    }

    Ok(sessions)
}

// Render fan speeds as "[40, 40]%"
pub fn format_speeds(speeds: &[FanSpeed]) -> String {
    let speeds = speeds.iter().map(|s| s.get()).collect::<Vec<_>>();

    format!("{speeds:?}%")
}
