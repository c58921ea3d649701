use nvml_wrapper::error::NvmlError;
use thiserror::Error;

use crate::fan_curve::FanSpeed;

pub mod nvidia_device;

#[derive(Debug, Error)]
pub enum DeviceError {
    // The device or driver does not implement the requested operation
    #[error("operation not supported by the device")]
    NotSupported,
    #[error("NVML error: {0}")]
    Nvml(NvmlError),
    #[error("{0}")]
    Unavailable(String),
}

impl From<NvmlError> for DeviceError {
    fn from(err: NvmlError) -> Self {
        match err {
            NvmlError::NotSupported => DeviceError::NotSupported,
            err => DeviceError::Nvml(err),
        }
    }
}

// Telemetry and actuation interface of the GPUs on the system.
// Devices are addressed by their enumeration index and fans by their
// index on the device. Every call may fail on its own.
#[cfg_attr(test, mockall::automock)]
pub trait GpuBackend: Send {
    // Number of GPUs on the system
    fn device_count(&self) -> Result<u32, DeviceError>;

    // Human readable device name
    fn device_name(&self, index: u32) -> Result<String, DeviceError>;

    // Number of controllable fans on the device
    fn fan_count(&self, index: u32) -> Result<u32, DeviceError>;

    // Current GPU core temperature in °C
    fn temperature(&self, index: u32) -> Result<i32, DeviceError>;

    // Current target speed of a fan in percent
    fn fan_speed(&self, index: u32, fan: u32) -> Result<FanSpeed, DeviceError>;

    // Take manual control over a fan
    fn set_manual_policy(&self, index: u32, fan: u32) -> Result<(), DeviceError>;

    // Give a fan back to the driver's temperature based control
    fn set_auto_policy(&self, index: u32, fan: u32) -> Result<(), DeviceError>;

    fn set_fan_speed(
        &self,
        index: u32,
        fan: u32,
        speed: FanSpeed,
    ) -> Result<(), DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nvml_not_supported_is_recognised() {
        let err: DeviceError = NvmlError::NotSupported.into();

        assert!(matches!(err, DeviceError::NotSupported));
    }

    #[test]
    fn other_nvml_errors_are_wrapped() {
        let err: DeviceError = NvmlError::NoPermission.into();

        assert!(matches!(err, DeviceError::Nvml(NvmlError::NoPermission)));
    }
}
