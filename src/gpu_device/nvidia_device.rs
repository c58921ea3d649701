use nvml_wrapper::{
    Device, Nvml, enum_wrappers::device::TemperatureSensor,
    enums::device::FanControlPolicy,
};
use tracing::{debug, info};

use crate::{
    fan_curve::FanSpeed,
    gpu_device::{DeviceError, GpuBackend},
};

// Nvidia GPUs driven through NVML.
// The NVML context lives as long as this value: it is released by
// `shutdown` or, on any other path, when the backend is dropped.
pub struct NvidiaBackend {
    nvml: Nvml,
}

impl NvidiaBackend {
    // Load and initialize the NVML library
    pub fn init() -> Result<Self, DeviceError> {
        let nvml = Nvml::init()?;

        match nvml.sys_driver_version() {
            Ok(version) => info!("NVML initialized, driver version {version}"),
            Err(err) => {
                info!("NVML initialized");
                debug!("Failed to read the driver version: {err}");
            }
        }

        Ok(Self { nvml })
    }

    // Release the NVML context
    pub fn shutdown(self) -> Result<(), DeviceError> {
        self.nvml.shutdown()?;

        Ok(())
    }

    // Return a NVML device handle.
    // Handles are cheap, a new one is taken for every call
    fn get(&self, index: u32) -> Result<Device<'_>, DeviceError> {
        Ok(self.nvml.device_by_index(index)?)
    }
}

impl GpuBackend for NvidiaBackend {
    fn device_count(&self) -> Result<u32, DeviceError> {
        Ok(self.nvml.device_count()?)
    }

    fn device_name(&self, index: u32) -> Result<String, DeviceError> {
        Ok(self.get(index)?.name()?)
    }

    fn fan_count(&self, index: u32) -> Result<u32, DeviceError> {
        Ok(self.get(index)?.num_fans()?)
    }

    fn temperature(&self, index: u32) -> Result<i32, DeviceError> {
        let temp = self.get(index)?.temperature(TemperatureSensor::Gpu)?;

        i32::try_from(temp).map_err(|_| {
            DeviceError::Unavailable(format!("temperature out of range: {temp}"))
        })
    }

    fn fan_speed(&self, index: u32, fan: u32) -> Result<FanSpeed, DeviceError> {
        Ok(FanSpeed::new(self.get(index)?.fan_speed(fan)?))
    }

    fn set_manual_policy(&self, index: u32, fan: u32) -> Result<(), DeviceError> {
        let mut device = self.get(index)?;

        device.set_fan_control_policy(fan, FanControlPolicy::Manual)?;

        Ok(())
    }

    fn set_auto_policy(&self, index: u32, fan: u32) -> Result<(), DeviceError> {
        let mut device = self.get(index)?;

        device.set_fan_control_policy(
            fan,
            FanControlPolicy::TemperatureContinousSw,
        )?;

        Ok(())
    }

    fn set_fan_speed(
        &self,
        index: u32,
        fan: u32,
        speed: FanSpeed,
    ) -> Result<(), DeviceError> {
        let mut device = self.get(index)?;

        device.set_fan_speed(fan, speed.get())?;

        Ok(())
    }
}
