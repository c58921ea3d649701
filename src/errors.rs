use thiserror::Error;

use crate::{
    config_manager::ConfigError, devices_manager::DiscoveryError,
    gpu_device::DeviceError,
};

// The main daemon error type, only produced before the control loop starts
#[derive(Debug, Error)]
pub enum NvfandError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to initialize the GPU backend")]
    Backend(#[from] DeviceError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("failed to listen for termination signals")]
    Signal(#[from] std::io::Error),
}
