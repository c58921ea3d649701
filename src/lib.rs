pub mod arg_parser;
pub mod config_manager;
pub mod daemon;
pub mod device;
pub mod devices_manager;
pub mod errors;
pub mod fan_curve;
pub mod fan_manager;
pub mod gpu_device;
pub mod logger;
