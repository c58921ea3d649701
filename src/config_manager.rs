use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fan_curve::{
    PolicyTable, TemperatureBand, policy_table::PolicyError,
};

// Used when the configured update period is missing or not positive
pub const DEFAULT_UPDATE_SECONDS: f64 = 5.;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open configuration file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("temperature range {index}: {reason}")]
    InvalidRange { index: usize, reason: String },
    #[error("invalid temperature policy")]
    Policy(#[from] PolicyError),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TemperatureRangeConfig {
    pub min_temperature: i32,
    pub max_temperature: i32,
    pub fan_speed: i64,
    pub hysteresis: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DaemonConfig {
    // Seconds between two temperature checks
    #[serde(default)]
    pub time_to_update: f64,

    pub temperature_ranges: Vec<TemperatureRangeConfig>,

    // Give the fans back to the driver when the daemon stops
    #[serde(default = "default_restore_auto")]
    pub restore_auto_on_exit: bool,
}

fn default_restore_auto() -> bool {
    true
}

impl DaemonConfig {
    // Read and parse the Json configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Parsing config file at: {:?}", path);

        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let buf = BufReader::new(file);

        let config: DaemonConfig =
            serde_json::from_reader(buf).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(config)
    }

    // Period of the control loop, falling back to the default
    // when the configured value can't be used
    pub fn sample_interval(&self) -> Duration {
        let seconds = self.time_to_update;

        // Non finite, negative, too large or rounding down to zero
        match Duration::try_from_secs_f64(seconds) {
            Ok(interval) if !interval.is_zero() => interval,
            _ => {
                warn!(
                    "time_to_update ({seconds}) is invalid, defaulting to \
                     {DEFAULT_UPDATE_SECONDS} seconds"
                );

                Duration::from_secs_f64(DEFAULT_UPDATE_SECONDS)
            }
        }
    }

    // Convert the configured ranges into a validated policy table
    pub fn policy_table(&self) -> Result<PolicyTable, ConfigError> {
        let bands = self
            .temperature_ranges
            .iter()
            .enumerate()
            .map(|(index, range)| range.to_band(index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PolicyTable::new(bands, self.sample_interval())?)
    }
}

impl TemperatureRangeConfig {
    fn to_band(&self, index: usize) -> Result<TemperatureBand, ConfigError> {
        let fan_speed = u32::try_from(self.fan_speed)
            .ok()
            .filter(|speed| *speed <= 100)
            .ok_or_else(|| ConfigError::InvalidRange {
                index,
                reason: format!(
                    "fan_speed {} is outside 0..=100",
                    self.fan_speed
                ),
            })?;

        let hysteresis = u32::try_from(self.hysteresis).map_err(|_| {
            ConfigError::InvalidRange {
                index,
                reason: format!("hysteresis {} is negative", self.hysteresis),
            }
        })?;

        Ok(TemperatureBand::new(
            self.min_temperature,
            self.max_temperature,
            fan_speed,
            hysteresis,
        ))
    }
}

// Load the configuration file and build the policy table from it
pub fn load_policy(path: &Path) -> Result<(DaemonConfig, PolicyTable), ConfigError> {
    let config = DaemonConfig::load(path)?;
    let table = config.policy_table()?;

    info!(
        "Configuration loaded: {} temperature range(s), update every {:?}",
        table.bands().len(),
        table.sample_interval()
    );

    Ok((config, table))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const REFERENCE: &str = r#"{
        "time_to_update": 2,
        "temperature_ranges": [
            { "min_temperature": -999, "max_temperature": 50, "fan_speed": 0, "hysteresis": 0 },
            { "min_temperature": 50, "max_temperature": 60, "fan_speed": 40, "hysteresis": 8 },
            { "min_temperature": 60, "max_temperature": 65, "fan_speed": 55, "hysteresis": 2 }
        ]
    }"#;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_reference_configuration() {
        let file = write_config(REFERENCE);

        let (config, table) = load_policy(file.path()).unwrap();

        assert!(config.restore_auto_on_exit);
        assert_eq!(table.sample_interval(), Duration::from_secs(2));
        assert_eq!(table.bands().len(), 3);
        assert_eq!(table.bands()[1], TemperatureBand::new(50, 60, 40, 8));
    }

    #[test]
    fn fractional_interval_is_kept() {
        let config = DaemonConfig {
            time_to_update: 0.5,
            temperature_ranges: vec![],
            restore_auto_on_exit: true,
        };

        assert_eq!(config.sample_interval(), Duration::from_millis(500));
    }

    #[test]
    fn non_positive_interval_falls_back_to_default() {
        for value in [0., -3., f64::NAN, f64::INFINITY, 1e-12] {
            let config = DaemonConfig {
                time_to_update: value,
                temperature_ranges: vec![],
                restore_auto_on_exit: true,
            };

            assert_eq!(config.sample_interval(), Duration::from_secs(5));
        }
    }

    #[test]
    fn missing_interval_falls_back_to_default() {
        let file = write_config(
            r#"{ "temperature_ranges": [
                { "min_temperature": 0, "max_temperature": 100, "fan_speed": 60, "hysteresis": 0 }
            ], "restore_auto_on_exit": false }"#,
        );

        let (config, table) = load_policy(file.path()).unwrap();

        assert!(!config.restore_auto_on_exit);
        assert_eq!(table.sample_interval(), Duration::from_secs(5));
    }

    #[test]
    fn interval_rounding_to_zero_still_loads() {
        let file = write_config(
            r#"{ "time_to_update": 1e-12, "temperature_ranges": [
                { "min_temperature": 0, "max_temperature": 100, "fan_speed": 60, "hysteresis": 0 }
            ] }"#,
        );

        let (_, table) = load_policy(file.path()).unwrap();

        assert_eq!(table.sample_interval(), Duration::from_secs(5));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = DaemonConfig::load(&dir.path().join("config.json")).unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let file = write_config("{ \"time_to_update\": 5, ");

        let err = DaemonConfig::load(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn fan_speed_above_100_is_rejected() {
        let file = write_config(
            r#"{ "time_to_update": 1, "temperature_ranges": [
                { "min_temperature": 0, "max_temperature": 100, "fan_speed": 120, "hysteresis": 0 }
            ] }"#,
        );

        let err = load_policy(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidRange { index: 0, .. }));
    }

    #[test]
    fn negative_hysteresis_is_rejected() {
        let file = write_config(
            r#"{ "time_to_update": 1, "temperature_ranges": [
                { "min_temperature": 0, "max_temperature": 50, "fan_speed": 20, "hysteresis": 0 },
                { "min_temperature": 50, "max_temperature": 100, "fan_speed": 80, "hysteresis": -2 }
            ] }"#,
        );

        let err = load_policy(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidRange { index: 1, .. }));
    }

    #[test]
    fn empty_table_is_rejected() {
        let file = write_config(r#"{ "time_to_update": 1, "temperature_ranges": [] }"#);

        let err = load_policy(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::Policy(PolicyError::EmptyTable)));
    }
}
