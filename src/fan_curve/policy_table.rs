use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::fan_curve::TemperatureBand;

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("the temperature table contains no bands")]
    EmptyTable,
    #[error("band {index}: {reason}")]
    InvalidBand { index: usize, reason: String },
    #[error("the sample interval must be greater than zero")]
    ZeroInterval,
}

// The operator defined temperature table.
// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyTable {
    bands: Vec<TemperatureBand>,
    sample_interval: Duration,
}

impl PolicyTable {
    // Validate the bands and build the table.
    // Bands must be listed by ascending minimum temperature, gaps and
    // overlaps between neighbours are accepted but reported
    pub fn new(
        bands: Vec<TemperatureBand>,
        sample_interval: Duration,
    ) -> Result<Self, PolicyError> {
        if bands.is_empty() {
            return Err(PolicyError::EmptyTable);
        }

        if sample_interval.is_zero() {
            return Err(PolicyError::ZeroInterval);
        }

        for (index, band) in bands.iter().enumerate() {
            if band.min_temperature > band.max_temperature {
                return Err(PolicyError::InvalidBand {
                    index,
                    reason: format!(
                        "min_temperature {} is above max_temperature {}",
                        band.min_temperature, band.max_temperature
                    ),
                });
            }
        }

        for (index, pair) in bands.windows(2).enumerate() {
            let (lower, upper) = (&pair[0], &pair[1]);

            if upper.min_temperature < lower.min_temperature {
                return Err(PolicyError::InvalidBand {
                    index: index + 1,
                    reason: format!(
                        "min_temperature {} is below the previous band's {}",
                        upper.min_temperature, lower.min_temperature
                    ),
                });
            }

            if upper.min_temperature > lower.max_temperature.saturating_add(1) {
                warn!(
                    "Gap between band {} and band {}: {}°C..{}°C is not covered",
                    index,
                    index + 1,
                    lower.max_temperature,
                    upper.min_temperature
                );
            } else if upper.min_temperature < lower.max_temperature {
                warn!(
                    "Band {} overlaps band {} between {}°C and {}°C",
                    index + 1,
                    index,
                    upper.min_temperature,
                    lower.max_temperature
                );
            }
        }

        Ok(Self {
            bands,
            sample_interval,
        })
    }

    // Return the band whose interval contains the temperature.
    //
    // Both ends of a band are inclusive. When several bands match the
    // last one listed wins, except on a shared edge (a band starting
    // exactly where the previous one ends): that value belongs to the
    // lower band.
    pub fn resolve(&self, temp: i32) -> Option<&TemperatureBand> {
        let mut found = None;
        let mut previous: Option<&TemperatureBand> = None;

        for band in self.bands.iter() {
            let shared_edge = previous.is_some_and(|p| {
                p.max_temperature == band.min_temperature
            });

            if band.contains(temp)
                && !(shared_edge && temp == band.min_temperature)
            {
                found = Some(band);
            }

            previous = Some(band);
        }

        found
    }

    pub fn bands(&self) -> &[TemperatureBand] {
        &self.bands
    }

    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }
}
