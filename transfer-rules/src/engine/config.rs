//! Validation configuration for the transfer engine.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Configuration parameters for transfer validation.
///
/// Missing fields take their defaults when read from a scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Ground time at or above which a domestic or transborder transfer
    /// is a stopover (minutes).
    pub domestic_stopover_mins: i64,

    /// Ground time at or above which an international or foreign-domestic
    /// transfer is a stopover (minutes).
    pub international_stopover_mins: i64,

    /// The journey is priced as round the world.
    pub round_the_world: bool,

    /// Skip the surface sector checks entirely.
    pub exclude_surface_checks: bool,

    /// Repeat the surface sector checks during pricing-unit validation.
    pub validate_surfaces_for_fare_path: bool,

    /// Fare-component validation does not soft-pass minimum-transfer
    /// rules on fares that are not one-way.
    pub full_fare_market_validation: bool,
}

impl ValidationConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(
        domestic_stopover_mins: i64,
        international_stopover_mins: i64,
        round_the_world: bool,
        exclude_surface_checks: bool,
        validate_surfaces_for_fare_path: bool,
        full_fare_market_validation: bool,
    ) -> Self {
        Self {
            domestic_stopover_mins,
            international_stopover_mins,
            round_the_world,
            exclude_surface_checks,
            validate_surfaces_for_fare_path,
            full_fare_market_validation,
        }
    }

    /// Returns the domestic stopover threshold as a Duration.
    pub fn domestic_stopover(&self) -> Duration {
        Duration::minutes(self.domestic_stopover_mins)
    }

    /// Returns the international stopover threshold as a Duration.
    pub fn international_stopover(&self) -> Duration {
        Duration::minutes(self.international_stopover_mins)
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            domestic_stopover_mins: 240,       // 4 hours
            international_stopover_mins: 1440, // 24 hours
            round_the_world: false,
            exclude_surface_checks: false,
            validate_surfaces_for_fare_path: false,
            full_fare_market_validation: false,
        }
    }
}
