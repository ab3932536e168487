//! JSON scenario files.
//!
//! Quantities are written as strings with a unit, e.g. `"10 pc"`, and are
//! only checked against their dimension when the scenario is built into
//! validated entities.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{ContextError, ObservationContext, TimeRange};
use crate::instrument::{InstrumentError, InstrumentParameters};
use crate::sources::{Planet, PlanetParameters, Star, StarParameters};
use crate::synthetic::{SyntheticError, SyntheticInterferometer};
use crate::units::{
    validate_positive_length, validate_time, Quantity, Unit, UnitValidationError,
};

/// Errors that can occur while loading or building a scenario
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open scenario {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Units(#[from] UnitValidationError),
    #[error(transparent)]
    Instrument(#[from] InstrumentError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Synthetic(#[from] SyntheticError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationConfig {
    pub grid_size: usize,
    pub time_range_start: Quantity,
    pub time_range_end: Quantity,
    pub time_steps: usize,
}

/// Either an even split of the range or explicit bins, never both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum WavelengthBins {
    Uniform {
        number_of_wavelength_bins: usize,
    },
    Explicit {
        wavelength_bin_centers: Vec<Quantity>,
        wavelength_bin_widths: Vec<Quantity>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub wavelength_range_lower_limit: Quantity,
    pub wavelength_range_upper_limit: Quantity,
    pub bins: WavelengthBins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterferometerConfig {
    pub baseline: Quantity,
    pub aperture_diameter: Quantity,
    pub rotation_period: Quantity,
    pub number_of_outputs: usize,
}

impl Default for InterferometerConfig {
    fn default() -> Self {
        Self {
            baseline: Quantity::new(20.0, Unit::Meter),
            aperture_diameter: Quantity::new(2.0, Unit::Meter),
            rotation_period: Quantity::new(1.0, Unit::Day),
            number_of_outputs: 2,
        }
    }
}

/// Complete description of one simulated observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub observation: ObservationConfig,
    pub instrument: InstrumentConfig,
    pub star: StarParameters,
    pub planet: PlanetParameters,
    #[serde(default)]
    pub interferometer: InterferometerConfig,
}

impl Default for ScenarioConfig {
    /// A Sun twin at 10 pc with an Earth twin at 1 au, 0.5 au projected
    /// separation, observed for one day.
    fn default() -> Self {
        let grid_size = 9;
        let number_of_wavelength_bins = 10;
        Self {
            observation: ObservationConfig {
                grid_size,
                time_range_start: Quantity::new(0.0, Unit::Second),
                time_range_end: Quantity::new(1.0, Unit::Day),
                time_steps: 100,
            },
            instrument: InstrumentConfig {
                wavelength_range_lower_limit: Quantity::new(4.0, Unit::Micrometer),
                wavelength_range_upper_limit: Quantity::new(18.5, Unit::Micrometer),
                bins: WavelengthBins::Uniform {
                    number_of_wavelength_bins,
                },
            },
            star: StarParameters {
                name: "Sun Twin".to_string(),
                temperature: Quantity::new(5780.0, Unit::Kelvin),
                radius: Quantity::new(1.0, Unit::SolarRadius),
                mass: Quantity::new(1.0, Unit::SolarMass),
                distance: Quantity::new(10.0, Unit::Parsec),
                luminosity: Quantity::new(1.0, Unit::SolarLuminosity),
                right_ascension: Quantity::new(10.0, Unit::Degree),
                declination: Quantity::new(45.0, Unit::Degree),
            },
            planet: PlanetParameters {
                name: "Earth Twin".to_string(),
                temperature: Quantity::new(254.0, Unit::Kelvin),
                radius: Quantity::new(1.0, Unit::EarthRadius),
                mass: Quantity::new(1.0, Unit::EarthMass),
                star_separation_x: Quantity::new(1.0, Unit::AstronomicalUnit),
                star_separation_y: Quantity::new(0.5, Unit::AstronomicalUnit),
                star_distance: Quantity::new(10.0, Unit::Parsec),
                grid_size,
                number_of_wavelength_bins,
            },
            interferometer: InterferometerConfig::default(),
        }
    }
}

impl ScenarioConfig {
    /// Load a scenario from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn build_instrument(&self) -> Result<InstrumentParameters, ConfigError> {
        let lower = &self.instrument.wavelength_range_lower_limit;
        let upper = &self.instrument.wavelength_range_upper_limit;
        let instrument = match &self.instrument.bins {
            WavelengthBins::Uniform {
                number_of_wavelength_bins,
            } => InstrumentParameters::uniform(lower, upper, *number_of_wavelength_bins)?,
            WavelengthBins::Explicit {
                wavelength_bin_centers,
                wavelength_bin_widths,
            } => InstrumentParameters::new(
                lower,
                upper,
                wavelength_bin_centers,
                wavelength_bin_widths,
            )?,
        };
        Ok(instrument)
    }

    pub fn build_context(&self) -> Result<ObservationContext, ConfigError> {
        let time_range = TimeRange::new(
            &self.observation.time_range_start,
            &self.observation.time_range_end,
            self.observation.time_steps,
        )?;
        Ok(ObservationContext::new(
            self.observation.grid_size,
            time_range,
            self.build_instrument()?,
        )?)
    }

    pub fn build_star(&self) -> Result<Star, ConfigError> {
        Ok(Star::new(&self.star)?)
    }

    pub fn build_planet(&self) -> Result<Planet, ConfigError> {
        Ok(Planet::new(&self.planet)?)
    }

    pub fn build_interferometer(&self) -> Result<SyntheticInterferometer, ConfigError> {
        let config = &self.interferometer;
        Ok(SyntheticInterferometer::new(
            validate_positive_length("interferometer.baseline", &config.baseline)?,
            validate_positive_length("interferometer.aperture_diameter", &config.aperture_diameter)?,
            validate_time("interferometer.rotation_period", &config.rotation_period)?,
            config.number_of_outputs,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::PhotonSource;
    use std::io::Write;

    #[test]
    fn test_default_scenario_builds() {
        let config = ScenarioConfig::default();
        let context = config.build_context().unwrap();
        let mut star = config.build_star().unwrap();
        let mut planet = config.build_planet().unwrap();
        let interferometer = config.build_interferometer().unwrap();

        assert_eq!(context.instrument.number_of_wavelength_bins(), 10);
        assert_eq!(interferometer.number_of_outputs(), 2);
        star.prepare(&context).unwrap();
        planet.prepare(&context).unwrap();
    }

    #[test]
    fn test_round_trip_through_file() {
        let config = ScenarioConfig::default();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        serde_json::to_writer_pretty(&mut file, &config).unwrap();
        file.flush().unwrap();

        let loaded = ScenarioConfig::from_path(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_quantities_are_unit_strings() {
        let json = serde_json::to_value(ScenarioConfig::default()).unwrap();
        assert_eq!(json["star"]["distance"], "10 pc");
        assert_eq!(json["planet"]["radius"], "1 Rearth");
        assert_eq!(json["instrument"]["bins"]["number_of_wavelength_bins"], 10);
    }

    #[test]
    fn test_explicit_bins_and_missing_interferometer() {
        let mut json = serde_json::to_value(ScenarioConfig::default()).unwrap();
        json["instrument"]["bins"] = serde_json::json!({
            "wavelength_bin_centers": ["5 um", "8 um"],
            "wavelength_bin_widths": ["2 um", "4 um"]
        });
        json.as_object_mut().unwrap().remove("interferometer");

        let config: ScenarioConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.interferometer, InterferometerConfig::default());
        assert_eq!(config.build_instrument().unwrap().number_of_wavelength_bins(), 2);
    }

    #[test]
    fn test_mixed_bin_layouts_rejected() {
        let mut json = serde_json::to_value(ScenarioConfig::default()).unwrap();
        json["instrument"]["bins"] = serde_json::json!({
            "number_of_wavelength_bins": 3,
            "wavelength_bin_centers": ["5 um", "8 um"],
            "wavelength_bin_widths": ["2 um", "4 um"]
        });
        assert!(serde_json::from_value::<ScenarioConfig>(json.clone()).is_err());

        json["instrument"]["bins"] = serde_json::json!({
            "number_of_wavelength_bins": 3,
            "bin_count": 3
        });
        assert!(serde_json::from_value::<ScenarioConfig>(json).is_err());
    }

    #[test]
    fn test_unit_errors_surface_field_name() {
        let mut config = ScenarioConfig::default();
        config.star.luminosity = Quantity::new(1.0, Unit::Parsec);
        match config.build_star() {
            Err(ConfigError::Units(err)) => assert_eq!(err.field(), "luminosity"),
            other => panic!("unexpected result {other:?}"),
        }

        config.interferometer.baseline = Quantity::unitless(20.0);
        assert!(matches!(
            config.build_interferometer(),
            Err(ConfigError::Units(_))
        ));
    }

    #[test]
    fn test_malformed_quantity_rejected() {
        let mut json = serde_json::to_value(ScenarioConfig::default()).unwrap();
        json["star"]["radius"] = serde_json::json!("one Rsun");
        assert!(serde_json::from_value::<ScenarioConfig>(json).is_err());

        assert!(matches!(
            ScenarioConfig::from_path("/nonexistent/scenario.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
