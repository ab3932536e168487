use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, ScenarioConfig};
use crate::units::Quantity;

/// Parse a quantity string such as "30 m"
fn parse_quantity(s: &str) -> Result<Quantity, String> {
    s.parse::<Quantity>()
}

/// Common arguments shared across nulling binaries
#[derive(Parser, Debug, Clone)]
pub struct SharedSimulationArgs {
    /// Scenario JSON file; the built-in Sun/Earth scenario when omitted
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// Seed for the measurement noise
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Noise standard deviation relative to the RMS of the noise-free counts
    #[arg(long, default_value_t = 0.1)]
    pub noise_level: f64,

    /// Override the sky grid size of the observation and the planet
    #[arg(long)]
    pub grid_size: Option<usize>,

    /// Override the interferometer baseline (format: "value unit", e.g. "30 m")
    #[arg(long, value_parser = parse_quantity)]
    pub baseline: Option<Quantity>,

    /// Override the number of differential outputs
    #[arg(long)]
    pub outputs: Option<usize>,

    /// Enable debug output
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

impl SharedSimulationArgs {
    /// Load the selected scenario and apply the command-line overrides
    pub fn load_scenario(&self) -> Result<ScenarioConfig, ConfigError> {
        let mut config = match &self.scenario {
            Some(path) => ScenarioConfig::from_path(path)?,
            None => ScenarioConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut ScenarioConfig) {
        if let Some(grid_size) = self.grid_size {
            config.observation.grid_size = grid_size;
            config.planet.grid_size = grid_size;
        }
        if let Some(baseline) = self.baseline {
            config.interferometer.baseline = baseline;
        }
        if let Some(outputs) = self.outputs {
            config.interferometer.number_of_outputs = outputs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;

    #[test]
    fn test_defaults() {
        let args = SharedSimulationArgs::parse_from(["nulling-extract"]);
        assert_eq!(args.seed, 7);
        assert!(args.scenario.is_none());
        assert_eq!(args.load_scenario().unwrap(), ScenarioConfig::default());
    }

    #[test]
    fn test_overrides_reach_planet_and_interferometer() {
        let args = SharedSimulationArgs::parse_from([
            "nulling-extract",
            "--grid-size",
            "15",
            "--baseline",
            "35 m",
            "--outputs",
            "4",
        ]);
        let config = args.load_scenario().unwrap();
        assert_eq!(config.observation.grid_size, 15);
        assert_eq!(config.planet.grid_size, 15);
        assert_eq!(config.interferometer.baseline, Quantity::new(35.0, Unit::Meter));
        assert_eq!(config.interferometer.number_of_outputs, 4);
    }

    #[test]
    fn test_bad_quantity_rejected() {
        assert!(
            SharedSimulationArgs::try_parse_from(["nulling-extract", "--baseline", "far"]).is_err()
        );
    }
}
