//! Nulling-interferometer sky model and planet extraction
//!
//! This crate models stars and planets as blackbody emitters with angular
//! extent on the sky, renders their brightness onto a square sky grid, and
//! recovers a planet's position and flux from differential photon counts by
//! maximum-likelihood matched filtering against per-position templates.

pub mod config;
pub mod context;
pub mod extraction;
pub mod grid;
pub mod instrument;
pub mod matrix;
pub mod photometry;
pub mod pipeline;
pub mod shared_args;
pub mod sources;
pub mod synthetic;
pub mod units;

// Re-exports for easier access
pub use config::ScenarioConfig;
pub use context::{ObservationContext, TimeRange};
pub use extraction::{extract, ExtractionError, ExtractionResult};
pub use grid::{index_of_closest, meshgrid};
pub use instrument::InstrumentParameters;
pub use photometry::create_blackbody_spectrum;
pub use pipeline::{run_scenario, ScenarioRun};
pub use sources::{PhotonSource, Planet, PlanetParameters, Source, Star, StarParameters};
pub use synthetic::SyntheticInterferometer;
pub use units::{Quantity, Unit, UnitValidationError};
