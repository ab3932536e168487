//! Observation context passed explicitly to source-geometry and extraction code.

use ndarray::Array1;
use thiserror::Error;
use uom::si::time::second;

use crate::grid::linspace;
use crate::instrument::InstrumentParameters;
use crate::units::{validate_time, Length, Quantity, Time, UnitValidationError};

/// Errors that can occur while defining an observation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContextError {
    #[error(transparent)]
    Units(#[from] UnitValidationError),
    #[error("Grid size must be a positive integer")]
    EmptyGrid,
    #[error("Time range needs at least one sample")]
    NoTimeSteps,
    #[error("Time range end ({end_s} s) precedes its start ({start_s} s)")]
    ReversedTimeRange { start_s: f64, end_s: f64 },
}

/// Sampled observation window
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRange {
    pub start: Time,
    pub end: Time,
    pub steps: usize,
}

impl TimeRange {
    pub fn new(start: &Quantity, end: &Quantity, steps: usize) -> Result<Self, ContextError> {
        let start = validate_time("time_range.start", start)?;
        let end = validate_time("time_range.end", end)?;
        if steps == 0 {
            return Err(ContextError::NoTimeSteps);
        }
        if end < start {
            return Err(ContextError::ReversedTimeRange {
                start_s: start.get::<second>(),
                end_s: end.get::<second>(),
            });
        }
        Ok(Self { start, end, steps })
    }

    /// Sample times in seconds, start and end inclusive
    pub fn times_s(&self) -> Array1<f64> {
        linspace(
            self.start.get::<second>(),
            self.end.get::<second>(),
            self.steps,
        )
    }

    /// Duration of the window
    pub fn duration(&self) -> Time {
        self.end - self.start
    }
}

/// Everything an observing run fixes for the sources it looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationContext {
    pub grid_size: usize,
    pub time_range: TimeRange,
    pub instrument: InstrumentParameters,
}

impl ObservationContext {
    pub fn new(
        grid_size: usize,
        time_range: TimeRange,
        instrument: InstrumentParameters,
    ) -> Result<Self, ContextError> {
        if grid_size == 0 {
            return Err(ContextError::EmptyGrid);
        }
        Ok(Self {
            grid_size,
            time_range,
            instrument,
        })
    }

    /// The part of the context that derived sky maps depend on
    pub fn geometry(&self) -> ContextGeometry {
        ContextGeometry {
            grid_size: self.grid_size,
            wavelength_range: (
                self.instrument.wavelength_range_lower_limit,
                self.instrument.wavelength_range_upper_limit,
            ),
            wavelength_bin_centers: self.instrument.wavelength_bin_centers.clone(),
            wavelength_bin_widths: self.instrument.wavelength_bin_widths.clone(),
        }
    }
}

/// Cache key for per-context sky maps.
///
/// Two contexts with equal geometry produce identical maps for a source.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextGeometry {
    pub grid_size: usize,
    pub wavelength_range: (Length, Length),
    pub wavelength_bin_centers: Vec<Length>,
    pub wavelength_bin_widths: Vec<Length>,
}

impl ContextGeometry {
    pub fn number_of_wavelength_bins(&self) -> usize {
        self.wavelength_bin_centers.len()
    }
}
