//! Synthetic differential photon counts for exercising the extraction.
//!
//! A deliberately simple two-aperture response: the baseline rotates with
//! the array, a point source at sky offset `θ` produces the fringe phase
//! `φ = 2π (b(t) · θ) / λ`, and output `o` records `sin(φ + o·π/N)`. Counts
//! scale with the collecting area of one aperture, the bin width and the
//! exposure of one time sample.
//!
//! This is a test harness, not an observatory model: there is no null depth,
//! throughput, detector or leakage model.

use std::f64::consts::PI;

use log::debug;
use nalgebra::Vector2;
use ndarray::{s, Array1, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use thiserror::Error;
use uom::si::time::second;

use crate::context::ObservationContext;
use crate::matrix::rotation_matrix_2d;
use crate::sources::{SkyCoordinates, SkyMaps};
use crate::units::{Angle, AngleExt, Length, LengthExt, Time};

/// Errors that can occur while configuring the synthetic interferometer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntheticError {
    #[error("{name} must be positive and finite, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("At least one differential output is required")]
    NoOutputs,
    #[error("Observation time range has zero duration")]
    ZeroDuration,
    #[error("Noise level must be non-negative and finite, got {0}")]
    InvalidNoise(f64),
    #[error("Spectrum has {found} bins but the context has {expected}")]
    SpectrumLength { expected: usize, found: usize },
    #[error(
        "Sky maps were prepared for {found_bins} bins on a {found_grid}x{found_grid} grid, \
         the context has {expected_bins} bins on {expected_grid}x{expected_grid}"
    )]
    GeometryMismatch {
        expected_bins: usize,
        expected_grid: usize,
        found_bins: usize,
        found_grid: usize,
    },
}

/// Rotating single-baseline interferometer with phase-shifted outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticInterferometer {
    baseline: Length,
    aperture_diameter: Length,
    rotation_period: Time,
    number_of_outputs: usize,
}

/// Per-context sampling shared by every cube the interferometer renders
struct Sampling {
    times_s: Array1<f64>,
    wavelengths_m: Vec<f64>,
    widths_um: Vec<f64>,
    exposure_s: f64,
}

impl SyntheticInterferometer {
    pub fn new(
        baseline: Length,
        aperture_diameter: Length,
        rotation_period: Time,
        number_of_outputs: usize,
    ) -> Result<Self, SyntheticError> {
        for (name, value) in [
            ("baseline", baseline.as_meters()),
            ("aperture_diameter", aperture_diameter.as_meters()),
            ("rotation_period", rotation_period.get::<second>()),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SyntheticError::InvalidParameter { name, value });
            }
        }
        if number_of_outputs == 0 {
            return Err(SyntheticError::NoOutputs);
        }
        Ok(Self {
            baseline,
            aperture_diameter,
            rotation_period,
            number_of_outputs,
        })
    }

    pub fn number_of_outputs(&self) -> usize {
        self.number_of_outputs
    }

    /// Collecting area of one aperture in m²
    pub fn aperture_area_m2(&self) -> f64 {
        PI * (self.aperture_diameter.as_meters() / 2.0).powi(2)
    }

    /// Normalised response of one output to a point source.
    pub fn response(
        &self,
        x_arcsec: f64,
        y_arcsec: f64,
        time_s: f64,
        wavelength_m: f64,
        output: usize,
    ) -> f64 {
        let rotation = rotation_matrix_2d(time_s, self.rotation_period.get::<second>());
        let baseline = rotation * Vector2::new(self.baseline.as_meters(), 0.0);
        let offset = Vector2::new(
            Angle::from_arcseconds(x_arcsec).as_radians(),
            Angle::from_arcseconds(y_arcsec).as_radians(),
        );
        let phase = 2.0 * PI * baseline.dot(&offset) / wavelength_m;
        (phase + output as f64 * PI / self.number_of_outputs as f64).sin()
    }

    fn sampling(&self, context: &ObservationContext) -> Result<Sampling, SyntheticError> {
        let duration_s = context.time_range.duration().get::<second>();
        if duration_s <= 0.0 {
            return Err(SyntheticError::ZeroDuration);
        }
        Ok(Sampling {
            times_s: context.time_range.times_s(),
            wavelengths_m: context.instrument.bin_centers_m(),
            widths_um: context
                .instrument
                .wavelength_bin_widths
                .iter()
                .map(|w| w.as_micrometers())
                .collect(),
            exposure_s: duration_s / context.time_range.steps as f64,
        })
    }

    fn render_point(
        &self,
        sampling: &Sampling,
        x_arcsec: f64,
        y_arcsec: f64,
        spectrum: &[f64],
    ) -> Array3<f64> {
        let area = self.aperture_area_m2();
        let shape = (
            self.number_of_outputs,
            sampling.times_s.len(),
            sampling.wavelengths_m.len(),
        );
        Array3::from_shape_fn(shape, |(output, step, bin)| {
            let photons =
                spectrum[bin] * area * sampling.widths_um[bin] * sampling.exposure_s;
            photons
                * self.response(
                    x_arcsec,
                    y_arcsec,
                    sampling.times_s[step],
                    sampling.wavelengths_m[bin],
                    output,
                )
        })
    }

    /// Counts from a point source with the given spectral flux density per bin
    pub fn point_source_counts(
        &self,
        context: &ObservationContext,
        x_arcsec: f64,
        y_arcsec: f64,
        spectrum: &[f64],
    ) -> Result<Array3<f64>, SyntheticError> {
        let expected = context.instrument.number_of_wavelength_bins();
        if spectrum.len() != expected {
            return Err(SyntheticError::SpectrumLength {
                expected,
                found: spectrum.len(),
            });
        }
        let sampling = self.sampling(context)?;
        Ok(self.render_point(&sampling, x_arcsec, y_arcsec, spectrum))
    }

    /// One unit-flux template per cell of `coordinates`, row-major.
    pub fn templates(
        &self,
        context: &ObservationContext,
        coordinates: &SkyCoordinates,
    ) -> Result<Vec<Array3<f64>>, SyntheticError> {
        let sampling = self.sampling(context)?;
        let unit = vec![1.0; sampling.wavelengths_m.len()];
        let positions: Vec<(f64, f64)> = coordinates
            .x
            .iter()
            .zip(coordinates.y.iter())
            .map(|(x, y)| (*x, *y))
            .collect();

        debug!(
            "Rendering {} templates of shape ({}, {}, {})",
            positions.len(),
            self.number_of_outputs,
            sampling.times_s.len(),
            unit.len()
        );

        Ok(positions
            .par_iter()
            .map(|(x, y)| self.render_point(&sampling, *x, *y, &unit))
            .collect())
    }

    /// Noise-free counts of every lit pixel in a source's sky maps.
    ///
    /// The maps must have been prepared for a context with the same geometry.
    pub fn source_counts(
        &self,
        context: &ObservationContext,
        maps: &SkyMaps,
    ) -> Result<Array3<f64>, SyntheticError> {
        let geometry = context.geometry();
        if maps.geometry() != &geometry {
            return Err(SyntheticError::GeometryMismatch {
                expected_bins: geometry.number_of_wavelength_bins(),
                expected_grid: geometry.grid_size,
                found_bins: maps.geometry().number_of_wavelength_bins(),
                found_grid: maps.geometry().grid_size,
            });
        }
        let sampling = self.sampling(context)?;
        let brightness = maps.brightness();
        let coordinates = maps.coordinates();
        let mut counts = Array3::zeros((
            self.number_of_outputs,
            sampling.times_s.len(),
            sampling.wavelengths_m.len(),
        ));

        for ((row, col), x) in coordinates.x.indexed_iter() {
            let spectrum = brightness.slice(s![.., row, col]).to_vec();
            if spectrum.iter().all(|&f| f == 0.0) {
                continue;
            }
            counts += &self.render_point(&sampling, *x, coordinates.y[[row, col]], &spectrum);
        }

        Ok(counts)
    }

    /// Counts of all sources plus Gaussian noise.
    ///
    /// The noise standard deviation is `noise_level` times the RMS of the
    /// noise-free counts. The same seed always yields the same cube.
    pub fn measurement(
        &self,
        context: &ObservationContext,
        sources: &[&SkyMaps],
        noise_level: f64,
        seed: u64,
    ) -> Result<Array3<f64>, SyntheticError> {
        if !noise_level.is_finite() || noise_level < 0.0 {
            return Err(SyntheticError::InvalidNoise(noise_level));
        }
        let sampling = self.sampling(context)?;
        let mut counts = Array3::zeros((
            self.number_of_outputs,
            sampling.times_s.len(),
            sampling.wavelengths_m.len(),
        ));
        for maps in sources {
            counts += &self.source_counts(context, maps)?;
        }

        let rms = (counts.mapv(|c| c * c).sum() / counts.len() as f64).sqrt();
        let std_dev = noise_level * rms;
        if std_dev > 0.0 {
            let normal = Normal::new(0.0, std_dev)
                .map_err(|_| SyntheticError::InvalidNoise(noise_level))?;
            let mut rng = StdRng::seed_from_u64(seed);
            counts.mapv_inplace(|c| c + normal.sample(&mut rng));
        }
        debug!("Synthetic measurement RMS {rms:.3e}, noise sigma {std_dev:.3e}");

        Ok(counts)
    }
}
