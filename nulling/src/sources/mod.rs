//! Photon sources observed by the interferometer.
//!
//! The set of source kinds is closed: a [`Source`] is either a [`Star`] or a
//! [`Planet`]. Both expose the [`PhotonSource`] capabilities (angular geometry,
//! sky-coordinate map, sky-brightness cube) so callers can treat a target
//! system uniformly.
//!
//! # Caching
//!
//! Angular scalars are cheap and recomputed on every call. The coordinate map
//! and the brightness cube are computed by [`PhotonSource::prepare`] for one
//! [`ObservationContext`] and kept until a context with different
//! [`ContextGeometry`] is prepared.

pub mod planet;
pub mod star;

use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use thiserror::Error;

use crate::context::{ContextGeometry, ObservationContext};
use crate::grid::GridError;
use crate::photometry::blackbody::{create_blackbody_spectrum, BlackbodyError};
use crate::units::{SolidAngle, Temperature, UnitValidationError};

pub use planet::{Planet, PlanetParameters};
pub use star::{Star, StarParameters};

/// Errors raised while deriving sky maps for a source
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error(transparent)]
    Units(#[from] UnitValidationError),
    #[error(transparent)]
    Blackbody(#[from] BlackbodyError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("{source_name}: {parameter} is {source_value} but the observation context uses {context_value}")]
    ContextMismatch {
        source_name: String,
        parameter: &'static str,
        source_value: usize,
        context_value: usize,
    },
    #[error("{0}: sky maps requested before the source was prepared for a context")]
    NotPrepared(String),
    #[error("Wavelength index {index} out of range for {bins} bins")]
    WavelengthIndexOutOfRange { index: usize, bins: usize },
}

/// Angular sky coordinates of a source's map, in arcseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyCoordinates {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
}

impl SkyCoordinates {
    /// Radial distance of every pixel from the map centre, in arcseconds
    pub fn radius_map(&self) -> Array2<f64> {
        ndarray::Zip::from(&self.x)
            .and(&self.y)
            .map_collect(|x, y| (x * x + y * y).sqrt())
    }

    pub fn grid_size(&self) -> usize {
        self.x.nrows()
    }
}

/// Maps derived for one source under one context geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyMaps {
    geometry: ContextGeometry,
    coordinates: SkyCoordinates,
    mean_spectral_flux_density: Array1<f64>,
    brightness: Array3<f64>,
}

impl SkyMaps {
    /// Combine a spatial weight map with a per-bin flux density.
    ///
    /// `brightness[[w, row, col]] = spatial[[row, col]] * flux[w]`
    pub(crate) fn from_spatial_profile(
        geometry: ContextGeometry,
        coordinates: SkyCoordinates,
        mean_spectral_flux_density: Array1<f64>,
        spatial: &Array2<f64>,
    ) -> Self {
        let (rows, cols) = spatial.dim();
        let mut brightness = Array3::zeros((mean_spectral_flux_density.len(), rows, cols));
        for (mut slice, flux) in brightness
            .axis_iter_mut(Axis(0))
            .zip(mean_spectral_flux_density.iter())
        {
            slice.assign(&(spatial * *flux));
        }

        Self {
            geometry,
            coordinates,
            mean_spectral_flux_density,
            brightness,
        }
    }

    pub fn geometry(&self) -> &ContextGeometry {
        &self.geometry
    }

    pub fn coordinates(&self) -> &SkyCoordinates {
        &self.coordinates
    }

    /// Mean spectral photon flux density per bin, photons s⁻¹ m⁻² µm⁻¹
    pub fn mean_spectral_flux_density(&self) -> &Array1<f64> {
        &self.mean_spectral_flux_density
    }

    /// Brightness cube indexed `(wavelength, row, col)`
    pub fn brightness(&self) -> &Array3<f64> {
        &self.brightness
    }

    fn brightness_at(&self, wavelength_index: usize) -> Result<ArrayView2<'_, f64>, SourceError> {
        let bins = self.brightness.len_of(Axis(0));
        if wavelength_index >= bins {
            return Err(SourceError::WavelengthIndexOutOfRange {
                index: wavelength_index,
                bins,
            });
        }
        Ok(self.brightness.index_axis(Axis(0), wavelength_index))
    }
}

fn needs_rebuild(cache: &Option<SkyMaps>, geometry: &ContextGeometry) -> bool {
    cache
        .as_ref()
        .map_or(true, |maps| maps.geometry() != geometry)
}

fn blackbody_for(
    temperature: Temperature,
    solid_angle: SolidAngle,
    geometry: &ContextGeometry,
) -> Result<Array1<f64>, BlackbodyError> {
    create_blackbody_spectrum(
        temperature,
        geometry.wavelength_range.0,
        geometry.wavelength_range.1,
        &geometry.wavelength_bin_centers,
        &geometry.wavelength_bin_widths,
        solid_angle,
    )
}

/// Capabilities shared by every photon source
pub trait PhotonSource {
    fn name(&self) -> &str;

    fn temperature(&self) -> Temperature;

    /// Solid angle the source subtends on the sky
    fn solid_angle(&self) -> SolidAngle;

    /// Compute (or reuse) the sky maps for `context`.
    fn prepare(&mut self, context: &ObservationContext) -> Result<&SkyMaps, SourceError>;

    /// Maps from the last [`PhotonSource::prepare`] call, if any
    fn sky_maps(&self) -> Option<&SkyMaps>;

    /// Drop cached maps
    fn invalidate(&mut self);

    /// Sky coordinates at a time step and wavelength bin.
    ///
    /// Sources are static within a context, so both indices are accepted for
    /// interface symmetry and the same map is returned.
    fn get_sky_coordinates(
        &self,
        _time_index: usize,
        _wavelength_index: usize,
    ) -> Result<&SkyCoordinates, SourceError> {
        self.sky_maps()
            .map(SkyMaps::coordinates)
            .ok_or_else(|| SourceError::NotPrepared(self.name().to_string()))
    }

    /// Brightness map of one wavelength bin. The time index is ignored.
    fn get_sky_brightness_distribution(
        &self,
        _time_index: usize,
        wavelength_index: usize,
    ) -> Result<ArrayView2<'_, f64>, SourceError> {
        self.sky_maps()
            .ok_or_else(|| SourceError::NotPrepared(self.name().to_string()))?
            .brightness_at(wavelength_index)
    }
}

/// A photon source in a target system
#[derive(Debug, Clone)]
pub enum Source {
    Star(Star),
    Planet(Planet),
}

impl PhotonSource for Source {
    fn name(&self) -> &str {
        match self {
            Source::Star(star) => star.name(),
            Source::Planet(planet) => planet.name(),
        }
    }

    fn temperature(&self) -> Temperature {
        match self {
            Source::Star(star) => star.temperature(),
            Source::Planet(planet) => planet.temperature(),
        }
    }

    fn solid_angle(&self) -> SolidAngle {
        match self {
            Source::Star(star) => star.solid_angle(),
            Source::Planet(planet) => planet.solid_angle(),
        }
    }

    fn prepare(&mut self, context: &ObservationContext) -> Result<&SkyMaps, SourceError> {
        match self {
            Source::Star(star) => star.prepare(context),
            Source::Planet(planet) => planet.prepare(context),
        }
    }

    fn sky_maps(&self) -> Option<&SkyMaps> {
        match self {
            Source::Star(star) => star.sky_maps(),
            Source::Planet(planet) => planet.sky_maps(),
        }
    }

    fn invalidate(&mut self) {
        match self {
            Source::Star(star) => star.invalidate(),
            Source::Planet(planet) => planet.invalidate(),
        }
    }
}

impl From<Star> for Source {
    fn from(star: Star) -> Self {
        Source::Star(star)
    }
}

impl From<Planet> for Source {
    fn from(planet: Planet) -> Self {
        Source::Planet(planet)
    }
}
