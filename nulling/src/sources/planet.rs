//! Planet model.
//!
//! A planet is unresolved: its brightness is concentrated in the single grid
//! cell nearest to its angular separation from the host star.

use std::f64::consts::PI;

use log::debug;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use uom::si::solid_angle::steradian;

use super::{blackbody_for, needs_rebuild, PhotonSource, SkyCoordinates, SkyMaps, SourceError};
use crate::context::{ContextGeometry, ObservationContext};
use crate::grid::{index_of_closest, meshgrid};
use crate::units::{
    validate_length, validate_mass, validate_positive_length, validate_temperature, Angle,
    AngleExt, Length, LengthExt, Mass, Quantity, SolidAngle, Temperature, UnitValidationError,
};

const MAP_MARGIN: f64 = 1.05;

/// Unvalidated planet description, as read from a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetParameters {
    pub name: String,
    pub temperature: Quantity,
    pub radius: Quantity,
    pub mass: Quantity,
    pub star_separation_x: Quantity,
    pub star_separation_y: Quantity,
    pub star_distance: Quantity,
    pub grid_size: usize,
    pub number_of_wavelength_bins: usize,
}

/// A planet with validated physical parameters.
///
/// Separations are projected on the sky plane and may be negative.
#[derive(Debug, Clone)]
pub struct Planet {
    name: String,
    temperature: Temperature,
    radius: Length,
    mass: Mass,
    star_separation_x: Length,
    star_separation_y: Length,
    star_distance: Length,
    grid_size: usize,
    number_of_wavelength_bins: usize,
    maps: Option<SkyMaps>,
}

impl Planet {
    /// Validate every field against its physical dimension.
    ///
    /// # Errors
    /// [`UnitValidationError`] naming the first offending field.
    pub fn new(parameters: &PlanetParameters) -> Result<Self, UnitValidationError> {
        Ok(Self {
            name: parameters.name.clone(),
            temperature: validate_temperature("temperature", &parameters.temperature)?,
            radius: validate_positive_length("radius", &parameters.radius)?,
            mass: validate_mass("mass", &parameters.mass)?,
            star_separation_x: validate_length("star_separation_x", &parameters.star_separation_x)?,
            star_separation_y: validate_length("star_separation_y", &parameters.star_separation_y)?,
            star_distance: validate_positive_length("star_distance", &parameters.star_distance)?,
            grid_size: parameters.grid_size,
            number_of_wavelength_bins: parameters.number_of_wavelength_bins,
            maps: None,
        })
    }

    pub fn radius(&self) -> Length {
        self.radius
    }

    pub fn mass(&self) -> Mass {
        self.mass
    }

    pub fn star_distance(&self) -> Length {
        self.star_distance
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn number_of_wavelength_bins(&self) -> usize {
        self.number_of_wavelength_bins
    }

    pub fn star_angular_separation_x(&self) -> Angle {
        Angle::from_radians(self.star_separation_x.as_meters() / self.star_distance.as_meters())
    }

    pub fn star_angular_separation_y(&self) -> Angle {
        Angle::from_radians(self.star_separation_y.as_meters() / self.star_distance.as_meters())
    }

    /// Sky coordinates at the planet's own grid size.
    ///
    /// The map spans the larger absolute separation plus a 5% margin, so the
    /// planet always falls inside it.
    pub fn get_sky_coordinate_maps(&self) -> Result<SkyCoordinates, SourceError> {
        let largest = self
            .star_angular_separation_x()
            .as_arcseconds()
            .abs()
            .max(self.star_angular_separation_y().as_arcseconds().abs());
        let (x, y) = meshgrid(2.0 * (MAP_MARGIN * largest), self.grid_size)?;
        Ok(SkyCoordinates { x, y })
    }

    /// `(row, col)` of the grid cell nearest to the planet
    pub fn shape_index(&self) -> Result<(usize, usize), SourceError> {
        let coordinates = self.get_sky_coordinate_maps()?;
        self.shape_index_in(&coordinates)
    }

    fn shape_index_in(&self, coordinates: &SkyCoordinates) -> Result<(usize, usize), SourceError> {
        let col = index_of_closest(
            coordinates.x.row(0).iter(),
            self.star_angular_separation_x().as_arcseconds(),
        )?;
        let row = index_of_closest(
            coordinates.y.column(0).iter(),
            self.star_angular_separation_y().as_arcseconds(),
        )?;
        Ok((row, col))
    }

    /// Indicator map with a single 1 at [`Planet::shape_index`].
    ///
    /// The position snaps to the nearest cell; there is no sub-pixel
    /// distribution of the flux.
    pub fn get_shape_map(&self) -> Result<Array2<f64>, SourceError> {
        let coordinates = self.get_sky_coordinate_maps()?;
        self.shape_map_in(&coordinates)
    }

    fn shape_map_in(&self, coordinates: &SkyCoordinates) -> Result<Array2<f64>, SourceError> {
        let mut shape = Array2::zeros(coordinates.x.dim());
        shape[self.shape_index_in(coordinates)?] = 1.0;
        Ok(shape)
    }

    fn check_context(&self, geometry: &ContextGeometry) -> Result<(), SourceError> {
        if self.grid_size != geometry.grid_size {
            return Err(SourceError::ContextMismatch {
                source_name: self.name.clone(),
                parameter: "grid_size",
                source_value: self.grid_size,
                context_value: geometry.grid_size,
            });
        }
        let bins = geometry.number_of_wavelength_bins();
        if self.number_of_wavelength_bins != bins {
            return Err(SourceError::ContextMismatch {
                source_name: self.name.clone(),
                parameter: "number_of_wavelength_bins",
                source_value: self.number_of_wavelength_bins,
                context_value: bins,
            });
        }
        Ok(())
    }

    fn build_maps(&self, geometry: ContextGeometry) -> Result<SkyMaps, SourceError> {
        let coordinates = self.get_sky_coordinate_maps()?;
        let shape = self.shape_map_in(&coordinates)?;
        let flux = blackbody_for(self.temperature, self.solid_angle(), &geometry)?;
        Ok(SkyMaps::from_spatial_profile(
            geometry,
            coordinates,
            flux,
            &shape,
        ))
    }
}

impl PhotonSource for Planet {
    fn name(&self) -> &str {
        &self.name
    }

    fn temperature(&self) -> Temperature {
        self.temperature
    }

    fn solid_angle(&self) -> SolidAngle {
        let ratio = self.radius.as_meters() / self.star_distance.as_meters();
        SolidAngle::new::<steradian>(PI * ratio.powi(2))
    }

    /// The planet carries its own grid size and bin count; both must agree
    /// with the context.
    fn prepare(&mut self, context: &ObservationContext) -> Result<&SkyMaps, SourceError> {
        let geometry = context.geometry();
        self.check_context(&geometry)?;
        if needs_rebuild(&self.maps, &geometry) {
            debug!(
                "{}: placing planet at ({:.4}, {:.4}) arcsec on a {}x{} grid",
                self.name,
                self.star_angular_separation_x().as_arcseconds(),
                self.star_angular_separation_y().as_arcseconds(),
                geometry.grid_size,
                geometry.grid_size
            );
            self.maps = Some(self.build_maps(geometry)?);
        }
        self.maps
            .as_ref()
            .ok_or_else(|| SourceError::NotPrepared(self.name.clone()))
    }

    fn sky_maps(&self) -> Option<&SkyMaps> {
        self.maps.as_ref()
    }

    fn invalidate(&mut self) {
        self.maps = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TimeRange;
    use crate::instrument::InstrumentParameters;
    use crate::units::Unit;
    use approx::assert_relative_eq;

    fn earth_at_10pc(grid_size: usize, bins: usize) -> PlanetParameters {
        PlanetParameters {
            name: "Earth".to_string(),
            temperature: Quantity::new(254.0, Unit::Kelvin),
            radius: Quantity::new(1.0, Unit::EarthRadius),
            mass: Quantity::new(1.0, Unit::EarthMass),
            star_separation_x: Quantity::new(1.0, Unit::AstronomicalUnit),
            star_separation_y: Quantity::new(0.5, Unit::AstronomicalUnit),
            star_distance: Quantity::new(10.0, Unit::Parsec),
            grid_size,
            number_of_wavelength_bins: bins,
        }
    }

    fn context(grid_size: usize, bins: usize) -> ObservationContext {
        let instrument = InstrumentParameters::uniform(
            &Quantity::new(4.0, Unit::Micrometer),
            &Quantity::new(18.5, Unit::Micrometer),
            bins,
        )
        .unwrap();
        let time_range = TimeRange::new(
            &Quantity::new(0.0, Unit::Second),
            &Quantity::new(1.0, Unit::Day),
            10,
        )
        .unwrap();
        ObservationContext::new(grid_size, time_range, instrument).unwrap()
    }

    #[test]
    fn test_angular_separation() {
        let planet = Planet::new(&earth_at_10pc(9, 4)).unwrap();
        assert_relative_eq!(
            planet.star_angular_separation_x().as_arcseconds(),
            0.1,
            max_relative = 1e-9
        );
        assert_relative_eq!(
            planet.star_angular_separation_y().as_arcseconds(),
            0.05,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_solid_angle() {
        let planet = Planet::new(&earth_at_10pc(9, 4)).unwrap();
        let ratio = 6.378_1e6 / 3.085_677_581_491_367_3e17;
        assert_relative_eq!(
            planet.solid_angle().get::<steradian>(),
            PI * ratio * ratio,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_shape_map_snaps_to_nearest_cell() {
        let planet = Planet::new(&earth_at_10pc(9, 4)).unwrap();
        // Axis runs -0.105..0.105 arcsec in steps of 0.02625
        assert_eq!(planet.shape_index().unwrap(), (6, 8));

        let shape = planet.get_shape_map().unwrap();
        assert_eq!(shape.dim(), (9, 9));
        assert_eq!(shape.sum(), 1.0);
        assert_eq!(shape[[6, 8]], 1.0);
    }

    #[test]
    fn test_negative_separation_uses_absolute_extent() {
        let mut parameters = earth_at_10pc(11, 4);
        parameters.star_separation_x = Quantity::new(-1.0, Unit::AstronomicalUnit);
        parameters.star_separation_y = Quantity::new(0.2, Unit::AstronomicalUnit);
        let planet = Planet::new(&parameters).unwrap();

        let coordinates = planet.get_sky_coordinate_maps().unwrap();
        assert_relative_eq!(coordinates.x[[0, 10]], 0.105, max_relative = 1e-9);
        assert_eq!(planet.shape_index().unwrap().1, 0);
    }

    #[test]
    fn test_planet_at_origin_has_degenerate_map() {
        let mut parameters = earth_at_10pc(5, 4);
        parameters.star_separation_x = Quantity::new(0.0, Unit::AstronomicalUnit);
        parameters.star_separation_y = Quantity::new(0.0, Unit::AstronomicalUnit);
        let planet = Planet::new(&parameters).unwrap();
        assert_eq!(planet.shape_index().unwrap(), (0, 0));
    }

    #[test]
    fn test_brightness_is_shape_times_flux() {
        let mut planet = Planet::new(&earth_at_10pc(9, 4)).unwrap();
        let maps = planet.prepare(&context(9, 4)).unwrap();
        let brightness = maps.brightness();
        assert_eq!(brightness.dim(), (4, 9, 9));
        for (w, flux) in maps.mean_spectral_flux_density().iter().enumerate() {
            assert!(*flux > 0.0);
            assert_eq!(brightness[[w, 6, 8]], *flux);
            assert_relative_eq!(brightness.index_axis(ndarray::Axis(0), w).sum(), *flux);
        }
    }

    #[test]
    fn test_context_mismatch_rejected() {
        let mut planet = Planet::new(&earth_at_10pc(9, 4)).unwrap();
        let err = planet.prepare(&context(16, 4)).unwrap_err();
        assert_eq!(
            err,
            SourceError::ContextMismatch {
                source_name: "Earth".to_string(),
                parameter: "grid_size",
                source_value: 9,
                context_value: 16,
            }
        );
        assert!(matches!(
            planet.prepare(&context(9, 5)),
            Err(SourceError::ContextMismatch {
                parameter: "number_of_wavelength_bins",
                ..
            })
        ));
        assert!(planet.sky_maps().is_none());
    }

    #[test]
    fn test_unit_errors_name_the_field() {
        let mut parameters = earth_at_10pc(9, 4);
        parameters.star_separation_y = Quantity::new(3.0, Unit::Kelvin);
        assert_eq!(
            Planet::new(&parameters).unwrap_err().field(),
            "star_separation_y"
        );

        let mut parameters = earth_at_10pc(9, 4);
        parameters.star_distance = Quantity::new(0.0, Unit::Parsec);
        assert_eq!(Planet::new(&parameters).unwrap_err().field(), "star_distance");
    }
}
