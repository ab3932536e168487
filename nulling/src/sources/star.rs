//! Host star model.
//!
//! The star is a uniform disk: its sky-brightness map is a binary mask of the
//! stellar disk scaled by the blackbody flux density of each wavelength bin.
//! No limb darkening is modelled.

use std::f64::consts::PI;

use log::debug;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use uom::si::power::watt;
use uom::si::solid_angle::steradian;

use super::{blackbody_for, needs_rebuild, PhotonSource, SkyCoordinates, SkyMaps, SourceError};
use crate::context::{ContextGeometry, ObservationContext};
use crate::grid::meshgrid;
use crate::units::{
    validate_angle, validate_luminosity, validate_mass, validate_positive_length,
    validate_temperature, Angle, AngleExt, Length, LengthExt, Luminosity, Mass, Quantity,
    SolidAngle, Temperature, TemperatureExt, UnitValidationError, AU_M_EXACT, SOLAR_LUMINOSITY_W,
};

/// Margin added around the stellar disk so it is fully covered by the map
const MAP_MARGIN: f64 = 1.05;

/// Effective solar temperature the Kopparapu fits are centred on, in Kelvin
const SOLAR_EFFECTIVE_TEMPERATURE_K: f64 = 5780.0;

/// Kopparapu et al. (2013) coefficients: (S_eff_sun, a, b, c)
const HZ_INNER_COEFFICIENTS: [f64; 4] = [1.7665, 1.3351E-4, 3.1515E-9, -3.3488E-12];
const HZ_OUTER_COEFFICIENTS: [f64; 4] = [0.3240, 5.3221E-5, 1.4288E-9, -1.1049E-12];

/// Unvalidated star description, as read from a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarParameters {
    pub name: String,
    pub temperature: Quantity,
    pub radius: Quantity,
    pub mass: Quantity,
    pub distance: Quantity,
    pub luminosity: Quantity,
    pub right_ascension: Quantity,
    pub declination: Quantity,
}

/// A star with validated physical parameters.
#[derive(Debug, Clone)]
pub struct Star {
    name: String,
    temperature: Temperature,
    radius: Length,
    mass: Mass,
    distance: Length,
    luminosity: Luminosity,
    right_ascension: Angle,
    declination: Angle,
    maps: Option<SkyMaps>,
}

impl Star {
    /// Validate every field against its physical dimension.
    ///
    /// # Errors
    /// [`UnitValidationError`] naming the first offending field.
    pub fn new(parameters: &StarParameters) -> Result<Self, UnitValidationError> {
        Ok(Self {
            name: parameters.name.clone(),
            temperature: validate_temperature("temperature", &parameters.temperature)?,
            radius: validate_positive_length("radius", &parameters.radius)?,
            mass: validate_mass("mass", &parameters.mass)?,
            distance: validate_positive_length("distance", &parameters.distance)?,
            luminosity: validate_luminosity("luminosity", &parameters.luminosity)?,
            right_ascension: validate_angle("right_ascension", &parameters.right_ascension)?,
            declination: validate_angle("declination", &parameters.declination)?,
            maps: None,
        })
    }

    pub fn radius(&self) -> Length {
        self.radius
    }

    pub fn mass(&self) -> Mass {
        self.mass
    }

    pub fn distance(&self) -> Length {
        self.distance
    }

    pub fn luminosity(&self) -> Luminosity {
        self.luminosity
    }

    pub fn right_ascension(&self) -> Angle {
        self.right_ascension
    }

    pub fn declination(&self) -> Angle {
        self.declination
    }

    /// Angular radius of the stellar disk
    pub fn angular_radius(&self) -> Angle {
        Angle::from_radians(self.radius.as_meters() / self.distance.as_meters())
    }

    /// Central habitable-zone distance after Kopparapu et al. (2013).
    ///
    /// The inner (runaway greenhouse) and outer (maximum greenhouse) flux
    /// limits are evaluated as cubic polynomials in `T - 5780 K`; each limit
    /// gives a distance `sqrt(L / S)` in au and the result is their mean.
    pub fn habitable_zone_central_radius(&self) -> Length {
        let temperature_difference = self.temperature.as_kelvin() - SOLAR_EFFECTIVE_TEMPERATURE_K;
        let luminosity_solar = self.luminosity.get::<watt>() / SOLAR_LUMINOSITY_W;

        let incident_flux = |[s_sun, a, b, c]: [f64; 4]| {
            s_sun
                + a * temperature_difference
                + b * temperature_difference.powi(2)
                + c * temperature_difference.powi(3)
        };

        let radius_inner = (luminosity_solar / incident_flux(HZ_INNER_COEFFICIENTS)).sqrt();
        let radius_outer = (luminosity_solar / incident_flux(HZ_OUTER_COEFFICIENTS)).sqrt();
        Length::from_meters((radius_outer + radius_inner) / 2.0 * AU_M_EXACT)
    }

    /// Central habitable-zone distance as seen from the observer
    pub fn habitable_zone_central_angular_radius(&self) -> Angle {
        Angle::from_radians(self.habitable_zone_central_radius().as_meters() / self.distance.as_meters())
    }

    /// Sky coordinates covering the disk plus a 5% margin on each side
    pub fn sky_coordinates(&self, grid_size: usize) -> Result<SkyCoordinates, SourceError> {
        let extent = 2.0 * (MAP_MARGIN * self.angular_radius().as_arcseconds());
        let (x, y) = meshgrid(extent, grid_size)?;
        Ok(SkyCoordinates { x, y })
    }

    fn build_maps(&self, geometry: ContextGeometry) -> Result<SkyMaps, SourceError> {
        let coordinates = self.sky_coordinates(geometry.grid_size)?;
        let mask = disk_mask(&coordinates, self.angular_radius().as_arcseconds());
        let flux = blackbody_for(self.temperature, self.solid_angle(), &geometry)?;
        Ok(SkyMaps::from_spatial_profile(
            geometry,
            coordinates,
            flux,
            &mask,
        ))
    }
}

/// Binary mask that is 1 where a pixel lies within `radius_arcsec` of the
/// map centre and 0 elsewhere.
pub fn disk_mask(coordinates: &SkyCoordinates, radius_arcsec: f64) -> Array2<f64> {
    coordinates
        .radius_map()
        .mapv(|r| if r <= radius_arcsec { 1.0 } else { 0.0 })
}

impl PhotonSource for Star {
    fn name(&self) -> &str {
        &self.name
    }

    fn temperature(&self) -> Temperature {
        self.temperature
    }

    fn solid_angle(&self) -> SolidAngle {
        // Derived from radius/distance directly rather than from angular_radius()
        let ratio = self.radius.as_meters() / self.distance.as_meters();
        SolidAngle::new::<steradian>(PI * ratio.powi(2))
    }

    fn prepare(&mut self, context: &ObservationContext) -> Result<&SkyMaps, SourceError> {
        let geometry = context.geometry();
        if needs_rebuild(&self.maps, &geometry) {
            debug!(
                "{}: building sky maps on a {}x{} grid with {} wavelength bins",
                self.name,
                geometry.grid_size,
                geometry.grid_size,
                geometry.number_of_wavelength_bins()
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

    fn sun_at_10pc() -> StarParameters {
        StarParameters {
            name: "Sun".to_string(),
            temperature: Quantity::new(5780.0, Unit::Kelvin),
            radius: Quantity::new(1.0, Unit::SolarRadius),
            mass: Quantity::new(1.0, Unit::SolarMass),
            distance: Quantity::new(10.0, Unit::Parsec),
            luminosity: Quantity::new(1.0, Unit::SolarLuminosity),
            right_ascension: Quantity::new(10.0, Unit::Degree),
            declination: Quantity::new(45.0, Unit::Degree),
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
    fn test_each_field_is_validated() {
        let cases: [(&str, fn(&mut StarParameters)); 7] = [
            ("temperature", |p| p.temperature = Quantity::new(1.0, Unit::Meter)),
            ("radius", |p| p.radius = Quantity::new(1.0, Unit::Kilogram)),
            ("mass", |p| p.mass = Quantity::new(1.0, Unit::Kelvin)),
            ("distance", |p| p.distance = Quantity::unitless(10.0)),
            ("luminosity", |p| p.luminosity = Quantity::new(1.0, Unit::Second)),
            ("right_ascension", |p| p.right_ascension = Quantity::new(1.0, Unit::Meter)),
            ("declination", |p| p.declination = Quantity::unitless(1.0)),
        ];

        for (field, corrupt) in cases {
            let mut parameters = sun_at_10pc();
            corrupt(&mut parameters);
            let err = Star::new(&parameters).unwrap_err();
            assert_eq!(err.field(), field);
        }
    }

    #[test]
    fn test_angular_radius_of_sun_at_10pc() {
        let star = Star::new(&sun_at_10pc()).unwrap();
        // R_sun / 10 pc ≈ 4.65e-4 arcsec
        assert_relative_eq!(
            star.angular_radius().as_arcseconds(),
            4.650_467e-4,
            max_relative = 1e-5
        );
    }

    #[test]
    fn test_solid_angle_matches_angular_radius() {
        let star = Star::new(&sun_at_10pc()).unwrap();
        let radius_rad = star.angular_radius().as_radians();
        assert_relative_eq!(
            star.solid_angle().get::<steradian>(),
            PI * radius_rad * radius_rad,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_habitable_zone_of_the_sun() {
        let star = Star::new(&sun_at_10pc()).unwrap();
        let expected_au = ((1.0 / 1.7665f64).sqrt() + (1.0 / 0.3240f64).sqrt()) / 2.0;
        assert_relative_eq!(
            star.habitable_zone_central_radius().as_au(),
            expected_au,
            max_relative = 1e-12
        );
        // 1.2 au at 10 pc is ~0.12 arcsec
        assert_relative_eq!(
            star.habitable_zone_central_angular_radius().as_arcseconds(),
            expected_au / 10.0,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_habitable_zone_of_m_dwarf() {
        let mut parameters = sun_at_10pc();
        parameters.temperature = Quantity::new(3300.0, Unit::Kelvin);
        parameters.luminosity = Quantity::new(0.012, Unit::SolarLuminosity);
        let star = Star::new(&parameters).unwrap();

        // dT = -2480 K: S_inner = 1.505857405, S_outer = 0.217652642
        // sqrt(0.012 / S) = 0.089268595 au and 0.234805708 au
        assert_relative_eq!(
            star.habitable_zone_central_radius().as_au(),
            0.162_037_151_634,
            max_relative = 1e-10
        );
    }

    #[test]
    fn test_habitable_zone_grows_with_luminosity() {
        let mut previous = 0.0;
        for luminosity in [0.01, 0.1, 0.5, 1.0, 2.0, 10.0, 100.0] {
            let mut parameters = sun_at_10pc();
            parameters.luminosity = Quantity::new(luminosity, Unit::SolarLuminosity);
            parameters.temperature = Quantity::new(4500.0, Unit::Kelvin);
            let radius = Star::new(&parameters)
                .unwrap()
                .habitable_zone_central_radius()
                .as_meters();
            assert!(radius >= previous);
            previous = radius;
        }
    }

    #[test]
    fn test_sky_coordinates_cover_disk_with_margin() {
        let star = Star::new(&sun_at_10pc()).unwrap();
        let coordinates = star.sky_coordinates(21).unwrap();
        let radius = star.angular_radius().as_arcseconds();
        assert_relative_eq!(coordinates.x[[0, 0]], -1.05 * radius, max_relative = 1e-12);
        assert_relative_eq!(coordinates.x[[0, 20]], 1.05 * radius, max_relative = 1e-12);
        assert_relative_eq!(coordinates.y[[20, 0]], 1.05 * radius, max_relative = 1e-12);
    }

    #[test]
    fn test_brightness_only_inside_disk() {
        let mut star = Star::new(&sun_at_10pc()).unwrap();
        let radius = star.angular_radius().as_arcseconds();
        let maps = star.prepare(&context(33, 4)).unwrap();
        let radius_map = maps.coordinates().radius_map();

        assert_eq!(maps.brightness().dim(), (4, 33, 33));
        for (w, flux) in maps.mean_spectral_flux_density().iter().enumerate() {
            assert!(*flux > 0.0);
            for ((row, col), r) in radius_map.indexed_iter() {
                let value = maps.brightness()[[w, row, col]];
                if *r <= radius {
                    assert_eq!(value, *flux);
                } else {
                    assert_eq!(value, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_disk_mask_shrinks_with_radius() {
        let (x, y) = meshgrid(2.0, 41).unwrap();
        let coordinates = SkyCoordinates { x, y };
        let counts: Vec<f64> = [0.95, 0.7, 0.5, 0.3]
            .iter()
            .map(|r| disk_mask(&coordinates, *r).sum())
            .collect();
        for pair in counts.windows(2) {
            assert!(pair[1] < pair[0], "{counts:?}");
        }
    }

    #[test]
    fn test_maps_cached_until_geometry_changes() {
        let mut star = Star::new(&sun_at_10pc()).unwrap();
        let ctx = context(16, 3);
        let first = star.prepare(&ctx).unwrap().clone();
        assert_eq!(star.prepare(&ctx).unwrap(), &first);
        assert_eq!(star.sky_maps().unwrap().geometry(), &ctx.geometry());

        star.prepare(&context(24, 3)).unwrap();
        assert_eq!(star.sky_maps().unwrap().brightness().dim(), (3, 24, 24));

        star.invalidate();
        assert!(star.sky_maps().is_none());
    }

    #[test]
    fn test_accessors_ignore_time_index() {
        let mut star = Star::new(&sun_at_10pc()).unwrap();
        assert!(matches!(
            star.get_sky_coordinates(0, 0),
            Err(SourceError::NotPrepared(_))
        ));

        star.prepare(&context(8, 2)).unwrap();
        assert_eq!(
            star.get_sky_coordinates(0, 0).unwrap(),
            star.get_sky_coordinates(5, 1).unwrap()
        );
        assert_eq!(
            star.get_sky_brightness_distribution(0, 1).unwrap(),
            star.get_sky_brightness_distribution(7, 1).unwrap()
        );
        assert!(matches!(
            star.get_sky_brightness_distribution(0, 2),
            Err(SourceError::WavelengthIndexOutOfRange { index: 2, bins: 2 })
        ));
    }
}
