//! Blackbody photon spectra binned onto the instrument's wavelength grid.
//!
//! Sources are modelled as uniform Planck emitters. For every wavelength bin
//! the photon spectral radiance is integrated across the bin, averaged over
//! the bin width and scaled by the solid angle the source subtends, giving a
//! mean spectral photon flux density in photons s⁻¹ m⁻² µm⁻¹.

use ndarray::Array1;
use thiserror::Error;

use super::trapezoid::trap_integrate_fn;
use crate::units::{Length, LengthExt, SolidAngle, Temperature, TemperatureExt};
use uom::si::solid_angle::steradian;

/// Physical constants in SI units
pub struct SI {}

impl SI {
    /// Planck's constant in J s
    pub const PLANCK_CONSTANT: f64 = 6.626_070_15e-34;

    /// Speed of light in vacuum in m/s
    pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

    /// Boltzmann constant in J/K
    pub const BOLTZMANN_CONSTANT: f64 = 1.380_649e-23;
}

/// Trapezoids used per wavelength bin
const SUBINTERVALS_PER_BIN: usize = 64;

/// Relative slack when checking bins against the instrument range
const RANGE_TOLERANCE: f64 = 1e-9;

/// Errors that can occur while building a blackbody spectrum
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlackbodyError {
    #[error("Blackbody temperature must be positive and finite, got {0} K")]
    InvalidTemperature(f64),
    #[error("Solid angle must be non-negative and finite, got {0} sr")]
    InvalidSolidAngle(f64),
    #[error("Wavelength bin centers ({centers}) and widths ({widths}) differ in length")]
    MismatchedBins { centers: usize, widths: usize },
    #[error("Wavelength bin {index} [{lower_um} um, {upper_um} um] is not a positive interval inside the instrument range")]
    BinOutsideRange {
        index: usize,
        lower_um: f64,
        upper_um: f64,
    },
}

/// Planck photon spectral radiance.
///
/// # Arguments
/// * `wavelength_m` - Wavelength in meters
/// * `temperature_k` - Temperature in Kelvin
///
/// # Returns
/// Photon radiance in photons s⁻¹ m⁻² sr⁻¹ per meter of wavelength
pub fn planck_photon_radiance(wavelength_m: f64, temperature_k: f64) -> f64 {
    if wavelength_m <= 0.0 {
        return 0.0;
    }
    let exponent = SI::PLANCK_CONSTANT * SI::SPEED_OF_LIGHT
        / (wavelength_m * SI::BOLTZMANN_CONSTANT * temperature_k);

    // exp_m1 overflows to infinity in the Wien tail, which correctly yields zero
    2.0 * SI::SPEED_OF_LIGHT / (wavelength_m.powi(4) * exponent.exp_m1())
}

/// Mean spectral photon flux density per wavelength bin of a blackbody source.
///
/// # Arguments
/// * `temperature` - Effective temperature of the emitter
/// * `wavelength_range_lower_limit` - Instrument short-wavelength cutoff
/// * `wavelength_range_upper_limit` - Instrument long-wavelength cutoff
/// * `wavelength_bin_centers` - Bin centers, same order as the widths
/// * `wavelength_bin_widths` - Bin widths
/// * `solid_angle` - Solid angle the source subtends on the sky
///
/// # Returns
/// One value per bin in photons s⁻¹ m⁻² µm⁻¹
pub fn create_blackbody_spectrum(
    temperature: Temperature,
    wavelength_range_lower_limit: Length,
    wavelength_range_upper_limit: Length,
    wavelength_bin_centers: &[Length],
    wavelength_bin_widths: &[Length],
    solid_angle: SolidAngle,
) -> Result<Array1<f64>, BlackbodyError> {
    let temperature_k = temperature.as_kelvin();
    if !temperature_k.is_finite() || temperature_k <= 0.0 {
        return Err(BlackbodyError::InvalidTemperature(temperature_k));
    }

    let solid_angle_sr = solid_angle.get::<steradian>();
    if !solid_angle_sr.is_finite() || solid_angle_sr < 0.0 {
        return Err(BlackbodyError::InvalidSolidAngle(solid_angle_sr));
    }

    if wavelength_bin_centers.len() != wavelength_bin_widths.len() {
        return Err(BlackbodyError::MismatchedBins {
            centers: wavelength_bin_centers.len(),
            widths: wavelength_bin_widths.len(),
        });
    }

    let range_lower = wavelength_range_lower_limit.as_meters();
    let range_upper = wavelength_range_upper_limit.as_meters();
    let slack = (range_upper - range_lower).abs() * RANGE_TOLERANCE;

    let mut spectrum = Array1::zeros(wavelength_bin_centers.len());
    for (index, (center, width)) in wavelength_bin_centers
        .iter()
        .zip(wavelength_bin_widths)
        .enumerate()
    {
        let half_width = width.as_meters() / 2.0;
        let lower = center.as_meters() - half_width;
        let upper = center.as_meters() + half_width;

        if !(lower > 0.0 && upper > lower)
            || lower < range_lower - slack
            || upper > range_upper + slack
        {
            return Err(BlackbodyError::BinOutsideRange {
                index,
                lower_um: lower * 1e6,
                upper_um: upper * 1e6,
            });
        }

        let integral = trap_integrate_fn(
            |wavelength| planck_photon_radiance(wavelength, temperature_k),
            lower,
            upper,
            SUBINTERVALS_PER_BIN,
        );

        // Mean over the bin per meter of wavelength, then per micrometer
        let mean_per_meter = integral / (upper - lower);
        spectrum[index] = mean_per_meter * 1e-6 * solid_angle_sr;
    }

    Ok(spectrum)
}
