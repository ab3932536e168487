//! Spectral binning of the interferometer's science channel.

use thiserror::Error;

use crate::units::{validate_positive_length, Length, LengthExt, Quantity, UnitValidationError};

/// Errors that can occur while defining the instrument's wavelength bins
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstrumentError {
    #[error(transparent)]
    Units(#[from] UnitValidationError),
    #[error("Wavelength range lower limit {lower_um} um must be below the upper limit {upper_um} um")]
    InvalidRange { lower_um: f64, upper_um: f64 },
    #[error("At least one wavelength bin is required")]
    NoBins,
    #[error("Wavelength bin centers ({centers}) and widths ({widths}) differ in length")]
    MismatchedBins { centers: usize, widths: usize },
    #[error("Wavelength bin centers must be strictly increasing (bin {0})")]
    UnorderedBins(usize),
}

/// Wavelength range and binning supplied by the instrument model.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentParameters {
    pub wavelength_range_lower_limit: Length,
    pub wavelength_range_upper_limit: Length,
    pub wavelength_bin_centers: Vec<Length>,
    pub wavelength_bin_widths: Vec<Length>,
}

impl InstrumentParameters {
    /// Build instrument parameters from explicit bins.
    ///
    /// Centers must be strictly increasing and every value must be a
    /// positive length.
    pub fn new(
        wavelength_range_lower_limit: &Quantity,
        wavelength_range_upper_limit: &Quantity,
        wavelength_bin_centers: &[Quantity],
        wavelength_bin_widths: &[Quantity],
    ) -> Result<Self, InstrumentError> {
        let lower =
            validate_positive_length("wavelength_range_lower_limit", wavelength_range_lower_limit)?;
        let upper =
            validate_positive_length("wavelength_range_upper_limit", wavelength_range_upper_limit)?;

        let centers = wavelength_bin_centers
            .iter()
            .map(|q| validate_positive_length("wavelength_bin_centers", q))
            .collect::<Result<Vec<_>, _>>()?;
        let widths = wavelength_bin_widths
            .iter()
            .map(|q| validate_positive_length("wavelength_bin_widths", q))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_lengths(lower, upper, centers, widths)
    }

    /// Split `[lower, upper]` into `number_of_bins` equal-width bins.
    pub fn uniform(
        wavelength_range_lower_limit: &Quantity,
        wavelength_range_upper_limit: &Quantity,
        number_of_bins: usize,
    ) -> Result<Self, InstrumentError> {
        let lower =
            validate_positive_length("wavelength_range_lower_limit", wavelength_range_lower_limit)?;
        let upper =
            validate_positive_length("wavelength_range_upper_limit", wavelength_range_upper_limit)?;
        if number_of_bins == 0 {
            return Err(InstrumentError::NoBins);
        }

        let lower_m = lower.as_meters();
        let width_m = (upper.as_meters() - lower_m) / number_of_bins as f64;
        let centers = (0..number_of_bins)
            .map(|i| Length::from_meters(lower_m + width_m * (i as f64 + 0.5)))
            .collect();
        let widths = vec![Length::from_meters(width_m); number_of_bins];

        Self::from_lengths(lower, upper, centers, widths)
    }

    fn from_lengths(
        lower: Length,
        upper: Length,
        centers: Vec<Length>,
        widths: Vec<Length>,
    ) -> Result<Self, InstrumentError> {
        if lower >= upper {
            return Err(InstrumentError::InvalidRange {
                lower_um: lower.as_micrometers(),
                upper_um: upper.as_micrometers(),
            });
        }
        if centers.is_empty() {
            return Err(InstrumentError::NoBins);
        }
        if centers.len() != widths.len() {
            return Err(InstrumentError::MismatchedBins {
                centers: centers.len(),
                widths: widths.len(),
            });
        }
        if let Some(index) = centers.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(InstrumentError::UnorderedBins(index + 1));
        }

        Ok(Self {
            wavelength_range_lower_limit: lower,
            wavelength_range_upper_limit: upper,
            wavelength_bin_centers: centers,
            wavelength_bin_widths: widths,
        })
    }

    /// Number of wavelength bins
    pub fn number_of_wavelength_bins(&self) -> usize {
        self.wavelength_bin_centers.len()
    }

    /// Bin centers in meters
    pub fn bin_centers_m(&self) -> Vec<f64> {
        self.wavelength_bin_centers
            .iter()
            .map(<Length as LengthExt>::as_meters)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;
    use approx::assert_relative_eq;

    fn um(value: f64) -> Quantity {
        Quantity::new(value, Unit::Micrometer)
    }

    #[test]
    fn test_uniform_bins_tile_the_range() {
        let instrument = InstrumentParameters::uniform(&um(4.0), &um(18.0), 7).unwrap();
        assert_eq!(instrument.number_of_wavelength_bins(), 7);
        assert_relative_eq!(
            instrument.wavelength_bin_centers[0].as_micrometers(),
            5.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            instrument.wavelength_bin_centers[6].as_micrometers(),
            17.0,
            epsilon = 1e-9
        );
        let total: f64 = instrument
            .wavelength_bin_widths
            .iter()
            .map(|w| w.as_micrometers())
            .sum();
        assert_relative_eq!(total, 14.0, epsilon = 1e-9);
    }

    #[test]
    fn test_explicit_bins() {
        let instrument = InstrumentParameters::new(
            &um(4.0),
            &um(10.0),
            &[um(5.0), um(8.0)],
            &[um(2.0), um(4.0)],
        )
        .unwrap();
        assert_eq!(instrument.bin_centers_m().len(), 2);
    }

    #[test]
    fn test_rejects_bad_layouts() {
        assert_eq!(
            InstrumentParameters::uniform(&um(4.0), &um(18.0), 0),
            Err(InstrumentError::NoBins)
        );
        assert!(matches!(
            InstrumentParameters::uniform(&um(18.0), &um(4.0), 3),
            Err(InstrumentError::InvalidRange { .. })
        ));
        assert_eq!(
            InstrumentParameters::new(&um(4.0), &um(10.0), &[um(8.0), um(5.0)], &[um(1.0), um(1.0)]),
            Err(InstrumentError::UnorderedBins(1))
        );
        assert_eq!(
            InstrumentParameters::new(&um(4.0), &um(10.0), &[um(5.0)], &[]),
            Err(InstrumentError::MismatchedBins {
                centers: 1,
                widths: 0
            })
        );
    }

    #[test]
    fn test_rejects_non_length_units() {
        let err = InstrumentParameters::uniform(&Quantity::new(4.0, Unit::Kelvin), &um(18.0), 3)
            .unwrap_err();
        match err {
            InstrumentError::Units(inner) => {
                assert_eq!(inner.field(), "wavelength_range_lower_limit")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
