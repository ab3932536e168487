//! Type-safe physical units for photon-source modelling
//!
//! Entity parameters arrive as loosely typed [`Quantity`] values (a number and
//! an optional unit tag, usually parsed from a scenario file such as `"10 pc"`).
//! The `validate_*` functions check the tag against the dimension a field
//! requires and convert it into a strongly typed `uom` quantity, so everything
//! past construction works with compile-time checked units.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uom::si::angle::{degree, radian, second as arcsecond};
use uom::si::length::{kilometer, meter, micrometer, nanometer};
use uom::si::mass::kilogram;
use uom::si::power::watt;
use uom::si::thermodynamic_temperature::{degree_celsius, kelvin};
use uom::si::time::{day, hour, second};

pub use uom::si::f64::{Angle, Length, Mass, Power, SolidAngle, ThermodynamicTemperature, Time};

/// Type alias for temperature with convenient methods
pub type Temperature = ThermodynamicTemperature;

/// Type alias for luminosity, a radiated power
pub type Luminosity = Power;

/// IAU 2012 exact astronomical unit in meters
pub const AU_M_EXACT: f64 = 149_597_870_700.0;

/// Parsec in meters (648000/π au)
pub const PARSEC_M: f64 = 3.085_677_581_491_367_3e16;

/// Julian light year in meters
pub const LIGHT_YEAR_M: f64 = 9.460_730_472_580_8e15;

/// IAU 2015 nominal solar radius in meters
pub const SOLAR_RADIUS_M: f64 = 6.957e8;

/// Equatorial Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6.378_1e6;

/// Equatorial Jupiter radius in meters
pub const JUPITER_RADIUS_M: f64 = 7.149_2e7;

/// Solar mass in kilograms
pub const SOLAR_MASS_KG: f64 = 1.988_409_87e30;

/// Earth mass in kilograms
pub const EARTH_MASS_KG: f64 = 5.972_167_87e24;

/// Jupiter mass in kilograms
pub const JUPITER_MASS_KG: f64 = 1.898_124_6e27;

/// IAU 2015 nominal solar luminosity in watts
pub const SOLAR_LUMINOSITY_W: f64 = 3.828e26;

/// Physical dimension a field is declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Length,
    Mass,
    Temperature,
    Luminosity,
    Angle,
    Time,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Length => "length",
            Dimension::Mass => "mass",
            Dimension::Temperature => "temperature",
            Dimension::Luminosity => "luminosity",
            Dimension::Angle => "angle",
            Dimension::Time => "time",
        };
        f.write_str(name)
    }
}

/// Unit tags accepted on input quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Meter,
    Kilometer,
    Micrometer,
    Nanometer,
    AstronomicalUnit,
    Parsec,
    LightYear,
    SolarRadius,
    EarthRadius,
    JupiterRadius,
    Kilogram,
    SolarMass,
    EarthMass,
    JupiterMass,
    Kelvin,
    Celsius,
    Watt,
    SolarLuminosity,
    Radian,
    Degree,
    Arcsecond,
    Milliarcsecond,
    Second,
    Hour,
    Day,
}

impl Unit {
    const ALL: [Unit; 25] = [
        Unit::Meter,
        Unit::Kilometer,
        Unit::Micrometer,
        Unit::Nanometer,
        Unit::AstronomicalUnit,
        Unit::Parsec,
        Unit::LightYear,
        Unit::SolarRadius,
        Unit::EarthRadius,
        Unit::JupiterRadius,
        Unit::Kilogram,
        Unit::SolarMass,
        Unit::EarthMass,
        Unit::JupiterMass,
        Unit::Kelvin,
        Unit::Celsius,
        Unit::Watt,
        Unit::SolarLuminosity,
        Unit::Radian,
        Unit::Degree,
        Unit::Arcsecond,
        Unit::Milliarcsecond,
        Unit::Second,
        Unit::Hour,
        Unit::Day,
    ];

    /// Dimension this unit measures
    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Meter
            | Unit::Kilometer
            | Unit::Micrometer
            | Unit::Nanometer
            | Unit::AstronomicalUnit
            | Unit::Parsec
            | Unit::LightYear
            | Unit::SolarRadius
            | Unit::EarthRadius
            | Unit::JupiterRadius => Dimension::Length,
            Unit::Kilogram | Unit::SolarMass | Unit::EarthMass | Unit::JupiterMass => {
                Dimension::Mass
            }
            Unit::Kelvin | Unit::Celsius => Dimension::Temperature,
            Unit::Watt | Unit::SolarLuminosity => Dimension::Luminosity,
            Unit::Radian | Unit::Degree | Unit::Arcsecond | Unit::Milliarcsecond => {
                Dimension::Angle
            }
            Unit::Second | Unit::Hour | Unit::Day => Dimension::Time,
        }
    }

    /// Short symbol used when parsing and printing quantities
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Meter => "m",
            Unit::Kilometer => "km",
            Unit::Micrometer => "um",
            Unit::Nanometer => "nm",
            Unit::AstronomicalUnit => "au",
            Unit::Parsec => "pc",
            Unit::LightYear => "ly",
            Unit::SolarRadius => "Rsun",
            Unit::EarthRadius => "Rearth",
            Unit::JupiterRadius => "Rjup",
            Unit::Kilogram => "kg",
            Unit::SolarMass => "Msun",
            Unit::EarthMass => "Mearth",
            Unit::JupiterMass => "Mjup",
            Unit::Kelvin => "K",
            Unit::Celsius => "degC",
            Unit::Watt => "W",
            Unit::SolarLuminosity => "Lsun",
            Unit::Radian => "rad",
            Unit::Degree => "deg",
            Unit::Arcsecond => "arcsec",
            Unit::Milliarcsecond => "mas",
            Unit::Second => "s",
            Unit::Hour => "h",
            Unit::Day => "d",
        }
    }

    /// `value` in this unit as a length, `None` for any other dimension.
    ///
    /// au, pc and ly use the IAU values; `uom` rounds them to seven digits.
    pub fn length(&self, value: f64) -> Option<Length> {
        let length = match self {
            Unit::Meter => Length::new::<meter>(value),
            Unit::Kilometer => Length::new::<kilometer>(value),
            Unit::Micrometer => Length::new::<micrometer>(value),
            Unit::Nanometer => Length::new::<nanometer>(value),
            Unit::AstronomicalUnit => Length::new::<meter>(value * AU_M_EXACT),
            Unit::Parsec => Length::new::<meter>(value * PARSEC_M),
            Unit::LightYear => Length::new::<meter>(value * LIGHT_YEAR_M),
            Unit::SolarRadius => Length::new::<meter>(value * SOLAR_RADIUS_M),
            Unit::EarthRadius => Length::new::<meter>(value * EARTH_RADIUS_M),
            Unit::JupiterRadius => Length::new::<meter>(value * JUPITER_RADIUS_M),
            _ => return None,
        };
        Some(length)
    }

    /// `value` in this unit as a mass
    pub fn mass(&self, value: f64) -> Option<Mass> {
        let kilograms = match self {
            Unit::Kilogram => value,
            Unit::SolarMass => value * SOLAR_MASS_KG,
            Unit::EarthMass => value * EARTH_MASS_KG,
            Unit::JupiterMass => value * JUPITER_MASS_KG,
            _ => return None,
        };
        Some(Mass::new::<kilogram>(kilograms))
    }

    /// `value` in this unit as an absolute temperature
    pub fn temperature(&self, value: f64) -> Option<Temperature> {
        match self {
            Unit::Kelvin => Some(Temperature::new::<kelvin>(value)),
            Unit::Celsius => Some(Temperature::new::<degree_celsius>(value)),
            _ => None,
        }
    }

    /// `value` in this unit as a luminosity
    pub fn luminosity(&self, value: f64) -> Option<Luminosity> {
        match self {
            Unit::Watt => Some(Power::new::<watt>(value)),
            Unit::SolarLuminosity => Some(Power::new::<watt>(value * SOLAR_LUMINOSITY_W)),
            _ => None,
        }
    }

    /// `value` in this unit as an angle
    pub fn angle(&self, value: f64) -> Option<Angle> {
        match self {
            Unit::Radian => Some(Angle::new::<radian>(value)),
            Unit::Degree => Some(Angle::new::<degree>(value)),
            Unit::Arcsecond => Some(Angle::new::<arcsecond>(value)),
            Unit::Milliarcsecond => Some(Angle::new::<arcsecond>(value * 1e-3)),
            _ => None,
        }
    }

    /// `value` in this unit as a duration
    pub fn time(&self, value: f64) -> Option<Time> {
        match self {
            Unit::Second => Some(Time::new::<second>(value)),
            Unit::Hour => Some(Time::new::<hour>(value)),
            Unit::Day => Some(Time::new::<day>(value)),
            _ => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Unit::ALL
            .iter()
            .find(|unit| unit.symbol() == trimmed)
            .copied()
            .or(match trimmed {
                "micron" | "µm" => Some(Unit::Micrometer),
                "AU" => Some(Unit::AstronomicalUnit),
                "R_sun" => Some(Unit::SolarRadius),
                "R_earth" => Some(Unit::EarthRadius),
                "M_sun" => Some(Unit::SolarMass),
                "M_earth" => Some(Unit::EarthMass),
                "L_sun" => Some(Unit::SolarLuminosity),
                _ => None,
            })
            .ok_or_else(|| format!("unknown unit '{trimmed}'"))
    }
}

/// A number with an optional unit tag, as supplied by callers and config files.
///
/// A missing unit is representable on purpose: it is rejected by the
/// `validate_*` functions with [`UnitValidationError::MissingUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    pub value: f64,
    pub unit: Option<Unit>,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self {
            value,
            unit: Some(unit),
        }
    }

    /// A bare number without any unit
    pub fn unitless(value: f64) -> Self {
        Self { value, unit: None }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{} {}", self.value, unit),
            None => write!(f, "{}", self.value),
        }
    }
}

impl FromStr for Quantity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (number, unit) = match trimmed.split_once(char::is_whitespace) {
            Some((number, unit)) => (number, Some(unit.parse::<Unit>()?)),
            None => (trimmed, None),
        };
        let value = number
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{number}' in quantity '{trimmed}'"))?;
        Ok(Self { value, unit })
    }
}

impl TryFrom<String> for Quantity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quantity> for String {
    fn from(quantity: Quantity) -> Self {
        quantity.to_string()
    }
}

/// Errors raised when a quantity does not fit the field it is assigned to.
///
/// Every variant names the offending field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitValidationError {
    #[error("{field}: missing unit, expected a {expected} unit")]
    MissingUnit {
        field: String,
        expected: Dimension,
    },
    #[error("{field}: unit '{unit}' is a {found} unit, expected {expected}")]
    IncompatibleUnit {
        field: String,
        unit: Unit,
        found: Dimension,
        expected: Dimension,
    },
    #[error("{field}: value {value} is not finite")]
    NonFinite { field: String, value: f64 },
    #[error("{field}: value {value} must be positive")]
    NonPositive { field: String, value: f64 },
}

impl UnitValidationError {
    /// Name of the field that failed validation
    pub fn field(&self) -> &str {
        match self {
            UnitValidationError::MissingUnit { field, .. }
            | UnitValidationError::IncompatibleUnit { field, .. }
            | UnitValidationError::NonFinite { field, .. }
            | UnitValidationError::NonPositive { field, .. } => field,
        }
    }
}

/// Check `quantity` against `expected` and return its unit.
pub fn validate_quantity_units(
    field: &str,
    quantity: &Quantity,
    expected: Dimension,
) -> Result<Unit, UnitValidationError> {
    let unit = quantity.unit.ok_or_else(|| UnitValidationError::MissingUnit {
        field: field.to_string(),
        expected,
    })?;
    if unit.dimension() != expected {
        return Err(UnitValidationError::IncompatibleUnit {
            field: field.to_string(),
            unit,
            found: unit.dimension(),
            expected,
        });
    }
    if !quantity.value.is_finite() {
        return Err(UnitValidationError::NonFinite {
            field: field.to_string(),
            value: quantity.value,
        });
    }
    Ok(unit)
}

/// Validate `quantity` and build the typed value with `build`
fn validate_typed<T>(
    field: &str,
    quantity: &Quantity,
    expected: Dimension,
    build: fn(&Unit, f64) -> Option<T>,
) -> Result<T, UnitValidationError> {
    let unit = validate_quantity_units(field, quantity, expected)?;
    build(&unit, quantity.value).ok_or_else(|| UnitValidationError::IncompatibleUnit {
        field: field.to_string(),
        unit,
        found: unit.dimension(),
        expected,
    })
}

fn require_positive(field: &str, si_value: f64) -> Result<(), UnitValidationError> {
    if si_value <= 0.0 {
        return Err(UnitValidationError::NonPositive {
            field: field.to_string(),
            value: si_value,
        });
    }
    Ok(())
}

/// Validate a length field (any sign)
pub fn validate_length(field: &str, quantity: &Quantity) -> Result<Length, UnitValidationError> {
    validate_typed(field, quantity, Dimension::Length, Unit::length)
}

/// Validate a length field that must be strictly positive (radii, distances)
pub fn validate_positive_length(
    field: &str,
    quantity: &Quantity,
) -> Result<Length, UnitValidationError> {
    let length = validate_length(field, quantity)?;
    require_positive(field, length.get::<meter>())?;
    Ok(length)
}

/// Validate a mass field
pub fn validate_mass(field: &str, quantity: &Quantity) -> Result<Mass, UnitValidationError> {
    validate_typed(field, quantity, Dimension::Mass, Unit::mass)
}

/// Validate an absolute temperature field
pub fn validate_temperature(
    field: &str,
    quantity: &Quantity,
) -> Result<Temperature, UnitValidationError> {
    validate_typed(field, quantity, Dimension::Temperature, Unit::temperature)
}

/// Validate a luminosity field
pub fn validate_luminosity(
    field: &str,
    quantity: &Quantity,
) -> Result<Luminosity, UnitValidationError> {
    let luminosity = validate_typed(field, quantity, Dimension::Luminosity, Unit::luminosity)?;
    require_positive(field, luminosity.get::<watt>())?;
    Ok(luminosity)
}

/// Validate an angle field
pub fn validate_angle(field: &str, quantity: &Quantity) -> Result<Angle, UnitValidationError> {
    validate_typed(field, quantity, Dimension::Angle, Unit::angle)
}

/// Validate a time field
pub fn validate_time(field: &str, quantity: &Quantity) -> Result<Time, UnitValidationError> {
    validate_typed(field, quantity, Dimension::Time, Unit::time)
}

/// Extension trait for temperature conversions
pub trait TemperatureExt {
    /// Create temperature from Kelvin
    fn from_kelvin(kelvin: f64) -> Self;

    /// Get temperature in Kelvin
    fn as_kelvin(&self) -> f64;
}

/// Extension trait for lengths used for wavelengths and astronomical distances
pub trait LengthExt {
    /// Create length from meters
    fn from_meters(m: f64) -> Self;

    /// Get length in meters
    fn as_meters(&self) -> f64;

    /// Create length from micrometers (wavelengths)
    fn from_micrometers(um: f64) -> Self;

    /// Get length in micrometers
    fn as_micrometers(&self) -> f64;

    /// Get length in astronomical units (IAU 2012 exact, unlike `uom`'s rounded unit)
    fn as_au(&self) -> f64;
}

/// Extension trait for sky angles
pub trait AngleExt {
    /// Create angle from radians
    fn from_radians(rad: f64) -> Self;

    /// Get angle in radians
    fn as_radians(&self) -> f64;

    /// Create angle from arcseconds
    fn from_arcseconds(arcsec: f64) -> Self;

    /// Get angle in arcseconds
    fn as_arcseconds(&self) -> f64;
}

impl TemperatureExt for Temperature {
    fn from_kelvin(kelvin_value: f64) -> Self {
        Temperature::new::<kelvin>(kelvin_value)
    }

    fn as_kelvin(&self) -> f64 {
        self.get::<kelvin>()
    }
}

impl LengthExt for Length {
    fn from_meters(m: f64) -> Self {
        Length::new::<meter>(m)
    }

    fn as_meters(&self) -> f64 {
        self.get::<meter>()
    }

    fn from_micrometers(um: f64) -> Self {
        Length::new::<micrometer>(um)
    }

    fn as_micrometers(&self) -> f64 {
        self.get::<micrometer>()
    }

    fn as_au(&self) -> f64 {
        self.get::<meter>() / AU_M_EXACT
    }
}

impl AngleExt for Angle {
    fn from_radians(rad: f64) -> Self {
        Angle::new::<radian>(rad)
    }

    fn as_radians(&self) -> f64 {
        self.get::<radian>()
    }

    fn from_arcseconds(arcsec: f64) -> Self {
        Angle::new::<arcsecond>(arcsec)
    }

    fn as_arcseconds(&self) -> f64 {
        self.get::<arcsecond>()
    }
}
