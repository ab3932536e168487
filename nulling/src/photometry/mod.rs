//! Photometry models and utilities

pub mod blackbody;
pub mod trapezoid;

pub use blackbody::{create_blackbody_spectrum, planck_photon_radiance, BlackbodyError, SI};
pub use trapezoid::trap_integrate_fn;
