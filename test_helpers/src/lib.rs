//! Test helpers for the nulling workspace
//!
//! Synthetic photon-count cubes shaped `(outputs, time, wavelength)` and a
//! locator for the scenario files shipped at the workspace root.

use std::env;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Error type for test helper operations
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Failed to find workspace root: {0}")]
    WorkspaceRootNotFound(String),
}

/// Walk up from the current directory to the `Cargo.toml` declaring the
/// workspace.
pub fn find_workspace_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::WorkspaceRootNotFound(format!("Failed to get current directory: {e}"))
    })?;

    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::WorkspaceRootNotFound(format!("Failed to read Cargo.toml: {e}"))
            })?;
            if content.contains("[workspace]") {
                return Ok(current_dir);
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::WorkspaceRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

static WORKSPACE_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_workspace_root().expect("Failed to find workspace root directory"));

/// Path of a file in the workspace's `scenarios/` directory
pub fn scenario_path<P: AsRef<Path>>(name: P) -> PathBuf {
    WORKSPACE_ROOT.join("scenarios").join(name)
}

/// Cube filled with one value
pub fn constant_cube(shape: (usize, usize, usize), value: f64) -> Array3<f64> {
    Array3::from_elem(shape, value)
}

/// Gaussian noise cube, reproducible for a given seed
pub fn seeded_noise_cube(
    shape: (usize, usize, usize),
    mean: f64,
    std_dev: f64,
    seed: u64,
) -> Array3<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(mean, std_dev).expect("invalid noise parameters");
    Array3::from_shape_simple_fn(shape, || normal.sample(&mut rng))
}

/// Zero-mean sinusoidal fringe.
///
/// `cube[[o, t, w]] = (w + 1) · sin(2π t / period + phase + o · π/2)`, so each
/// output is a quadrature-shifted copy and redder bins are brighter.
pub fn fringe_cube(shape: (usize, usize, usize), period: f64, phase: f64) -> Array3<f64> {
    Array3::from_shape_fn(shape, |(output, step, wavelength)| {
        let angle = 2.0 * PI * step as f64 / period + phase + output as f64 * PI / 2.0;
        (wavelength as f64 + 1.0) * angle.sin()
    })
}
