//! Sky-grid construction helpers.
//!
//! Coordinate maps are square meshes centred on the source, with `x` varying
//! along columns and `y` varying along rows. Extraction relies on that
//! row-major layout when it reshapes per-template results onto the sky.

use ndarray::{Array1, Array2};
use thiserror::Error;

/// Errors that can occur while building or searching grids
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Grid size must be at least 1")]
    EmptyGrid,
    #[error("Cannot search an empty array")]
    EmptyArray,
    #[error("Grid extent {0} is not finite")]
    NonFiniteExtent(f64),
}

/// Linearly spaced values from `start` to `end` inclusive.
///
/// A single sample is `start`, matching the usual linear-space convention.
pub fn linspace(start: f64, end: f64, n: usize) -> Array1<f64> {
    if n <= 1 {
        return Array1::from_elem(n, start);
    }
    let step = (end - start) / (n - 1) as f64;
    Array1::from_shape_fn(n, |i| {
        if i == n - 1 {
            end
        } else {
            start + step * i as f64
        }
    })
}

/// Build a centred square coordinate mesh.
///
/// Both axes run from `-full_extent / 2` to `+full_extent / 2`. The returned
/// maps are in whatever unit `full_extent` was expressed in.
///
/// # Arguments
/// * `full_extent` - Full width of the mesh along one axis
/// * `grid_size` - Number of samples per axis
///
/// # Returns
/// `(x, y)` maps of shape `(grid_size, grid_size)` where `x[[row, col]]`
/// depends only on `col` and `y[[row, col]]` only on `row`.
pub fn meshgrid(
    full_extent: f64,
    grid_size: usize,
) -> Result<(Array2<f64>, Array2<f64>), GridError> {
    if grid_size == 0 {
        return Err(GridError::EmptyGrid);
    }
    if !full_extent.is_finite() {
        return Err(GridError::NonFiniteExtent(full_extent));
    }

    let axis = linspace(-full_extent / 2.0, full_extent / 2.0, grid_size);
    let x = Array2::from_shape_fn((grid_size, grid_size), |(_, col)| axis[col]);
    let y = Array2::from_shape_fn((grid_size, grid_size), |(row, _)| axis[row]);
    Ok((x, y))
}

/// Index of the element closest to `target`.
///
/// Ties resolve to the lowest index.
pub fn index_of_closest<'a, I>(values: I, target: f64) -> Result<usize, GridError>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut best: Option<(usize, f64)> = None;
    for (index, value) in values.into_iter().enumerate() {
        let distance = (value - target).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index).ok_or(GridError::EmptyArray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_linspace_endpoints() {
        let values = linspace(-1.0, 1.0, 5);
        assert_eq!(values.to_vec(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(linspace(3.0, 7.0, 1).to_vec(), vec![3.0]);
        assert!(linspace(3.0, 7.0, 0).is_empty());
    }

    #[test]
    fn test_meshgrid_layout() {
        let (x, y) = meshgrid(4.0, 3).unwrap();
        assert_eq!(x.dim(), (3, 3));
        assert_eq!(x.row(0).to_vec(), vec![-2.0, 0.0, 2.0]);
        assert_eq!(x.row(2).to_vec(), vec![-2.0, 0.0, 2.0]);
        assert_eq!(y.column(0).to_vec(), vec![-2.0, 0.0, 2.0]);
        assert_eq!(y.row(1).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_meshgrid_single_point() {
        let (x, y) = meshgrid(0.5, 1).unwrap();
        assert_eq!(x.dim(), (1, 1));
        assert_relative_eq!(x[[0, 0]], -0.25);
        assert_relative_eq!(y[[0, 0]], -0.25);
    }

    #[test]
    fn test_meshgrid_rejects_zero_size() {
        assert_eq!(meshgrid(1.0, 0), Err(GridError::EmptyGrid));
        assert!(matches!(
            meshgrid(f64::INFINITY, 3),
            Err(GridError::NonFiniteExtent(_))
        ));
    }

    #[test]
    fn test_index_of_closest() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(index_of_closest(&values, 2.6).unwrap(), 3);
        assert_eq!(index_of_closest(&values, 2.4).unwrap(), 2);
        assert_eq!(index_of_closest(&values, -10.0).unwrap(), 0);
        assert_eq!(index_of_closest(&values, 10.0).unwrap(), 5);
    }

    #[test]
    fn test_index_of_closest_tie_goes_low() {
        assert_eq!(index_of_closest(&[2.0, 3.0], 2.5).unwrap(), 0);
        let descending = Array1::from(vec![3.0, 2.0, 1.0]);
        assert_eq!(index_of_closest(&descending, 1.5).unwrap(), 1);
    }

    #[test]
    fn test_index_of_closest_empty() {
        let empty: [f64; 0] = [];
        assert_eq!(index_of_closest(&empty, 1.0), Err(GridError::EmptyArray));
    }

    proptest! {
        #[test]
        fn prop_meshgrid_bounded_and_symmetric(extent in 1e-6f64..1e3, n in 1usize..40) {
            let (x, y) = meshgrid(extent, n).unwrap();
            prop_assert_eq!(x.dim(), (n, n));
            prop_assert_eq!(y.dim(), (n, n));

            let half = extent / 2.0;
            let tolerance = half * 1e-12;
            for value in x.iter().chain(y.iter()) {
                prop_assert!(*value >= -half - tolerance && *value <= half + tolerance);
            }

            if n > 1 {
                for col in 0..n {
                    let mirrored = x[[0, n - 1 - col]];
                    prop_assert!((x[[0, col]] + mirrored).abs() <= tolerance * 4.0);
                }
            }
        }
    }
}
