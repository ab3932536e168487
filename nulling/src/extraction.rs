//! Maximum-likelihood extraction of a planet signal.
//!
//! Every template is the noise-free differential photon-count cube a planet of
//! unit flux would produce at one sky position. For each template the
//! likelihood is maximised under a diagonal covariance (one variance per
//! output and wavelength bin, estimated from the measurement's scatter in
//! time), which reduces the linear estimate to an independent ratio per bin:
//!
//! ```text
//! c[o, w] = Σ_τ data[o, τ, w] · template[o, τ, w] / var[o, w]
//! b[o, w] = Σ_τ template[o, τ, w]²                / var[o, w]
//! flux[o, w] = max(c / b, 0)
//! cost[o]    = Σ_w flux[o, w] · c[o, w]
//! ```
//!
//! Costs and fluxes are laid out on the square sky grid the templates were
//! generated on, template `t` sitting at `(t / grid_size, t % grid_size)`.

use log::{debug, info, warn};
use ndarray::{s, Array1, Array2, Array3, Array4, ArrayView2, ArrayView3, Axis, Zip};
use rayon::prelude::*;
use thiserror::Error;

/// Relative resolution of one sample; a channel whose spread is below the
/// resolution of its mean counts as flat
const DEGENERATE_VARIANCE_RELATIVE: f64 = f64::EPSILON;

/// Errors that can occur during extraction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("Template {template} has shape {found:?} but the data has shape {expected:?}")]
    ShapeMismatch {
        template: usize,
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    },
    #[error("Expected {expected} templates for a {grid_size}x{grid_size} grid, got {found}")]
    TemplateCountMismatch {
        grid_size: usize,
        expected: usize,
        found: usize,
    },
    #[error("Variance of output {output}, wavelength bin {wavelength} is degenerate ({variance})")]
    DegenerateVariance {
        output: usize,
        wavelength: usize,
        variance: f64,
    },
    #[error("Extraction needs at least one template, output and wavelength bin")]
    EmptyInput,
}

/// Cost and flux estimates on the sky grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// `(grid_size, grid_size, outputs)`
    pub cost_function: Array3<f64>,
    /// Clamped flux summed over wavelength, `(grid_size, grid_size, outputs)`
    pub optimized_flux: Array3<f64>,
    /// Clamped flux per bin, `(grid_size, grid_size, outputs, wavelengths)`
    pub optimized_spectra: Array4<f64>,
}

impl ExtractionResult {
    pub fn grid_size(&self) -> usize {
        self.cost_function.len_of(Axis(0))
    }

    pub fn number_of_outputs(&self) -> usize {
        self.cost_function.len_of(Axis(2))
    }

    /// Cost map of one differential output
    pub fn cost_map(&self, output: usize) -> Option<ArrayView2<'_, f64>> {
        (output < self.number_of_outputs()).then(|| self.cost_function.index_axis(Axis(2), output))
    }

    /// `(row, col)` of the highest cost for one output.
    ///
    /// Ties resolve to the first cell in row-major order.
    pub fn best_position(&self, output: usize) -> Option<(usize, usize)> {
        let map = self.cost_map(output)?;
        let mut best: Option<((usize, usize), f64)> = None;
        for (position, &cost) in map.indexed_iter() {
            match best {
                Some((_, best_cost)) if cost <= best_cost => {}
                _ => best = Some((position, cost)),
            }
        }
        best.map(|(position, _)| position)
    }
}

/// Per-template fit before it is placed on the grid
struct TemplateFit {
    cost: Array1<f64>,
    flux: Array2<f64>,
}

/// Population variance of every `(output, wavelength)` channel over time.
///
/// # Errors
/// [`ExtractionError::DegenerateVariance`] for the first channel whose
/// variance is non-finite, zero, or negligible against its mean.
pub fn channel_variance(data: &ArrayView3<f64>) -> Result<Array2<f64>, ExtractionError> {
    let (outputs, steps, wavelengths) = data.dim();
    let mut variance = Array2::zeros((outputs, wavelengths));

    for ((output, wavelength), value) in variance.indexed_iter_mut() {
        let series = data.slice(s![output, .., wavelength]);
        let mean = series.sum() / steps as f64;
        let var = series.fold(0.0, |acc, x| acc + (x - mean).powi(2)) / steps as f64;

        let resolution = DEGENERATE_VARIANCE_RELATIVE * mean.abs();
        let floor = (resolution * resolution).max(f64::MIN_POSITIVE);
        if !var.is_finite() || var <= floor {
            return Err(ExtractionError::DegenerateVariance {
                output,
                wavelength,
                variance: var,
            });
        }
        *value = var;
    }

    Ok(variance)
}

fn fit_template(data: &ArrayView3<f64>, template: &Array3<f64>, variance: &Array2<f64>) -> TemplateFit {
    let c = (data * template).sum_axis(Axis(1)) / variance;
    let b = template.mapv(|t| t * t).sum_axis(Axis(1)) / variance;

    // A bin with b == 0 carries no information about this position
    let flux = Zip::from(&c)
        .and(&b)
        .map_collect(|&c, &b| if b > 0.0 { (c / b).max(0.0) } else { 0.0 });
    let cost = (&flux * &c).sum_axis(Axis(1));

    TemplateFit { cost, flux }
}

fn validate_inputs(
    data: &ArrayView3<f64>,
    templates: &[Array3<f64>],
    grid_size: usize,
) -> Result<(), ExtractionError> {
    let expected = data.dim();
    if let Some((template, found)) = templates
        .iter()
        .map(|template| template.dim())
        .enumerate()
        .find(|(_, dim)| *dim != expected)
    {
        return Err(ExtractionError::ShapeMismatch {
            template,
            expected,
            found,
        });
    }

    if templates.is_empty() || expected.0 == 0 || expected.2 == 0 {
        return Err(ExtractionError::EmptyInput);
    }

    if templates.len() != grid_size * grid_size {
        return Err(ExtractionError::TemplateCountMismatch {
            grid_size,
            expected: grid_size * grid_size,
            found: templates.len(),
        });
    }

    Ok(())
}

/// Run the maximum-likelihood extraction.
///
/// # Arguments
/// * `data` - Measured differential photon counts, `(outputs, time, wavelength)`
/// * `templates` - One cube per sky position, row-major over the grid, each
///   shaped like `data`
/// * `grid_size` - Side length of the square sky grid
///
/// # Returns
/// Freshly allocated cost and flux maps. Inputs are not modified and repeated
/// calls give bit-identical results.
pub fn extract(
    data: ArrayView3<f64>,
    templates: &[Array3<f64>],
    grid_size: usize,
) -> Result<ExtractionResult, ExtractionError> {
    validate_inputs(&data, templates, grid_size)?;
    let (outputs, steps, wavelengths) = data.dim();

    let variance = channel_variance(&data)?;
    debug!(
        "Channel variance over {steps} time steps: min {:.3e}, max {:.3e}",
        variance.fold(f64::INFINITY, |a, &b| a.min(b)),
        variance.fold(f64::NEG_INFINITY, |a, &b| a.max(b))
    );

    // Ordered collect keeps template index == grid position
    let fits: Vec<TemplateFit> = templates
        .par_iter()
        .map(|template| fit_template(&data, template, &variance))
        .collect();

    let mut cost_function = Array3::zeros((grid_size, grid_size, outputs));
    let mut optimized_flux = Array3::zeros((grid_size, grid_size, outputs));
    let mut optimized_spectra = Array4::zeros((grid_size, grid_size, outputs, wavelengths));
    let mut uninformative = 0;

    for (index, fit) in fits.iter().enumerate() {
        let (row, col) = (index / grid_size, index % grid_size);
        if fit.flux.iter().all(|&f| f == 0.0) {
            uninformative += 1;
        }
        cost_function
            .slice_mut(s![row, col, ..])
            .assign(&fit.cost);
        optimized_flux
            .slice_mut(s![row, col, ..])
            .assign(&fit.flux.sum_axis(Axis(1)));
        optimized_spectra
            .slice_mut(s![row, col, .., ..])
            .assign(&fit.flux);
    }

    if uninformative == fits.len() {
        warn!("Every template was clamped to zero flux; the cost map is flat");
    } else if uninformative > 0 {
        debug!("{uninformative} of {} templates clamped to zero flux", fits.len());
    }

    let result = ExtractionResult {
        cost_function,
        optimized_flux,
        optimized_spectra,
    };
    if let Some((row, col)) = result.best_position(0) {
        info!(
            "Extracted {} templates on a {grid_size}x{grid_size} grid; output 0 peaks at ({row}, {col})",
            templates.len()
        );
    }

    Ok(result)
}
