//! Trapezoidal integration of sampled functions

/// Integrate `f` over `[a, b]` using `intervals` equal trapezoids.
pub fn trap_integrate_fn<F>(f: F, a: f64, b: f64, intervals: usize) -> f64
where
    F: Fn(f64) -> f64,
{
    let intervals = intervals.max(1);
    let step = (b - a) / intervals as f64;

    let interior: f64 = (1..intervals).map(|i| f(a + step * i as f64)).sum();
    step * ((f(a) + f(b)) / 2.0 + interior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_function_exact() {
        let area = trap_integrate_fn(|x| 2.0 * x + 1.0, 0.0, 3.0, 1);
        assert_relative_eq!(area, 12.0);
    }

    #[test]
    fn test_quadratic_converges() {
        let area = trap_integrate_fn(|x| x * x, 0.0, 1.0, 1000);
        assert_relative_eq!(area, 1.0 / 3.0, epsilon = 1e-6);
    }
}
