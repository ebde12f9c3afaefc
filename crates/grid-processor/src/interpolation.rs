//! One-dimensional interpolation along a single grid line.
//!
//! Points of a line sit at integer positions `0..n`. Both interpolators
//! treat the line as periodic: a position past the last point brackets
//! against the first point.

/// End-slope value at or above which a spline end is treated as natural
/// (zero second derivative).
pub const NATURAL_END: f64 = 1.0e30;

/// Second derivatives of the cubic spline through `y` at unit spacing.
///
/// `yp1` and `ypn` are the first derivatives at the two ends; pass
/// [`NATURAL_END`] for a natural spline.
pub fn spline_second_derivatives(y: &[f64], yp1: f64, ypn: f64) -> Vec<f64> {
    let n = y.len();
    let mut y2 = vec![0.0; n];
    if n < 2 {
        return y2;
    }
    let mut u = vec![0.0; n];

    if yp1 < 0.99 * NATURAL_END {
        y2[0] = -0.5;
        u[0] = 3.0 * ((y[1] - y[0]) - yp1);
    }

    for i in 1..n - 1 {
        let sig = 0.5;
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let slope_change = (y[i + 1] - y[i]) - (y[i] - y[i - 1]);
        u[i] = (6.0 * slope_change / 2.0 - sig * u[i - 1]) / p;
    }

    let (qn, un) = if ypn < 0.99 * NATURAL_END {
        (0.5, 3.0 * (ypn - (y[n - 1] - y[n - 2])))
    } else {
        (0.0, 0.0)
    };
    y2[n - 1] = (un - qn * u[n - 2]) / (qn * y2[n - 2] + 1.0);

    for k in (0..n - 1).rev() {
        y2[k] = y2[k] * y2[k + 1] + u[k];
    }
    y2
}

/// Index of the upper bracket for `lo`, wrapping to the line start.
fn upper_bracket(hi: usize, n: usize) -> usize {
    if hi > n - 1 {
        0
    } else {
        hi
    }
}

/// Evaluate the spline `(y, y2)` at position `x`.
pub fn spline_eval(y: &[f64], y2: &[f64], x: f64) -> f64 {
    let n = y.len();
    if n == 0 {
        return f64::NAN;
    }
    let klo = (x.floor().max(0.0) as usize).min(n - 1);
    let khi = upper_bracket(klo + 1, n);

    let a = (klo + 1) as f64 - x;
    let b = x - klo as f64;
    a * y[klo]
        + b * y[khi]
        + ((a * a * a - a) * y2[klo] + (b * b * b - b) * y2[khi]) / 6.0
}

/// Linearly interpolate `line` at position `x`.
pub fn linear_eval(line: &[f64], x: f64) -> f64 {
    let n = line.len();
    if n == 0 {
        return f64::NAN;
    }
    let lo = (x.floor().max(0.0) as usize).min(n - 1);
    let hi = upper_bracket(x.ceil().max(0.0) as usize, n);
    let frac = x - lo as f64;
    line[lo] + (line[hi] - line[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_natural_spline_of_line_is_linear() {
        let y = [1.0, 2.0, 3.0, 4.0];
        let y2 = spline_second_derivatives(&y, NATURAL_END, NATURAL_END);
        for d in &y2 {
            assert_approx_eq!(*d, 0.0, 1e-12);
        }
        assert_approx_eq!(spline_eval(&y, &y2, 1.5), 2.5, 1e-12);
    }

    #[test]
    fn test_spline_passes_through_knots() {
        let y = [0.0, 3.0, 1.0, 4.0, 2.0];
        let y2 = spline_second_derivatives(&y, NATURAL_END, NATURAL_END);
        assert_approx_eq!(y2[0], 0.0, 1e-12);
        assert_approx_eq!(y2[4], 0.0, 1e-12);
        for (k, v) in y.iter().enumerate() {
            assert_approx_eq!(spline_eval(&y, &y2, k as f64), *v, 1e-9);
        }
    }

    #[test]
    fn test_linear_wraps_to_start() {
        let line = [1.0, 2.0, 3.0];
        assert_approx_eq!(linear_eval(&line, 0.5), 1.5, 1e-12);
        assert_approx_eq!(linear_eval(&line, 2.5), 2.0, 1e-12);
        assert_approx_eq!(linear_eval(&line, 2.0), 3.0, 1e-12);
    }

    #[test]
    fn test_single_point_line() {
        let y = [7.0];
        let y2 = spline_second_derivatives(&y, NATURAL_END, NATURAL_END);
        assert_approx_eq!(spline_eval(&y, &y2, 0.5), 7.0, 1e-12);
        assert_approx_eq!(linear_eval(&y, 0.5), 7.0, 1e-12);
    }
}
