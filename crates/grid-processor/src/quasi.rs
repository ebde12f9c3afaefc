//! Resampling of quasi-regular grids onto a full rectangle.
//!
//! A quasi-regular grid has a different number of points on each line
//! (usually each latitude row of a reduced Gaussian grid). Every line is
//! stretched to the length of the longest line, so the result can be
//! treated like any other rectangular grid.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridProcessorError, Result};
use crate::interpolation::{linear_eval, spline_eval, spline_second_derivatives, NATURAL_END};
use crate::types::{CalibratedGrid, InterpolationMethod};

/// Which physical axis the variable-length lines run along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineAxis {
    /// Each row has its own point count; `nx` varies.
    Rows,
    /// Each column has its own point count; `ny` varies.
    Columns,
}

/// Shape of a quasi-regular grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuasiGridShape {
    axis: LineAxis,
    line_counts: Vec<usize>,
}

impl QuasiGridShape {
    /// Build the shape from declared dimensions and per-line point counts.
    ///
    /// Exactly one of `nx` and `ny` must be variable (zero or negative); the
    /// other must equal the number of lines.
    pub fn new(nx: i64, ny: i64, line_counts: Vec<usize>) -> Result<Self> {
        let axis = match (nx <= 0, ny <= 0) {
            (true, false) => LineAxis::Rows,
            (false, true) => LineAxis::Columns,
            _ => {
                return Err(GridProcessorError::invalid_shape(format!(
                    "exactly one of nx={} and ny={} must be variable",
                    nx, ny
                )))
            }
        };
        let fixed = if axis == LineAxis::Rows { ny } else { nx };
        if fixed as usize != line_counts.len() {
            return Err(GridProcessorError::invalid_shape(format!(
                "{} lines declared but {} point counts given",
                fixed,
                line_counts.len()
            )));
        }
        if line_counts.iter().any(|c| *c == 0) {
            return Err(GridProcessorError::invalid_shape(
                "quasi-regular line with no points",
            ));
        }
        Ok(Self { axis, line_counts })
    }

    pub fn axis(&self) -> LineAxis {
        self.axis
    }

    pub fn line_counts(&self) -> &[usize] {
        &self.line_counts
    }

    /// Length every line is resampled to: the longest line.
    pub fn fixed_axis_len(&self) -> usize {
        self.line_counts.iter().copied().max().unwrap_or(0)
    }

    /// Resolved `(nx, ny)` of the rectified grid.
    pub fn resolved_dims(&self) -> (usize, usize) {
        match self.axis {
            LineAxis::Rows => (self.fixed_axis_len(), self.line_counts.len()),
            LineAxis::Columns => (self.line_counts.len(), self.fixed_axis_len()),
        }
    }

    /// Number of values the packed quasi-regular array holds.
    pub fn input_len(&self) -> usize {
        self.line_counts.iter().sum()
    }
}

/// Resample the concatenated lines of `quasi` to `fixed_axis_len` points each.
///
/// The output holds one line after another, `fixed_axis_len` values per
/// line. Lines already at full length are copied unchanged.
pub fn resample(
    quasi: &[f32],
    line_counts: &[usize],
    fixed_axis_len: usize,
    method: InterpolationMethod,
) -> Result<Vec<f32>> {
    let expected: usize = line_counts.iter().sum();
    if quasi.len() != expected {
        return Err(GridProcessorError::DimensionMismatch {
            expected,
            actual: quasi.len(),
        });
    }

    let mut out = Vec::with_capacity(fixed_axis_len * line_counts.len());
    let mut start = 0;
    for &npoints in line_counts {
        let line = &quasi[start..start + npoints];
        start += npoints;

        if npoints == fixed_axis_len {
            out.extend_from_slice(line);
            continue;
        }
        if npoints == 0 {
            return Err(GridProcessorError::invalid_shape(
                "quasi-regular line with no points",
            ));
        }

        let values: Vec<f64> = line.iter().map(|v| *v as f64).collect();
        let second = match method {
            InterpolationMethod::Cubic => {
                spline_second_derivatives(&values, NATURAL_END, NATURAL_END)
            }
            InterpolationMethod::Linear => Vec::new(),
        };

        for i in 0..fixed_axis_len {
            let mapped = i as f64 * npoints as f64 / fixed_axis_len as f64;
            let value = match method {
                InterpolationMethod::Linear => linear_eval(&values, mapped),
                InterpolationMethod::Cubic => spline_eval(&values, &second, mapped),
            };
            out.push(value as f32);
        }
    }
    Ok(out)
}

/// Rectify a quasi-regular grid into a canonical row-major grid.
pub fn rectify(
    quasi: &[f32],
    shape: &QuasiGridShape,
    method: InterpolationMethod,
) -> Result<CalibratedGrid> {
    let fixed = shape.fixed_axis_len();
    let lines = resample(quasi, shape.line_counts(), fixed, method)?;
    let (nx, ny) = shape.resolved_dims();

    debug!(
        nx = nx,
        ny = ny,
        axis = ?shape.axis(),
        method = %method,
        "Rectified quasi-regular grid"
    );

    let data = match shape.axis() {
        LineAxis::Rows => lines,
        LineAxis::Columns => {
            // Lines are columns here; lay them out row by row.
            let mut data = vec![0.0; lines.len()];
            for (col, column) in lines.chunks(fixed).enumerate() {
                for (row, value) in column.iter().enumerate() {
                    data[row * nx + col] = *value;
                }
            }
            data
        }
    };
    CalibratedGrid::new(data, nx, ny)
}
