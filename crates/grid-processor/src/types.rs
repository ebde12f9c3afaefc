//! Core types for grid processing.

use serde::{Deserialize, Serialize};

use crate::error::{GridProcessorError, Result};

/// Interpolation method used when filling a quasi-regular line out to the
/// full grid width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Periodic linear interpolation between the two bracketing points.
    #[default]
    Linear,
    /// Natural cubic spline through every point of the line.
    Cubic,
}

impl InterpolationMethod {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "cubic" | "spline" => Self::Cubic,
            _ => Self::Linear,
        }
    }
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Cubic => write!(f, "cubic"),
        }
    }
}

/// A decoded grid in canonical orientation.
///
/// Values are stored row-major with the first row at the south edge and
/// each row running west to east. Missing points hold the caller's float
/// sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedGrid {
    data: Vec<f32>,
    nx: usize,
    ny: usize,
}

impl CalibratedGrid {
    /// Wrap `data` as an `nx` by `ny` grid.
    pub fn new(data: Vec<f32>, nx: usize, ny: usize) -> Result<Self> {
        if data.len() != nx * ny {
            return Err(GridProcessorError::DimensionMismatch {
                expected: nx * ny,
                actual: data.len(),
            });
        }
        Ok(Self { data, nx, ny })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at column `i` and row `j`, counted from the south-west corner.
    pub fn get(&self, i: usize, j: usize) -> Option<f32> {
        if i >= self.nx || j >= self.ny {
            return None;
        }
        self.data.get(j * self.nx + i).copied()
    }

    /// Number of points equal to the missing sentinel.
    pub fn count_missing(&self, sentinel: f32) -> usize {
        self.data.iter().filter(|v| **v == sentinel).count()
    }

    /// Minimum and maximum over the points that are not `sentinel`.
    pub fn value_range(&self, sentinel: f32) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| *v != sentinel && !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}
