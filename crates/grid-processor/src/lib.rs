//! Grid reshaping for decoded meteorological grids.
//!
//! Decoders hand over a flat array of values in whatever order the encoded
//! message stored them. This crate turns that array into the canonical
//! layout shared by every consumer:
//!
//! - **Orientation**: reorder any scanning mode into south-to-north rows
//!   running west to east ([`normalize`])
//! - **Quasi-regular grids**: stretch variable-length lines onto a full
//!   rectangle with linear or cubic interpolation ([`rectify`])
//!
//! # Example
//!
//! ```
//! use grid_processor::{normalize_flag, CANONICAL_SCAN_MODE};
//!
//! let raw = vec![1.0, 2.0, 3.0, 4.0];
//! let out = normalize_flag(&raw, 2, 2, CANONICAL_SCAN_MODE).unwrap();
//! assert_eq!(out, raw);
//! ```

pub mod error;
pub mod interpolation;
pub mod orientation;
pub mod quasi;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{GridProcessorError, Result};
pub use orientation::{canonical_len, normalize, normalize_flag, ScanMode, CANONICAL_SCAN_MODE};
pub use quasi::{rectify, resample, LineAxis, QuasiGridShape};
pub use types::{CalibratedGrid, InterpolationMethod};
