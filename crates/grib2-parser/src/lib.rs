//! GRIB2 parser implementation (WMO FM 92 GRIB Edition 2).
//!
//! Walks the sections of a GRIB2 message, including messages that carry
//! several fields, and unpacks simple-packed data. Quasi-regular grids can
//! be stretched onto a full rectangle through `grid-processor`.

pub mod message;
pub mod sections;
pub mod unpacking;

use thiserror::Error;

pub use message::{Grib2Field, Grib2Message, Grib2Reader};
pub use sections::{
    decode_grib2_signed, Bitmap, DataRepresentation, DataSection, GridDefinition,
    Identification, Indicator, ProductDefinition,
};
pub use unpacking::{unpack_simple, SimplePacking};

/// Errors raised while parsing or unpacking GRIB2 data.
#[derive(Error, Debug)]
pub enum Grib2Error {
    #[error("invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    #[error("invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("unpacking error: {0}")]
    UnpackingError(String),

    #[error("unsupported template {template} in section {section}")]
    UnsupportedTemplate { section: u8, template: u16 },

    #[error("grid shape error: {0}")]
    Grid(#[from] grid_processor::GridProcessorError),
}

/// Result type for GRIB2 operations.
pub type Result<T> = std::result::Result<T, Grib2Error>;
