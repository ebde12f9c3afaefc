//! Reader for GEMPAK data management (DM) files and their packed grids.
//!
//! GEMPAK stores data in a word-addressed binary layout: every offset is a
//! 1-based 32-bit word, so word `n` starts at byte `(n - 1) * 4`. This crate
//! keeps that convention in its public API.
//!
//! - [`WordReader`]: word-addressed reads with byte-order detection and
//!   missing-value substitution
//! - [`GempakFile`]: label, keys, parts, file headers and records
//! - [`GempakGridReader`]: grid files, their navigation and grid index
//! - [`SharedGridReader`]: a grid reader shared between threads with a
//!   cache of decoded grids
//!
//! Grids come back in canonical orientation: rows from south to north,
//! each running west to east.
//!
//! # Example
//!
//! ```no_run
//! use gempak_parser::{DecoderConfig, GempakGridReader};
//!
//! let mut reader = GempakGridReader::open("gfs.gem", DecoderConfig::default())?;
//! if let Some(header) = reader.find_grid("TMPK").cloned() {
//!     if let Some(values) = reader.read_grid(&header)? {
//!         println!("{}: {} points", header.param, values.len());
//!     }
//! }
//! # Ok::<(), gempak_parser::GempakError>(())
//! ```

pub mod bits;
pub mod config;
pub mod constants;
pub mod error;
pub mod file;
pub mod grid;
pub mod packing;
pub mod reader;
pub mod shared;

use std::io::{Read, Seek};

pub use config::DecoderConfig;
pub use error::{GempakError, NoDataReason, RecordOutcome, Result};
pub use file::{DmKeys, DmLabel, DmPart, GempakFile, RawRecord, RecordData};
pub use grid::{GempakGridReader, GridHeader, GridTime, NavBlock, RawGrid, VerticalCoordinate};
pub use grid_processor::{canonical_len, CalibratedGrid, InterpolationMethod, ScanMode};
pub use packing::{PackingDescriptor, PackingType, RawGridRecord, RealPackingLayout};
pub use reader::{ByteOrder, MissingValues, WordReader};
pub use shared::SharedGridReader;

/// Decode the packed grid record whose packing-type word is at `isword`.
///
/// `nword` counts the words from `isword` to the end of the record. A read
/// past the end of the source, or a length above the configured record
/// limit, yields no data rather than an error.
pub fn decode_packed_record<R: Read + Seek>(
    reader: &mut WordReader<R>,
    isword: i64,
    nword: i32,
    decimal_scale: i32,
    config: &DecoderConfig,
) -> Result<RecordOutcome<Vec<f32>>> {
    if nword.unsigned_abs() > config.max_record_words.unsigned_abs() {
        return Ok(RecordOutcome::NoData(NoDataReason::HugeLength(nword)));
    }
    let outcome = packing::read_packed(reader, isword, nword, decimal_scale)
        .map(|raw| raw.and_then(|record| record.decode(config)));
    error::end_of_file_as_no_data(outcome)
}
