//! Error and record outcome types.
//!
//! File-level problems are errors: an open that cannot make sense of the
//! label, keys or parts fails with [`GempakError`]. Problems confined to one
//! record are not: reading a record yields a [`RecordOutcome`], and the
//! `NoData` side names why nothing was decoded.

use grib2_parser::Grib2Error;
use grid_processor::GridProcessorError;
use thiserror::Error;

use crate::packing::PackingType;

/// Result type for GEMPAK operations.
pub type Result<T> = std::result::Result<T, GempakError>;

/// Errors that abort the current call.
#[derive(Error, Debug)]
pub enum GempakError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a GEMPAK file: {0}")]
    NotGempak(String),

    #[error("missing file structure: {0}")]
    MissingStructure(String),

    #[error("wrong file type: expected {expected}, found {found}")]
    WrongFileType { expected: i32, found: i32 },

    #[error("read of {count} words at {start} exceeds buffer of {len}")]
    OutOfBounds {
        start: usize,
        count: usize,
        len: usize,
    },

    #[error("invalid word offset: {0}")]
    InvalidWord(i64),

    #[error("GRIB2 error: {0}")]
    Grib2(#[from] Grib2Error),

    #[error("grid shape error: {0}")]
    Grid(#[from] GridProcessorError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GempakError {
    /// True when the error is a read past the end of the file.
    pub fn is_end_of_file(&self) -> bool {
        matches!(self, GempakError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

/// Why a record produced no data.
#[derive(Debug, Clone, PartialEq)]
pub enum NoDataReason {
    /// Row, column or part does not address a data pointer.
    InvalidLocation { row: usize, col: usize, part: String },
    /// The data pointer is zero.
    EmptyPointer,
    /// Record length does not exceed the part header length.
    LengthNotAboveHeader { length: i32, header_len: i32 },
    /// Record length is implausibly large.
    HugeLength(i32),
    /// The file ended inside the record.
    EndOfFile,
    /// The packing scheme is recognised but not decoded.
    UnsupportedPacking(PackingType),
    /// The record content cannot be decoded.
    InvalidPacking(String),
}

impl std::fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLocation { row, col, part } => {
                write!(f, "no data pointer for row {} column {} part {}", row, col, part)
            }
            Self::EmptyPointer => write!(f, "empty data pointer"),
            Self::LengthNotAboveHeader { length, header_len } => write!(
                f,
                "length ({}) is less than header length ({})",
                length, header_len
            ),
            Self::HugeLength(length) => write!(f, "length is huge: {}", length),
            Self::EndOfFile => write!(f, "end of file inside record"),
            Self::UnsupportedPacking(packing) => write!(f, "unsupported packing {}", packing),
            Self::InvalidPacking(reason) => write!(f, "invalid packed data: {}", reason),
        }
    }
}

/// Result of reading or decoding one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome<T> {
    Decoded(T),
    NoData(NoDataReason),
}

impl<T> RecordOutcome<T> {
    pub fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded(_))
    }

    pub fn no_data_reason(&self) -> Option<&NoDataReason> {
        match self {
            Self::Decoded(_) => None,
            Self::NoData(reason) => Some(reason),
        }
    }

    /// Drop the reason.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Decoded(value) => Some(value),
            Self::NoData(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RecordOutcome<U> {
        match self {
            Self::Decoded(value) => RecordOutcome::Decoded(f(value)),
            Self::NoData(reason) => RecordOutcome::NoData(reason),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> RecordOutcome<U>) -> RecordOutcome<U> {
        match self {
            Self::Decoded(value) => f(value),
            Self::NoData(reason) => RecordOutcome::NoData(reason),
        }
    }
}

/// Turn a read past the end of the file into a `NoData` outcome.
pub(crate) fn end_of_file_as_no_data<T>(
    result: Result<RecordOutcome<T>>,
) -> Result<RecordOutcome<T>> {
    match result {
        Err(e) if e.is_end_of_file() => Ok(RecordOutcome::NoData(NoDataReason::EndOfFile)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_of_file_detection() {
        let eof = GempakError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "short read",
        ));
        assert!(eof.is_end_of_file());
        assert!(!GempakError::InvalidWord(0).is_end_of_file());

        let outcome: Result<RecordOutcome<()>> = end_of_file_as_no_data(Err(eof));
        assert_eq!(
            outcome.unwrap(),
            RecordOutcome::NoData(NoDataReason::EndOfFile)
        );
    }

    #[test]
    fn test_outcome_combinators() {
        let decoded = RecordOutcome::Decoded(2);
        assert_eq!(decoded.clone().map(|v| v * 2), RecordOutcome::Decoded(4));
        assert_eq!(decoded.into_option(), Some(2));

        let empty: RecordOutcome<i32> = RecordOutcome::NoData(NoDataReason::EmptyPointer);
        assert_eq!(empty.no_data_reason(), Some(&NoDataReason::EmptyPointer));
        assert_eq!(
            empty.and_then(|v| RecordOutcome::Decoded(v + 1)),
            RecordOutcome::NoData(NoDataReason::EmptyPointer)
        );
    }

    #[test]
    fn test_reason_messages() {
        let reason = NoDataReason::LengthNotAboveHeader {
            length: 2,
            header_len: 2,
        };
        assert_eq!(reason.to_string(), "length (2) is less than header length (2)");
        assert_eq!(
            NoDataReason::UnsupportedPacking(PackingType::Nmc).to_string(),
            "unsupported packing NMC"
        );
    }
}
