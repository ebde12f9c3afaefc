//! Scan-mode driven reordering of raw grid point arrays.
//!
//! Encoded grids may store their points in any of the traversals allowed by
//! the GRIB scanning-mode flag table (3.4). [`normalize`] rewrites such an
//! array into the canonical layout used everywhere else: row-major, first
//! row at the south edge, each row running west to east.

use serde::{Deserialize, Serialize};

use crate::error::{GridProcessorError, Result};

/// Scanning mode byte describing a grid already in canonical order.
pub const CANONICAL_SCAN_MODE: u8 = 0x40;

const I_NEGATIVE: u8 = 0x80;
const J_POSITIVE: u8 = 0x40;
const J_CONSECUTIVE: u8 = 0x20;
const BOUSTROPHEDON: u8 = 0x10;

/// Traversal flags decoded from a scanning mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMode {
    /// Points along a row run east to west.
    pub i_negative: bool,
    /// Rows run south to north.
    pub j_positive: bool,
    /// Adjacent points belong to the same column.
    pub j_consecutive: bool,
    /// Every other line reverses direction.
    pub boustrophedon: bool,
}

impl ScanMode {
    /// Canonical orientation.
    pub const CANONICAL: ScanMode = ScanMode {
        i_negative: false,
        j_positive: true,
        j_consecutive: false,
        boustrophedon: false,
    };

    /// Decode the high four bits of a scanning mode byte.
    pub fn from_flag(flag: u8) -> Self {
        Self {
            i_negative: flag & I_NEGATIVE != 0,
            j_positive: flag & J_POSITIVE != 0,
            j_consecutive: flag & J_CONSECUTIVE != 0,
            boustrophedon: flag & BOUSTROPHEDON != 0,
        }
    }

    /// Encode back into a scanning mode byte.
    pub fn to_flag(&self) -> u8 {
        let mut flag = 0;
        if self.i_negative {
            flag |= I_NEGATIVE;
        }
        if self.j_positive {
            flag |= J_POSITIVE;
        }
        if self.j_consecutive {
            flag |= J_CONSECUTIVE;
        }
        if self.boustrophedon {
            flag |= BOUSTROPHEDON;
        }
        flag
    }

    /// True when no reordering is needed.
    pub fn is_canonical(&self) -> bool {
        *self == Self::CANONICAL
    }
}

impl Default for ScanMode {
    fn default() -> Self {
        Self::CANONICAL
    }
}

/// Length of the canonical array for an `nx` by `ny` grid.
///
/// Reordering never changes the number of points, whatever the scan mode.
pub fn canonical_len(_scan: ScanMode, nx: usize, ny: usize) -> usize {
    nx * ny
}

/// Indices `begin, begin + inc, ...` that stay inside `0..len`.
fn steps(begin: isize, inc: isize, len: isize) -> impl Iterator<Item = isize> {
    std::iter::successors(Some(begin), move |v| Some(v + inc))
        .take_while(move |v| (0..len).contains(v))
}

/// Reorder `raw`, stored with traversal `scan`, into canonical order.
///
/// `kx` is the number of points along a row and `ky` the number of rows of
/// the physical grid.
pub fn normalize(raw: &[f32], kx: usize, ky: usize, scan: ScanMode) -> Result<Vec<f32>> {
    if raw.len() != kx * ky {
        return Err(GridProcessorError::DimensionMismatch {
            expected: kx * ky,
            actual: raw.len(),
        });
    }

    let nx = kx as isize;
    let ny = ky as isize;
    let (mut ibeg, mut iinc) = if scan.i_negative { (nx - 1, -1) } else { (0, 1) };
    let (jbeg, jinc) = if scan.j_positive { (0, 1) } else { (ny - 1, -1) };

    let mut out = Vec::with_capacity(raw.len());
    match (scan.j_consecutive, scan.boustrophedon) {
        (false, false) => {
            for j in steps(jbeg, jinc, ny) {
                for i in steps(ibeg, iinc, nx) {
                    out.push(raw[(nx * j + i) as usize]);
                }
            }
        }
        (true, false) => {
            for j in steps(jbeg, jinc, ny) {
                for i in steps(ibeg, iinc, nx) {
                    out.push(raw[(ny * i + j) as usize]);
                }
            }
        }
        (false, true) => {
            // An even row count scanned north to south ends its first row
            // on the opposite side.
            if !scan.j_positive && ky % 2 == 0 {
                (ibeg, iinc) = if scan.i_negative { (0, 1) } else { (nx - 1, -1) };
            }
            for j in steps(jbeg, jinc, ny) {
                for i in steps(ibeg, iinc, nx) {
                    out.push(raw[(nx * j + i) as usize]);
                }
                ibeg = if ibeg != 0 { 0 } else { nx - 1 };
                iinc = -iinc;
            }
        }
        (true, true) => {
            for j in steps(jbeg, jinc, ny) {
                let mirrored = ny - j - 1;
                let mut row = if scan.i_negative && kx % 2 == 0 { mirrored } else { j };
                for i in steps(ibeg, iinc, nx) {
                    out.push(raw[(ny * i + row) as usize]);
                    row = if row != j { j } else { mirrored };
                }
            }
        }
    }

    Ok(out)
}

/// Reorder using a raw scanning mode byte.
pub fn normalize_flag(raw: &[f32], kx: usize, ky: usize, flag: u8) -> Result<Vec<f32>> {
    normalize(raw, kx, ky, ScanMode::from_flag(flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f32> {
        (0..n).map(|v| v as f32).collect()
    }

    #[test]
    fn test_flag_roundtrip() {
        for flag in [0x00u8, 0x10, 0x20, 0x40, 0x50, 0x60, 0x80, 0xF0] {
            assert_eq!(ScanMode::from_flag(flag).to_flag(), flag);
        }
        assert!(ScanMode::from_flag(CANONICAL_SCAN_MODE).is_canonical());
        // Low bits carry no traversal information.
        assert!(ScanMode::from_flag(0x4F).is_canonical());
    }

    #[test]
    fn test_canonical_is_identity() {
        let raw = ramp(12);
        assert_eq!(normalize_flag(&raw, 4, 3, CANONICAL_SCAN_MODE).unwrap(), raw);
    }

    #[test]
    fn test_north_to_south_rows_flip() {
        let raw = ramp(6);
        let out = normalize_flag(&raw, 3, 2, 0x00).unwrap();
        assert_eq!(out, vec![3.0, 4.0, 5.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_east_to_west_rows_reverse() {
        let raw = ramp(6);
        let out = normalize_flag(&raw, 3, 2, 0xC0).unwrap();
        assert_eq!(out, vec![2.0, 1.0, 0.0, 5.0, 4.0, 3.0]);
    }

    #[test]
    fn test_column_major_transposes() {
        let raw = ramp(6);
        let out = normalize_flag(&raw, 3, 2, 0x60).unwrap();
        assert_eq!(out, vec![0.0, 2.0, 4.0, 1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_row_boustrophedon() {
        let raw = ramp(6);
        assert_eq!(
            normalize_flag(&raw, 3, 2, 0x50).unwrap(),
            vec![0.0, 1.0, 2.0, 5.0, 4.0, 3.0]
        );
        assert_eq!(
            normalize_flag(&raw, 3, 2, 0x10).unwrap(),
            vec![5.0, 4.0, 3.0, 0.0, 1.0, 2.0]
        );
    }

    #[test]
    fn test_column_boustrophedon() {
        let raw = ramp(6);
        let out = normalize_flag(&raw, 2, 3, 0x70).unwrap();
        assert_eq!(out, vec![0.0, 5.0, 1.0, 4.0, 2.0, 3.0]);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = normalize_flag(&ramp(5), 3, 2, 0x40).unwrap_err();
        assert_eq!(
            err,
            GridProcessorError::DimensionMismatch {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn test_canonical_len() {
        assert_eq!(canonical_len(ScanMode::from_flag(0x70), 7, 5), 35);
    }
}
