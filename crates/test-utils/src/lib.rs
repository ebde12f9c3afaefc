//! Fixtures shared by the decoder crates' tests.
//!
//! Most tests never touch a real file. They build DM files with
//! [`gempak::GridFileBuilder`] and GRIB2 messages with
//! [`grib2::Grib2Builder`], and check bit extraction against the reference
//! packers in [`bits`]. The few tests that read real GEMPAK samples name
//! them through [`files`] and skip with [`require_test_file!`] when the
//! sample is not on disk.

pub mod bits;
pub mod fixtures;
pub mod gempak;
pub mod generators;
pub mod grib2;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Resolve a sample file with [`find_test_file`], or return from the
/// calling test after noting the skip on stderr.
///
/// ```ignore
/// let path = require_test_file!(test_utils::files::GFS_GRID);
/// let reader = GempakGridReader::open(&path, DecoderConfig::default())?;
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!("SKIPPED: sample '{}' not found (set TEST_DATA_DIR)", $name);
                return;
            }
        }
    }};
}

/// Assert two numbers differ by no more than `epsilon`, comparing as `f64`.
///
/// Decoded grid values go through `f32` scale arithmetic, so exact
/// comparison is only used where the packing is exact.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "values differ: left {:?}, right {:?}, diff {:?} > {:?}",
                left, right, diff, epsilon
            );
        }
    }};
}
