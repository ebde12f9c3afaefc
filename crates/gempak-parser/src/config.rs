//! Configuration for the GEMPAK decoders.

use grid_processor::InterpolationMethod;
use serde::{Deserialize, Serialize};

use crate::constants::{IMISSD, MAX_RECORD_WORDS, RDIFFD, RMISSD};
use crate::error::{GempakError, Result};

/// Per-file decoder settings.
///
/// Every reader owns a copy; nothing here is process-wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Integer missing value returned to callers.
    pub int_missing: i32,

    /// Float missing value returned to callers.
    pub float_missing: f32,

    /// Tolerance when matching a float against the file's missing code.
    pub missing_epsilon: f32,

    /// Decode GRIB-packed grids with the word unpacker instead of the
    /// streaming byte cursor.
    pub use_word_unpacker: bool,

    /// Records longer than this many words are treated as corrupt.
    pub max_record_words: i32,

    /// Interpolation for quasi-regular GRIB2 grids.
    pub quasi_interpolation: InterpolationMethod,

    /// Number of decoded grids kept by the shared reader.
    pub decoded_cache_entries: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            int_missing: IMISSD,
            float_missing: RMISSD,
            missing_epsilon: RDIFFD,
            use_word_unpacker: true,
            max_record_words: MAX_RECORD_WORDS,
            quasi_interpolation: InterpolationMethod::Linear,
            decoded_cache_entries: 32,
        }
    }
}

impl DecoderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GEMPAK_INT_MISSING") {
            if let Ok(v) = val.parse() {
                config.int_missing = v;
            }
        }

        if let Ok(val) = std::env::var("GEMPAK_FLOAT_MISSING") {
            if let Ok(v) = val.parse() {
                config.float_missing = v;
            }
        }

        if let Ok(val) = std::env::var("GEMPAK_MISSING_EPSILON") {
            if let Ok(v) = val.parse() {
                config.missing_epsilon = v;
            }
        }

        if let Ok(val) = std::env::var("GEMPAK_USE_WORD_UNPACKER") {
            config.use_word_unpacker = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("GEMPAK_MAX_RECORD_WORDS") {
            if let Ok(v) = val.parse() {
                config.max_record_words = v;
            }
        }

        if let Ok(val) = std::env::var("GEMPAK_QUASI_INTERPOLATION") {
            config.quasi_interpolation = InterpolationMethod::from_str(&val);
        }

        if let Ok(val) = std::env::var("GEMPAK_DECODED_CACHE_ENTRIES") {
            if let Ok(v) = val.parse() {
                config.decoded_cache_entries = v;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.missing_epsilon.is_nan() || self.missing_epsilon < 0.0 {
            return Err(GempakError::InvalidConfig(
                "missing_epsilon must be >= 0".to_string(),
            ));
        }

        if self.max_record_words <= 0 {
            return Err(GempakError::InvalidConfig(
                "max_record_words must be > 0".to_string(),
            ));
        }

        if self.decoded_cache_entries == 0 {
            return Err(GempakError::InvalidConfig(
                "decoded_cache_entries must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
