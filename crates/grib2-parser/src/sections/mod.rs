//! GRIB2 section parsing.
//!
//! Each parser takes the bytes of exactly one section, starting at its
//! 4-byte length field. Locating the sections inside a message is done by
//! [`read_section_header`] while walking the message.

use crate::{Grib2Error, Result};
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use grid_processor::QuasiGridShape;

/// Length of Section 0.
pub const INDICATOR_LEN: usize = 16;

/// All-ones value marking an absent 32-bit quantity (e.g. a variable Ni).
pub const MISSING_U32: u32 = 0xFFFF_FFFF;

/// Largest grid accepted for unpacking.
pub const MAX_GRID_POINTS: usize = 1 << 28;

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Length and number of a section, read from its first five octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub length: usize,
    pub number: u8,
}

/// Section 1: Identification Section
#[derive(Debug, Clone)]
pub struct Identification {
    pub center: u16,
    pub sub_center: u16,
    pub table_version: u8,
    pub local_table_version: u8,
    pub significance_of_reference_time: u8,
    pub reference_time: DateTime<Utc>,
    pub production_status: u8,
    pub data_type: u8,
}

/// Section 3: Grid Definition Section (template 3.0, latitude/longitude)
#[derive(Debug, Clone, PartialEq)]
pub struct GridDefinition {
    pub source: u8,
    pub num_data_points: u32,
    pub template: u16,
    pub earth_shape: u8,
    /// Points along a parallel; [`MISSING_U32`] when rows vary in length.
    pub ni: u32,
    /// Points along a meridian; [`MISSING_U32`] when columns vary in length.
    pub nj: u32,
    pub la1_microdegrees: i32,
    pub lo1_microdegrees: i32,
    pub la2_microdegrees: i32,
    pub lo2_microdegrees: i32,
    pub di_microdegrees: u32,
    pub dj_microdegrees: u32,
    pub scanning_mode: u8,
    /// Point count per line for quasi-regular grids, empty otherwise.
    pub npts_in_line: Vec<u32>,
}

impl GridDefinition {
    pub fn is_quasi_regular(&self) -> bool {
        !self.npts_in_line.is_empty()
    }

    /// Shape of the quasi-regular grid, if this is one.
    pub fn quasi_shape(&self) -> Option<Result<QuasiGridShape>> {
        if !self.is_quasi_regular() {
            return None;
        }
        let nx = if self.ni == MISSING_U32 { -1 } else { self.ni as i64 };
        let ny = if self.nj == MISSING_U32 { -1 } else { self.nj as i64 };
        let counts = self.npts_in_line.iter().map(|n| *n as usize).collect();
        Some(QuasiGridShape::new(nx, ny, counts).map_err(Grib2Error::from))
    }

    /// Number of values stored in the data section, before any bitmap.
    ///
    /// A regular grid needs both dimensions, and the count must agree with
    /// the number of data points declared in this section.
    pub fn stored_points(&self) -> Result<usize> {
        let count = if self.is_quasi_regular() {
            self.npts_in_line
                .iter()
                .try_fold(0usize, |acc, n| acc.checked_add(*n as usize))
        } else if self.ni == MISSING_U32 || self.nj == MISSING_U32 {
            return Err(invalid_grid(format!(
                "regular grid with a missing dimension ({} x {})",
                self.ni, self.nj
            )));
        } else {
            (self.ni as usize).checked_mul(self.nj as usize)
        };

        let count = count
            .filter(|n| *n <= MAX_GRID_POINTS)
            .ok_or_else(|| invalid_grid(format!("grid of {} x {} points is too large", self.ni, self.nj)))?;
        if count != self.num_data_points as usize {
            return Err(invalid_grid(format!(
                "{} points in the grid but {} data points declared",
                count, self.num_data_points
            )));
        }
        Ok(count)
    }
}

fn invalid_grid(reason: String) -> Grib2Error {
    Grib2Error::InvalidSection { section: 3, reason }
}

/// Section 4: Product Definition Section
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDefinition {
    pub num_coordinates: u16,
    pub template: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub generating_process: u8,
    pub forecast_time: u32,
    pub level_type: u8,
    pub level_scale: i8,
    pub level_value: u32,
}

/// Section 5: Data Representation Section
#[derive(Debug, Clone, PartialEq)]
pub struct DataRepresentation {
    pub num_data_points: u32,
    pub template: u16,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
    pub original_data_type: u8,
}

/// Section 6 bitmap indicator values.
pub mod bitmap_indicator {
    /// A bitmap follows in this section.
    pub const PRESENT: u8 = 0;
    /// Reuse the bitmap most recently defined in the same message.
    pub const PREVIOUSLY_DEFINED: u8 = 254;
    /// No bitmap applies; every point is present.
    pub const NONE: u8 = 255;
}

/// Section 6: Bitmap Section
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub indicator: u8,
    pub data: Bytes,
}

/// Section 7: Data Section
#[derive(Debug, Clone)]
pub struct DataSection {
    pub data: Bytes,
}

// ===== Parsing Functions =====

/// Parse Section 0 (Indicator) from start of message
pub fn parse_indicator(data: &[u8]) -> Result<Indicator> {
    if data.len() < INDICATOR_LEN {
        return Err(Grib2Error::InvalidFormat(
            "Not enough data for indicator section".to_string(),
        ));
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::InvalidFormat(
            "Invalid GRIB magic bytes".to_string(),
        ));
    }

    // Octets 5-6 reserved, 7 discipline, 8 edition, 9-16 total length
    let discipline = data[6];
    let edition = data[7];
    if edition != 2 {
        return Err(Grib2Error::InvalidFormat(format!(
            "Expected GRIB edition 2, got {}",
            edition
        )));
    }

    Ok(Indicator {
        discipline,
        edition,
        message_length: be_u64(&data[8..16]),
    })
}

/// Read the section header at `offset`, or `None` at the "7777" end marker.
pub fn read_section_header(data: &[u8], offset: usize) -> Result<Option<SectionHeader>> {
    if data.len() >= offset + 4 && &data[offset..offset + 4] == b"7777" {
        return Ok(None);
    }
    if offset + 5 > data.len() {
        return Err(Grib2Error::InvalidFormat(format!(
            "message truncated at offset {}",
            offset
        )));
    }

    let length = be_u32(&data[offset..offset + 4]) as usize;
    let number = data[offset + 4];
    if length < 5 || offset + length > data.len() {
        return Err(Grib2Error::InvalidSection {
            section: number,
            reason: format!("Invalid section length {} at offset {}", length, offset),
        });
    }
    Ok(Some(SectionHeader { length, number }))
}

/// Parse Section 1 (Identification)
pub fn parse_identification(section: &[u8]) -> Result<Identification> {
    require_len(section, 1, 21)?;

    let year = be_u16(&section[12..14]);
    let (month, day, hour, minute, second) =
        (section[14], section[15], section[16], section[17], section[18]);

    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| Grib2Error::InvalidSection {
            section: 1,
            reason: format!(
                "Invalid date: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ),
        })?;

    Ok(Identification {
        center: be_u16(&section[5..7]),
        sub_center: be_u16(&section[7..9]),
        table_version: section[9],
        local_table_version: section[10],
        significance_of_reference_time: section[11],
        reference_time: DateTime::<Utc>::from_naive_utc_and_offset(reference_time, Utc),
        production_status: section[19],
        data_type: section[20],
    })
}

/// Parse Section 3 (Grid Definition)
///
/// Only template 3.0 is understood. Its optional list of points per line
/// follows the 72 fixed octets.
pub fn parse_grid_definition(section: &[u8]) -> Result<GridDefinition> {
    require_len(section, 3, 14)?;

    let source = section[5];
    let num_data_points = be_u32(&section[6..10]);
    let list_octets = section[10] as usize;
    let template = be_u16(&section[12..14]);
    if template != 0 {
        return Err(Grib2Error::UnsupportedTemplate {
            section: 3,
            template,
        });
    }
    require_len(section, 3, 72)?;

    let npts_in_line = if list_octets > 0 {
        section[72..]
            .chunks_exact(list_octets)
            .map(|entry| entry.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
            .collect()
    } else {
        Vec::new()
    };

    Ok(GridDefinition {
        source,
        num_data_points,
        template,
        earth_shape: section[14],
        ni: be_u32(&section[30..34]),
        nj: be_u32(&section[34..38]),
        la1_microdegrees: decode_grib2_signed(&section[46..50]),
        lo1_microdegrees: decode_grib2_signed(&section[50..54]),
        la2_microdegrees: decode_grib2_signed(&section[55..59]),
        lo2_microdegrees: decode_grib2_signed(&section[59..63]),
        di_microdegrees: be_u32(&section[63..67]),
        dj_microdegrees: be_u32(&section[67..71]),
        scanning_mode: section[71],
        npts_in_line,
    })
}

/// Parse Section 4 (Product Definition)
///
/// Templates 4.0 to 4.15 share the leading octets read here.
pub fn parse_product_definition(section: &[u8]) -> Result<ProductDefinition> {
    require_len(section, 4, 11)?;

    let has_level = section.len() >= 28;
    Ok(ProductDefinition {
        num_coordinates: be_u16(&section[5..7]),
        template: be_u16(&section[7..9]),
        parameter_category: section[9],
        parameter_number: section[10],
        generating_process: section.get(11).copied().unwrap_or(0),
        forecast_time: if has_level { be_u32(&section[18..22]) } else { 0 },
        level_type: section.get(22).copied().unwrap_or(255),
        level_scale: if has_level { decode_grib2_signed(&section[23..24]) as i8 } else { 0 },
        level_value: if has_level { be_u32(&section[24..28]) } else { 0 },
    })
}

/// Parse Section 5 (Data Representation)
pub fn parse_data_representation(section: &[u8]) -> Result<DataRepresentation> {
    require_len(section, 5, 11)?;

    let num_data_points = be_u32(&section[5..9]);
    let template = be_u16(&section[9..11]);
    if section.len() < 21 {
        return Ok(DataRepresentation {
            num_data_points,
            template,
            reference_value: 0.0,
            binary_scale_factor: 0,
            decimal_scale_factor: 0,
            bits_per_value: 0,
            original_data_type: 0,
        });
    }

    // Templates 5.0 through 5.3 and 5.40 open with the simple-packing block
    Ok(DataRepresentation {
        num_data_points,
        template,
        reference_value: f32::from_be_bytes([section[11], section[12], section[13], section[14]]),
        binary_scale_factor: decode_grib2_signed(&section[15..17]) as i16,
        decimal_scale_factor: decode_grib2_signed(&section[17..19]) as i16,
        bits_per_value: section[19],
        original_data_type: section[20],
    })
}

/// Parse Section 6 (Bitmap)
///
/// The bitmap bytes are only present with indicator 0; resolving indicator
/// 254 is left to the message walker.
pub fn parse_bitmap(section: &Bytes) -> Result<Bitmap> {
    require_len(section, 6, 6)?;
    let indicator = section[5];
    let data = if indicator == bitmap_indicator::PRESENT {
        section.slice(6..)
    } else {
        Bytes::new()
    };
    Ok(Bitmap { indicator, data })
}

/// Parse Section 7 (Data)
pub fn parse_data_section(section: &Bytes) -> Result<DataSection> {
    require_len(section, 7, 5)?;
    Ok(DataSection {
        data: section.slice(5..),
    })
}

// ===== Helper Functions =====

/// Decode a GRIB2 sign-magnitude integer of one, two or four octets.
///
/// The high bit is the sign; the remaining bits are the magnitude. Any
/// other length decodes to zero.
pub fn decode_grib2_signed(bytes: &[u8]) -> i32 {
    let (raw, sign_bit) = match bytes.len() {
        1 => (bytes[0] as u32, 0x80),
        2 => (be_u16(bytes) as u32, 0x8000),
        4 => (be_u32(bytes), 0x8000_0000),
        _ => return 0,
    };
    let magnitude = (raw & !sign_bit) as i32;
    if raw & sign_bit != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn require_len(section: &[u8], number: u8, min: usize) -> Result<()> {
    if section.len() < min {
        return Err(Grib2Error::InvalidSection {
            section: number,
            reason: format!("Not enough data: need {} bytes, got {}", min, section.len()),
        });
    }
    Ok(())
}

fn be_u16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

fn be_u64(b: &[u8]) -> u64 {
    b.iter().take(8).fold(0u64, |acc, v| (acc << 8) | *v as u64)
}
