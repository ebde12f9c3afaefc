//! GRIB2 data unpacking algorithms.
//!
//! Only simple packing (template 5.0) is decoded here; every other
//! data representation template is reported as unsupported.

use crate::sections::MAX_GRID_POINTS;
use crate::{Grib2Error, Result};

/// Parameters of a simple-packed field (Data Representation Template 5.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplePacking {
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
}

/// Unpack simple packed GRIB2 data
///
/// Simple packing formula: value = (reference_value + packed_value * 2^E) * 10^(-D).
/// `num_points` is the number of grid points; with a bitmap only the points
/// whose bit is set consume a packed value, the others become `missing`.
pub fn unpack_simple(
    packed_data: &[u8],
    num_points: usize,
    packing: &SimplePacking,
    bitmap: Option<&[u8]>,
    missing: f32,
) -> Result<Vec<f32>> {
    let binary_scale = 2.0_f64.powi(packing.binary_scale_factor as i32);
    let decimal_scale = 10.0_f64.powi(-(packing.decimal_scale_factor as i32));
    let reference = packing.reference_value as f64;
    let bits_per_value = packing.bits_per_value as usize;

    if bits_per_value > 32 {
        return Err(Grib2Error::UnpackingError(format!(
            "Invalid number of bits: {}",
            bits_per_value
        )));
    }

    if num_points > MAX_GRID_POINTS {
        return Err(Grib2Error::UnpackingError(format!(
            "{} points exceeds the limit of {}",
            num_points, MAX_GRID_POINTS
        )));
    }
    let present = match bitmap {
        Some(bm) => {
            if bm.len() * 8 < num_points {
                return Err(Grib2Error::UnpackingError(format!(
                    "bitmap of {} bytes covers fewer than {} points",
                    bm.len(),
                    num_points
                )));
            }
            (0..num_points).filter(|i| bitmap_bit(bm, *i)).count()
        }
        None => num_points,
    };
    if bits_per_value > 0 && packed_data.len() * 8 < present * bits_per_value {
        return Err(Grib2Error::UnpackingError(format!(
            "{} values of {} bits need more than {} data bytes",
            present,
            bits_per_value,
            packed_data.len()
        )));
    }

    let mut values = Vec::with_capacity(num_points);
    let mut bit_position = 0;

    for i in 0..num_points {
        // Bitmap: 1 bit per data point, 1 = value present, 0 = missing
        let has_value = bitmap.map_or(true, |bm| bitmap_bit(bm, i));

        if !has_value {
            values.push(missing);
            continue;
        }

        let packed_value = if bits_per_value == 0 {
            0
        } else {
            let v = extract_bits(packed_data, bit_position, bits_per_value)?;
            bit_position += bits_per_value;
            v
        };

        let value = (reference + packed_value as f64 * binary_scale) * decimal_scale;
        values.push(value as f32);
    }

    Ok(values)
}

fn bitmap_bit(bitmap: &[u8], i: usize) -> bool {
    (bitmap[i / 8] >> (7 - (i % 8))) & 1 == 1
}

/// Extract `num_bits` bits starting at bit `start_bit`, most significant
/// bit first.
pub fn extract_bits(data: &[u8], start_bit: usize, num_bits: usize) -> Result<u32> {
    if num_bits > 32 || num_bits == 0 {
        return Err(Grib2Error::UnpackingError(format!(
            "Invalid number of bits: {}",
            num_bits
        )));
    }

    let end_bit = start_bit + num_bits;
    if end_bit > data.len() * 8 {
        return Err(Grib2Error::UnpackingError(
            "Not enough data to extract bits".to_string(),
        ));
    }

    // Gather the covering bytes into a 64-bit accumulator; at most five
    // bytes are needed for a 32-bit field at any alignment.
    let first = start_bit / 8;
    let last = (end_bit - 1) / 8;
    let acc = data[first..=last]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | *b as u64);
    let trailing = (last + 1) * 8 - end_bit;
    let mask = (1u64 << num_bits) - 1;
    Ok(((acc >> trailing) & mask) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packing(reference: f32, e: i16, d: i16, bits: u8) -> SimplePacking {
        SimplePacking {
            reference_value: reference,
            binary_scale_factor: e,
            decimal_scale_factor: d,
            bits_per_value: bits,
        }
    }

    #[test]
    fn test_extract_bits() {
        // Test with simple byte: 0b10110101
        let data = vec![0b10110101];

        assert_eq!(extract_bits(&data, 0, 2).unwrap(), 0b10);
        assert_eq!(extract_bits(&data, 2, 2).unwrap(), 0b11);
        assert_eq!(extract_bits(&data, 0, 8).unwrap(), 0b10110101);
    }

    #[test]
    fn test_extract_bits_across_bytes() {
        let data = [0xFF, 0x00, 0xFF, 0x00, 0xFF];
        assert_eq!(extract_bits(&data, 4, 8).unwrap(), 0xF0);
        assert_eq!(extract_bits(&data, 4, 32).unwrap(), 0xF00F_F00F);
        assert!(extract_bits(&data, 36, 8).is_err());
    }

    #[test]
    fn test_simple_unpacking() {
        let packed = vec![100, 200];
        let values = unpack_simple(&packed, 2, &packing(0.0, 0, 0, 8), None, f32::NAN).unwrap();
        assert_eq!(values, vec![100.0, 200.0]);
    }

    #[test]
    fn test_scale_factors() {
        // (10 + 3 * 2^1) * 10^-1 = 1.6
        let values = unpack_simple(&[0x30], 1, &packing(10.0, 1, 1, 4), None, f32::NAN).unwrap();
        assert!((values[0] - 1.6).abs() < 1e-6);
    }

    #[test]
    fn test_zero_bits_is_constant_field() {
        let values = unpack_simple(&[], 3, &packing(5.0, 0, 1, 0), None, f32::NAN).unwrap();
        assert_eq!(values, vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_bitmap_skips_packed_values() {
        // Points 0 and 2 present, point 1 missing
        let bitmap = [0b1010_0000];
        let values =
            unpack_simple(&[7, 9], 3, &packing(0.0, 0, 0, 8), Some(&bitmap), -9999.0).unwrap();
        assert_eq!(values, vec![7.0, -9999.0, 9.0]);
    }

    #[test]
    fn test_short_inputs_rejected_before_unpacking() {
        let p = packing(0.0, 0, 0, 8);
        assert!(unpack_simple(&[1, 2], 3, &p, None, 0.0).is_err());
        assert!(unpack_simple(&[1; 16], 9, &p, Some(&[0xFF]), 0.0).is_err());
        assert!(unpack_simple(&[], MAX_GRID_POINTS + 1, &packing(0.0, 0, 0, 0), None, 0.0).is_err());
    }
}
