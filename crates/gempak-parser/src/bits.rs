//! Bit-field extraction from packed 32-bit words.
//!
//! Two numbering conventions occur in DM files. Real-packed records number
//! bits from the least significant end of each word ([`extract_field`]);
//! GRIB-style grids number them from the most significant end
//! ([`extract_msb_field`]). Fields may straddle two words in both.
//!
//! [`BitCursor`] is the byte-oriented streaming reader used for GRIB-style
//! grids when the word unpacker is turned off.

use std::io::Read;

use crate::error::{GempakError, Result};

/// All-ones pattern of a `width`-bit field.
pub fn missing_pattern(width: u32) -> u32 {
    match width {
        0 => 0,
        w if w >= 32 => u32::MAX,
        w => u32::MAX >> (32 - w),
    }
}

fn field_words(words: &[u32], bit_offset: usize, width: u32) -> Result<(usize, usize)> {
    if width == 0 || width > 32 {
        return Err(GempakError::OutOfBounds {
            start: bit_offset,
            count: width as usize,
            len: 32,
        });
    }
    let first = bit_offset / 32;
    let last = (bit_offset + width as usize - 1) / 32;
    if last >= words.len() {
        return Err(GempakError::OutOfBounds {
            start: first,
            count: last - first + 1,
            len: words.len(),
        });
    }
    Ok((first, last))
}

/// Extract a `width`-bit unsigned field starting at 0-based `bit_offset`,
/// counting from the least significant bit of the first word.
pub fn extract_field(words: &[u32], bit_offset: usize, width: u32) -> Result<u32> {
    let (first, last) = field_words(words, bit_offset, width)?;
    let mask = missing_pattern(width);
    let shift = (bit_offset % 32) as u32;

    let mut value = (words[first] >> shift) & mask;
    if last > first {
        value |= (words[last] << (32 - shift)) & mask;
    }
    Ok(value)
}

/// Extract a `width`-bit unsigned field starting at 0-based `bit_offset`,
/// counting from the most significant bit of the first word.
pub fn extract_msb_field(words: &[u32], bit_offset: usize, width: u32) -> Result<u32> {
    let (first, last) = field_words(words, bit_offset, width)?;
    let low = if last > first { words[last] as u64 } else { 0 };
    let combined = ((words[first] as u64) << 32) | low;
    let shift = 64 - (bit_offset % 32) as u32 - width;
    Ok(((combined >> shift) as u32) & missing_pattern(width))
}

/// Calibration applied to an extracted field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldCalibration {
    pub offset: i32,
    pub scale: f32,
    pub missing: f32,
}

/// Extract a field and calibrate it as `(value + offset) * scale`.
///
/// A field equal to the all-ones pattern for its width is missing.
pub fn unpack_field(
    words: &[u32],
    bit_offset: usize,
    width: u32,
    calibration: &FieldCalibration,
) -> Result<f32> {
    let value = extract_field(words, bit_offset, width)?;
    if value == missing_pattern(width) {
        return Ok(calibration.missing);
    }
    Ok((value as i64 + calibration.offset as i64) as f32 * calibration.scale)
}

/// Streaming bit reader over a byte source.
///
/// Bits are consumed most significant first. When `swap` is set the bytes
/// are fetched four at a time and handed out last-read-first, so a
/// little-endian word is consumed as if it had been stored big-endian.
#[derive(Debug)]
pub struct BitCursor<R> {
    source: R,
    swap: bool,
    bit_pos: u32,
    bit_buf: u32,
    pending: [u8; 4],
    next: usize,
}

impl<R: Read> BitCursor<R> {
    pub fn new(source: R, swap: bool) -> Self {
        Self {
            source,
            swap,
            bit_pos: 0,
            bit_buf: 0,
            pending: [0; 4],
            next: 0,
        }
    }

    fn next_byte(&mut self) -> std::io::Result<u32> {
        if !self.swap {
            let mut byte = [0u8; 1];
            self.source.read_exact(&mut byte)?;
            return Ok(byte[0] as u32);
        }
        if self.next == 0 {
            self.source.read_exact(&mut self.pending)?;
            self.next = 4;
        }
        self.next -= 1;
        Ok(self.pending[self.next] as u32)
    }

    /// Read the next `nbits` bits as an unsigned integer.
    pub fn read_bits(&mut self, nbits: u32) -> std::io::Result<u32> {
        let mut bits_left = nbits;
        let mut result = 0u32;

        if self.bit_pos == 0 {
            self.bit_buf = self.next_byte()?;
            self.bit_pos = 8;
        }

        loop {
            let shift = bits_left as i32 - self.bit_pos as i32;
            if shift > 0 {
                // Take the whole buffer
                result |= self.bit_buf << shift;
                bits_left -= self.bit_pos;
                self.bit_buf = self.next_byte()?;
                self.bit_pos = 8;
            } else {
                result |= self.bit_buf >> -shift;
                self.bit_pos -= bits_left;
                self.bit_buf &= 0xFF >> (8 - self.bit_pos);
                return Ok(result);
            }
        }
    }
}
