//! Word-addressed access to a DM file.
//!
//! Every position is a 1-based 32-bit "word"; word `n` starts at byte
//! `(n - 1) * 4`. Words are stored big-endian unless the label shows the
//! file was written on a machine of the other byte order, in which case
//! every numeric read is swapped. Character data is always read as raw
//! bytes.

use std::io::{Read, Seek, SeekFrom};

use crate::config::DecoderConfig;
use crate::constants::{MACHINE_TYPE_WORD, SWAP_THRESHOLD};
use crate::error::{GempakError, Result};

/// Byte order of the words in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    /// Decode a word stored in this order.
    pub fn decode(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
        }
    }

    /// Encode a word the way this order stores it.
    pub fn encode(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::BigEndian => value.to_be_bytes(),
            ByteOrder::LittleEndian => value.to_le_bytes(),
        }
    }
}

/// Missing-value substitution rules.
///
/// Values equal to the file's own missing codes are replaced by the
/// universal sentinels handed back to callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissingValues {
    pub int_missing: i32,
    pub float_missing: f32,
    pub epsilon: f32,
    pub file_int_missing: i32,
    pub file_float_missing: f32,
}

impl MissingValues {
    /// Rules for a file whose codes match the universal sentinels.
    pub fn universal(config: &DecoderConfig) -> Self {
        Self {
            int_missing: config.int_missing,
            float_missing: config.float_missing,
            epsilon: config.missing_epsilon,
            file_int_missing: config.int_missing,
            file_float_missing: config.float_missing,
        }
    }

    /// Same sentinels, with the file's declared missing codes.
    pub fn with_file_codes(self, kmissd: i32, smissd: f32) -> Self {
        Self {
            file_int_missing: kmissd,
            file_float_missing: smissd,
            ..self
        }
    }

    pub fn int(&self, raw: i32) -> i32 {
        if self.file_int_missing != self.int_missing && raw == self.file_int_missing {
            self.int_missing
        } else {
            raw
        }
    }

    pub fn float(&self, raw: f32) -> f32 {
        if self.file_float_missing != self.float_missing
            && (raw - self.file_float_missing).abs() < self.epsilon
        {
            self.float_missing
        } else {
            raw
        }
    }
}

/// Byte offset of a 1-based word.
pub fn word_offset(word: i64) -> Result<u64> {
    if word < 1 {
        return Err(GempakError::InvalidWord(word));
    }
    Ok(((word - 1) as u64) * 4)
}

/// Random-access reader addressing a byte source in 32-bit words.
#[derive(Debug)]
pub struct WordReader<R> {
    inner: R,
    needs_swap: bool,
    missing: MissingValues,
}

impl<R: Read + Seek> WordReader<R> {
    pub fn new(inner: R, missing: MissingValues) -> Self {
        Self {
            inner,
            needs_swap: false,
            missing,
        }
    }

    pub fn needs_swap(&self) -> bool {
        self.needs_swap
    }

    pub fn set_needs_swap(&mut self, swap: bool) {
        self.needs_swap = swap;
    }

    /// Byte order used for numeric reads.
    pub fn byte_order(&self) -> ByteOrder {
        if self.needs_swap {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }

    pub fn missing(&self) -> &MissingValues {
        &self.missing
    }

    pub fn set_missing(&mut self, missing: MissingValues) {
        self.missing = missing;
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Total length of the source in whole words.
    pub fn len_words(&mut self) -> Result<u64> {
        let end = self.inner.seek(SeekFrom::End(0))?;
        Ok(end / 4)
    }

    /// Position the source at the start of `word`.
    pub fn seek_word(&mut self, word: i64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(word_offset(word)?))?;
        Ok(())
    }

    /// Read `nbytes` raw bytes starting at `word`.
    pub fn read_bytes(&mut self, word: i64, nbytes: usize) -> Result<Vec<u8>> {
        self.seek_word(word)?;
        let mut buf = vec![0u8; nbytes];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_word_bytes(&mut self, word: i64) -> Result<[u8; 4]> {
        self.seek_word(word)?;
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read an integer without missing-value substitution.
    pub fn read_int_raw(&mut self, word: i64) -> Result<i32> {
        let bytes = self.read_word_bytes(word)?;
        Ok(self.byte_order().decode(bytes) as i32)
    }

    /// Read an integer, substituting the integer sentinel for the file's
    /// missing code.
    pub fn read_int(&mut self, word: i64) -> Result<i32> {
        let raw = self.read_int_raw(word)?;
        Ok(self.missing.int(raw))
    }

    /// Read a float, substituting the float sentinel for values within the
    /// tolerance of the file's missing code.
    pub fn read_float(&mut self, word: i64) -> Result<f32> {
        let bytes = self.read_word_bytes(word)?;
        let raw = f32::from_bits(self.byte_order().decode(bytes));
        Ok(self.missing.float(raw))
    }

    /// Read a float big-endian whatever the file's byte order.
    pub fn read_float_unswapped(&mut self, word: i64) -> Result<f32> {
        let bytes = self.read_word_bytes(word)?;
        let raw = f32::from_bits(u32::from_be_bytes(bytes));
        Ok(self.missing.float(raw))
    }

    /// Read `nchars` raw characters.
    pub fn read_string(&mut self, word: i64, nchars: usize) -> Result<String> {
        let bytes = self.read_bytes(word, nchars)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read one 4-character word.
    pub fn read_chars(&mut self, word: i64) -> Result<String> {
        self.read_string(word, 4)
    }

    /// Read `count` words as unsigned integers, with no substitution.
    pub fn read_raw_words(&mut self, word: i64, count: usize) -> Result<Vec<u32>> {
        let order = self.byte_order();
        let bytes = self.read_bytes(word, count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| order.decode([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Read `count` integers into `buf[start..start + count]`.
    pub fn read_ints(&mut self, word: i64, buf: &mut [i32], start: usize, count: usize) -> Result<()> {
        check_bounds(start, count, buf.len())?;
        let words = self.read_raw_words(word, count)?;
        for (slot, raw) in buf[start..start + count].iter_mut().zip(words) {
            *slot = self.missing.int(raw as i32);
        }
        Ok(())
    }

    /// Read `count` floats into `buf[start..start + count]`.
    pub fn read_floats(&mut self, word: i64, buf: &mut [f32], start: usize, count: usize) -> Result<()> {
        check_bounds(start, count, buf.len())?;
        let words = self.read_raw_words(word, count)?;
        for (slot, raw) in buf[start..start + count].iter_mut().zip(words) {
            *slot = self.missing.float(f32::from_bits(raw));
        }
        Ok(())
    }

    pub fn read_int_vec(&mut self, word: i64, count: usize) -> Result<Vec<i32>> {
        let mut buf = vec![0; count];
        self.read_ints(word, &mut buf, 0, count)?;
        Ok(buf)
    }

    pub fn read_float_vec(&mut self, word: i64, count: usize) -> Result<Vec<f32>> {
        let mut buf = vec![0.0; count];
        self.read_floats(word, &mut buf, 0, count)?;
        Ok(buf)
    }

    /// Decide the byte order from the machine type in the label.
    ///
    /// Returns the true machine type. A raw value above the swap threshold
    /// means the label was written with the opposite byte order; the value
    /// is swapped back and every later numeric read is swapped too.
    pub fn detect_byte_order(&mut self) -> Result<i32> {
        self.needs_swap = false;
        let raw = self.read_int_raw(MACHINE_TYPE_WORD)?;
        if raw > SWAP_THRESHOLD {
            self.needs_swap = true;
            return Ok(raw.swap_bytes());
        }
        Ok(raw)
    }
}

fn check_bounds(start: usize, count: usize, len: usize) -> Result<()> {
    match start.checked_add(count) {
        Some(end) if end <= len => Ok(()),
        _ => Err(GempakError::OutOfBounds { start, count, len }),
    }
}
