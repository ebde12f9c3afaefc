//! Packed record decoding.
//!
//! A grid record starts with a packing-type word followed by the packing
//! parameters and the packed data. [`read_packed`] reads those words into a
//! [`RawGridRecord`]; [`RawGridRecord::decode`] turns it into calibrated
//! values. Reading needs the file, decoding does not, so a shared reader
//! can release its handle between the two.
//!
//! Real-packed (RPCK) parts use a different scheme described by
//! [`RealPackingLayout`].

use std::io::{Read, Seek};

use bytes::Bytes;
use grib2_parser::sections::MAX_GRID_POINTS;
use grib2_parser::Grib2Message;
use grid_processor::{normalize_flag, GridProcessorError};
use serde::Serialize;
use tracing::debug;

use crate::bits::{
    extract_msb_field, missing_pattern, unpack_field, BitCursor, FieldCalibration,
};
use crate::config::DecoderConfig;
use crate::error::{GempakError, NoDataReason, RecordOutcome, Result};
use crate::reader::{ByteOrder, WordReader};

/// Packing scheme codes stored in the first word of a grid record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PackingType {
    None = 0,
    Grib = 1,
    Nmc = 2,
    Difference = 3,
    Decimal = 4,
    Grib2 = 5,
}

impl PackingType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Grib),
            2 => Some(Self::Nmc),
            3 => Some(Self::Difference),
            4 => Some(Self::Decimal),
            5 => Some(Self::Grib2),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Packing types a grid file index lists.
    pub fn is_indexed(self) -> bool {
        matches!(self, Self::None | Self::Grib | Self::Grib2)
    }
}

impl std::fmt::Display for PackingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Grib => "GRIB",
            Self::Nmc => "NMC",
            Self::Difference => "DIF",
            Self::Decimal => "DEC",
            Self::Grib2 => "GRIB2",
        };
        write!(f, "{}", name)
    }
}

/// Parameters shared by the fixed-width packing schemes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplePackingParams {
    pub nbits: i32,
    pub missing_flag: bool,
    pub kxky: usize,
    pub reference: f32,
    pub scale: f32,
    /// Power of ten the unpacked values are divided by.
    pub decimal_scale: i32,
}

impl SimplePackingParams {
    /// Multiplier applied after unpacking.
    pub fn decimal_factor(&self) -> f32 {
        if self.decimal_scale == 0 {
            1.0
        } else {
            10f64.powi(-self.decimal_scale) as f32
        }
    }

    /// Parameters that cannot describe real data. Such grids decode to zeros.
    pub fn is_degenerate(&self) -> bool {
        self.nbits <= 1 || self.nbits > 31 || self.scale == 0.0
    }

    fn bits_needed(&self) -> usize {
        self.kxky * self.nbits.max(0) as usize
    }
}

/// Difference packing adds the row length and the minimum difference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferencePackingParams {
    pub simple: SimplePackingParams,
    pub kx: usize,
    pub difmin: f32,
}

/// How one grid record is packed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PackingDescriptor {
    None { count: usize },
    Grib(SimplePackingParams),
    Nmc(SimplePackingParams),
    Difference(DifferencePackingParams),
    Decimal(SimplePackingParams),
    Grib2 { kx: usize, ky: usize, scan_mode: u8 },
}

impl PackingDescriptor {
    pub fn packing_type(&self) -> PackingType {
        match self {
            Self::None { .. } => PackingType::None,
            Self::Grib(_) => PackingType::Grib,
            Self::Nmc(_) => PackingType::Nmc,
            Self::Difference(_) => PackingType::Difference,
            Self::Decimal(_) => PackingType::Decimal,
            Self::Grib2 { .. } => PackingType::Grib2,
        }
    }
}

/// Data words of a record as read from the file.
#[derive(Debug, Clone, PartialEq)]
pub enum PackedPayload {
    Floats(Vec<f32>),
    /// Packed words, already in host order.
    Words(Vec<u32>),
    /// Raw bytes of an embedded GRIB2 message.
    Bytes(Bytes),
}

/// A grid record read from the file but not yet unpacked.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGridRecord {
    pub descriptor: PackingDescriptor,
    pub payload: PackedPayload,
    /// Byte order the packed words were stored in.
    pub byte_order: ByteOrder,
}

fn invalid(reason: impl Into<String>) -> RecordOutcome<RawGridRecord> {
    RecordOutcome::NoData(NoDataReason::InvalidPacking(reason.into()))
}

fn usize_from(value: i32, what: &str) -> std::result::Result<usize, String> {
    usize::try_from(value).map_err(|_| format!("negative {}: {}", what, value))
}

/// Read the packing words and payload of a grid record.
///
/// `isword` is the word holding the packing type and `nword` the number of
/// words from there to the end of the record.
pub fn read_packed<R: Read + Seek>(
    reader: &mut WordReader<R>,
    isword: i64,
    nword: i32,
    decimal_scale: i32,
) -> Result<RecordOutcome<RawGridRecord>> {
    let ipktyp = reader.read_int(isword)?;
    let Some(packing) = PackingType::from_code(ipktyp) else {
        return Ok(invalid(format!("unknown packing type {}", ipktyp)));
    };
    let byte_order = reader.byte_order();
    let word = isword + 1;

    if packing == PackingType::None {
        let count = (nword - 1).max(0) as usize;
        let values = reader.read_float_vec(word, count)?;
        return Ok(RecordOutcome::Decoded(RawGridRecord {
            descriptor: PackingDescriptor::None { count },
            payload: PackedPayload::Floats(values),
            byte_order,
        }));
    }

    let (nints, nfloats) = match packing {
        PackingType::Difference => (4, 3),
        PackingType::Grib2 => (4, 1),
        _ => (3, 2),
    };
    let ints = reader.read_int_vec(word, nints)?;
    let floats = reader.read_float_vec(word + nints as i64, nfloats)?;
    let data_word = word + (nints + nfloats) as i64;
    let data_words = nword - 1 - (nints + nfloats) as i32;
    if data_words < 0 {
        return Ok(invalid(format!(
            "record of {} words too short for {} packing",
            nword, packing
        )));
    }

    if packing == PackingType::Grib2 {
        let dims = usize_from(ints[1], "kx").and_then(|kx| Ok((kx, usize_from(ints[2], "ky")?)));
        let (kx, ky) = match dims {
            Ok(dims) => dims,
            Err(reason) => return Ok(invalid(reason)),
        };
        let bytes = reader.read_bytes(data_word, data_words as usize * 4)?;
        return Ok(RecordOutcome::Decoded(RawGridRecord {
            descriptor: PackingDescriptor::Grib2 {
                kx,
                ky,
                scan_mode: ints[3] as u8,
            },
            payload: PackedPayload::Bytes(Bytes::from(bytes)),
            byte_order,
        }));
    }

    let kxky = match usize_from(ints[2], "kxky") {
        Ok(kxky) => kxky,
        Err(reason) => return Ok(invalid(reason)),
    };
    if kxky > MAX_GRID_POINTS {
        return Ok(invalid(format!(
            "{} points exceeds the limit of {}",
            kxky, MAX_GRID_POINTS
        )));
    }
    let simple = SimplePackingParams {
        nbits: ints[0],
        missing_flag: ints[1] != 0,
        kxky,
        reference: floats[0],
        scale: floats[1],
        decimal_scale,
    };

    let mut count = data_words as usize;
    let word_packed = matches!(packing, PackingType::Grib | PackingType::Decimal);
    if word_packed && count * 32 < simple.bits_needed() {
        // Some writers drop the final partial word from the length.
        debug!(words = count, "Reading one word past the record length");
        count += 1;
    }
    let words = reader.read_raw_words(data_word, count)?;

    let descriptor = match packing {
        PackingType::Nmc => PackingDescriptor::Nmc(simple),
        PackingType::Decimal => PackingDescriptor::Decimal(simple),
        PackingType::Difference => {
            let kx = match usize_from(ints[3], "kx") {
                Ok(kx) => kx,
                Err(reason) => return Ok(invalid(reason)),
            };
            PackingDescriptor::Difference(DifferencePackingParams {
                simple,
                kx,
                difmin: floats[2],
            })
        }
        _ => PackingDescriptor::Grib(simple),
    };

    Ok(RecordOutcome::Decoded(RawGridRecord {
        descriptor,
        payload: PackedPayload::Words(words),
        byte_order,
    }))
}

impl RawGridRecord {
    pub fn packing_type(&self) -> PackingType {
        self.descriptor.packing_type()
    }

    /// Unpack the record into calibrated values in canonical order.
    ///
    /// NMC and difference packed records yield no data; use
    /// [`RawGridRecord::decode_difference`] for the latter.
    pub fn decode(&self, config: &DecoderConfig) -> RecordOutcome<Vec<f32>> {
        let missing = config.float_missing;
        let result = match (&self.descriptor, &self.payload) {
            (PackingDescriptor::None { .. }, PackedPayload::Floats(values)) => Ok(values.clone()),
            (PackingDescriptor::Grib(params), PackedPayload::Words(words)) => {
                if config.use_word_unpacker {
                    unpack_grib_words(words, params, missing)
                } else {
                    let bytes: Vec<u8> = words
                        .iter()
                        .flat_map(|w| self.byte_order.encode(*w))
                        .collect();
                    let swap = self.byte_order == ByteOrder::LittleEndian;
                    unpack_grib_stream(&bytes, swap, params, missing)
                }
            }
            (PackingDescriptor::Decimal(params), PackedPayload::Words(words)) => {
                unpack_grib_words(words, params, missing)
            }
            (PackingDescriptor::Nmc(_), _) => {
                return RecordOutcome::NoData(NoDataReason::UnsupportedPacking(PackingType::Nmc))
            }
            (PackingDescriptor::Difference(_), _) => {
                return RecordOutcome::NoData(NoDataReason::UnsupportedPacking(
                    PackingType::Difference,
                ))
            }
            (PackingDescriptor::Grib2 { kx, ky, scan_mode }, PackedPayload::Bytes(bytes)) => {
                decode_grib2(bytes.clone(), *kx, *ky, *scan_mode, config)
            }
            (descriptor, _) => Err(GempakError::MissingStructure(format!(
                "payload does not match {} packing",
                descriptor.packing_type()
            ))),
        };

        match result {
            Ok(values) => RecordOutcome::Decoded(values),
            Err(e) => RecordOutcome::NoData(NoDataReason::InvalidPacking(e.to_string())),
        }
    }

    /// Reconstruct a difference packed record.
    pub fn decode_difference(&self, config: &DecoderConfig) -> RecordOutcome<Vec<f32>> {
        match (&self.descriptor, &self.payload) {
            (PackingDescriptor::Difference(params), PackedPayload::Words(words)) => {
                match unpack_difference(words, params, config.float_missing) {
                    Ok(values) => RecordOutcome::Decoded(values),
                    Err(e) => RecordOutcome::NoData(NoDataReason::InvalidPacking(e.to_string())),
                }
            }
            (descriptor, _) => RecordOutcome::NoData(NoDataReason::InvalidPacking(format!(
                "{} record is not difference packed",
                descriptor.packing_type()
            ))),
        }
    }
}

/// Unpack GRIB-style fields numbered from the most significant bit of each
/// word.
///
/// A field of all ones is missing when the missing flag is set; any other
/// field `x` becomes `(reference + x * scale) * 10^-decimal_scale`.
pub fn unpack_grib_words(
    words: &[u32],
    params: &SimplePackingParams,
    missing: f32,
) -> Result<Vec<f32>> {
    if params.is_degenerate() {
        return Ok(vec![0.0; params.kxky]);
    }
    let nbits = params.nbits;
    let imax = missing_pattern(nbits as u32);
    let sf = params.decimal_factor();

    let word_at = |i: usize| {
        words.get(i).copied().ok_or(GempakError::OutOfBounds {
            start: i,
            count: 1,
            len: words.len(),
        })
    };

    let mut values = Vec::with_capacity(params.kxky);
    let mut iword = 0usize;
    let mut ibit = 1i32;
    for _ in 0..params.kxky {
        // Bit position of the field's low end relative to bit 1 of the word
        let jshft = nbits + ibit - 33;
        let word = word_at(iword)?;
        let mut idat = if jshft < 0 {
            word >> (-jshft)
        } else {
            word << jshft
        };
        idat &= imax;
        if jshft > 0 {
            idat |= word_at(iword + 1)? >> (32 - jshft);
        }

        if params.missing_flag && idat == imax {
            values.push(missing);
        } else {
            values.push((params.reference + idat as f32 * params.scale) * sf);
        }

        ibit += nbits;
        if ibit > 32 {
            ibit -= 32;
            iword += 1;
        }
    }
    Ok(values)
}

/// Unpack GRIB-style fields through the streaming cursor.
///
/// `bytes` are the record bytes as stored; `swap` is set when they were
/// written little-endian.
pub fn unpack_grib_stream(
    bytes: &[u8],
    swap: bool,
    params: &SimplePackingParams,
    missing: f32,
) -> Result<Vec<f32>> {
    if params.is_degenerate() {
        return Ok(vec![0.0; params.kxky]);
    }
    let nbits = params.nbits as u32;
    let imax = missing_pattern(nbits);
    let sf = params.decimal_factor();

    let mut cursor = BitCursor::new(bytes, swap);
    let mut values = Vec::with_capacity(params.kxky);
    for _ in 0..params.kxky {
        let idat = cursor.read_bits(nbits)?;
        if params.missing_flag && idat == imax {
            values.push(missing);
        } else {
            values.push((params.reference + idat as f32 * params.scale) * sf);
        }
    }
    Ok(values)
}

/// Rebuild a difference packed grid.
///
/// The first point is the reference value. Every later point adds
/// `difmin + field * scale` to its neighbour: the point one row down at the
/// start of a row, otherwise the point to its left. A missing field, or a
/// missing neighbour, makes the point missing.
pub fn unpack_difference(
    words: &[u32],
    params: &DifferencePackingParams,
    missing: f32,
) -> Result<Vec<f32>> {
    let simple = &params.simple;
    let (kxky, kx) = (simple.kxky, params.kx);
    if kx == 0 || kxky % kx != 0 {
        return Err(GridProcessorError::invalid_shape(format!(
            "row length {} does not divide {} points",
            kx, kxky
        ))
        .into());
    }
    if simple.nbits < 1 || simple.nbits > 31 {
        return Err(GridProcessorError::invalid_shape(format!(
            "difference width of {} bits",
            simple.nbits
        ))
        .into());
    }
    if kxky == 0 {
        return Ok(Vec::new());
    }

    let nbits = simple.nbits as u32;
    let imax = missing_pattern(nbits);
    let mut grid = vec![0f32; kxky];
    let mut is_missing = vec![false; kxky];
    grid[0] = simple.reference;

    for i in 1..kxky {
        let field = extract_msb_field(words, (i - 1) * nbits as usize, nbits)?;
        if simple.missing_flag && field == imax {
            is_missing[i] = true;
            continue;
        }
        let base = if i % kx == 0 { i - kx } else { i - 1 };
        if is_missing[base] {
            is_missing[i] = true;
            continue;
        }
        grid[i] = grid[base] + params.difmin + field as f32 * simple.scale;
    }

    let sf = simple.decimal_factor();
    Ok(grid
        .into_iter()
        .zip(is_missing)
        .map(|(v, m)| if m { missing } else { v * sf })
        .collect())
}

/// Decode an embedded GRIB2 message and bring it to canonical orientation.
pub fn decode_grib2(
    bytes: Bytes,
    kx: usize,
    ky: usize,
    scan_mode: u8,
    config: &DecoderConfig,
) -> Result<Vec<f32>> {
    let message = Grib2Message::parse(bytes)?;
    let grid = message
        .first_field()
        .unpack_rectified(config.float_missing, config.quasi_interpolation)?;
    let values = grid.into_data();
    if (scan_mode >> 6) & 1 == 0 {
        debug!(scan_mode = scan_mode, "Normalizing GRIB2 grid orientation");
        return Ok(normalize_flag(&values, kx, ky, scan_mode)?);
    }
    Ok(values)
}

/// One parameter of a real-packed part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedParam {
    pub bits: u32,
    pub offset: i32,
    pub scale: i32,
    /// 0-based bit offset within a packed record.
    pub start_bit: usize,
}

/// Bit layout of the records of a real-packed part.
///
/// Parameters are packed back to back from the least significant bit of
/// the first word; each packed record occupies `words_per_record` words.
#[derive(Debug, Clone, PartialEq)]
pub struct RealPackingLayout {
    params: Vec<PackedParam>,
    words_per_record: usize,
}

impl RealPackingLayout {
    /// Build the layout from `(scale, offset, bits)` per parameter.
    ///
    /// Returns `None` when there are no parameters or a width is outside
    /// 1..=32 bits.
    pub fn new(params: impl IntoIterator<Item = (i32, i32, i32)>) -> Option<Self> {
        let mut packed = Vec::new();
        let mut itotal = 0usize;
        for (scale, offset, bits) in params {
            if !(1..=32).contains(&bits) {
                return None;
            }
            packed.push(PackedParam {
                bits: bits as u32,
                offset,
                scale,
                start_bit: itotal,
            });
            itotal += bits as usize;
        }
        if packed.is_empty() {
            return None;
        }
        Some(Self {
            params: packed,
            words_per_record: (itotal - 1) / 32 + 1,
        })
    }

    pub fn params(&self) -> &[PackedParam] {
        &self.params
    }

    pub fn words_per_record(&self) -> usize {
        self.words_per_record
    }

    /// Unpack every packed record in `words`.
    ///
    /// Returns `None` when `words` is not a whole number of records.
    pub fn unpack(&self, words: &[u32], missing: f32) -> Option<Vec<f32>> {
        if words.len() % self.words_per_record != 0 {
            return None;
        }
        let mut values = Vec::with_capacity(words.len() / self.words_per_record * self.params.len());
        for record in words.chunks_exact(self.words_per_record) {
            for param in &self.params {
                let calibration = FieldCalibration {
                    offset: param.offset,
                    scale: 10f64.powi(param.scale) as f32,
                    missing,
                };
                values.push(unpack_field(record, param.start_bit, param.bits, &calibration).ok()?);
            }
        }
        Some(values)
    }
}
