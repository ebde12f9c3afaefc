//! GEMPAK grid files.
//!
//! A grid file is a DM file with one row and one column per grid. The
//! column header holds the grid identifier (times, levels, vertical
//! coordinate and parameter name); the `GRID` part holds the packed data.
//! The `NAVB` file header describes the projection shared by every grid.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use grid_processor::CalibratedGrid;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DecoderConfig;
use crate::constants::{data_type, file_type, ANLB, GRID_COLUMN_KEYS, GRID_PART, LLGDHD, NAVB};
use crate::error::{GempakError, NoDataReason, RecordOutcome, Result};
use crate::file::{GempakFile, RawRecord};
use crate::packing::PackingType;
use crate::reader::ByteOrder;

/// Forecast type of a grid time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForecastType {
    Analysis,
    Forecast,
    Guess,
    Initial,
}

impl ForecastType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Analysis),
            1 => Some(Self::Forecast),
            2 => Some(Self::Guess),
            3 => Some(Self::Initial),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::Analysis => 'A',
            Self::Forecast => 'F',
            Self::Guess => 'G',
            Self::Initial => 'I',
        }
    }
}

/// Forecast offset from the reference time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForecastTime {
    pub kind: ForecastType,
    pub hours: u32,
    pub minutes: u32,
}

/// A grid time: reference time plus optional forecast offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridTime {
    pub reference: NaiveDateTime,
    pub forecast: Option<ForecastTime>,
}

fn full_year(yy: i32) -> i32 {
    if yy < 50 {
        2000 + yy
    } else {
        1900 + yy
    }
}

impl GridTime {
    /// Decode the two integer words of a grid time.
    ///
    /// The first word is either `YYMMDD` (with `HHMM` in the second word)
    /// or `MMDDYYHHMM` (with `ftype * 100000 + HHHMM` in the second word).
    /// A zero first word means no time.
    pub fn decode(word1: i32, word2: i32) -> Option<Self> {
        if word1 <= 0 {
            return None;
        }
        let (year, month, day, hhmm, forecast) = if word1 < 100_000_000 {
            let (yy, mm, dd) = (word1 / 10000, (word1 / 100) % 100, word1 % 100);
            (full_year(yy), mm, dd, word2, None)
        } else {
            let mmddyy = word1 / 10000;
            let hhmm = word1 % 10000;
            let (mm, dd, yy) = (mmddyy / 10000, (mmddyy / 100) % 100, mmddyy % 100);
            let hhhmm = word2 % 100000;
            let forecast = ForecastType::from_code(word2 / 100000).map(|kind| ForecastTime {
                kind,
                hours: (hhhmm / 100) as u32,
                minutes: (hhhmm % 100) as u32,
            });
            (full_year(yy), mm, dd, hhmm, forecast)
        };

        let reference = NaiveDate::from_ymd_opt(year, month as u32, day as u32)?
            .and_hms_opt((hhmm / 100) as u32, (hhmm % 100) as u32, 0)?;
        Some(Self {
            reference,
            forecast,
        })
    }
}

impl std::fmt::Display for GridTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reference.format("%y%m%d/%H%M"))?;
        if let Some(fc) = &self.forecast {
            write!(f, "{}{:03}", fc.kind.letter(), fc.hours)?;
            if fc.minutes != 0 {
                write!(f, "{:02}", fc.minutes)?;
            }
        }
        Ok(())
    }
}

/// Vertical coordinate of a grid level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VerticalCoordinate {
    None,
    Pressure,
    Theta,
    Height,
    Sigma,
    Depth,
    Other(String),
}

fn int_chars(value: i32, order: ByteOrder) -> String {
    String::from_utf8_lossy(&order.encode(value as u32)).into_owned()
}

impl VerticalCoordinate {
    pub fn decode(code: i32, order: ByteOrder) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Pressure,
            2 => Self::Theta,
            3 => Self::Height,
            4 => Self::Sigma,
            5 => Self::Depth,
            other => Self::Other(int_chars(other, order).trim().to_string()),
        }
    }
}

impl std::fmt::Display for VerticalCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Pressure => write!(f, "PRES"),
            Self::Theta => write!(f, "THTA"),
            Self::Height => write!(f, "HGHT"),
            Self::Sigma => write!(f, "SGMA"),
            Self::Depth => write!(f, "DPTH"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Identifier of one grid, decoded from its column header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridHeader {
    /// 1-based column of the grid.
    pub grid_number: usize,
    pub time1: Option<GridTime>,
    pub time2: Option<GridTime>,
    pub level1: i32,
    pub level2: i32,
    pub vcoord: VerticalCoordinate,
    pub param: String,
    /// Packing type probed from the data record.
    pub packing_type: Option<PackingType>,
    pub decimal_scale: i32,
}

impl GridHeader {
    /// Decode the ten column key values of a grid.
    pub fn decode(grid_number: usize, keys: &[i32], order: ByteOrder) -> Result<Self> {
        if keys.len() < GRID_COLUMN_KEYS.len() {
            return Err(GempakError::MissingStructure(format!(
                "grid {} has {} column keys",
                grid_number,
                keys.len()
            )));
        }
        let param: String = keys[7..10].iter().map(|k| int_chars(*k, order)).collect();
        Ok(Self {
            grid_number,
            time1: GridTime::decode(keys[0], keys[1]),
            time2: GridTime::decode(keys[2], keys[3]),
            level1: keys[4],
            level2: keys[5],
            vcoord: VerticalCoordinate::decode(keys[6], order),
            param: param.trim().to_string(),
            packing_type: None,
            decimal_scale: 0,
        })
    }
}

impl std::fmt::Display for GridHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let time = |t: &Option<GridTime>| t.map(|t| t.to_string()).unwrap_or_default();
        write!(
            f,
            "{:>5} {:<15} {:<15} {:>5} {:>5} {:<4} {}",
            self.grid_number,
            time(&self.time1),
            time(&self.time2),
            self.level1,
            self.level2,
            self.vcoord,
            self.param
        )
    }
}

/// Grid navigation from the `NAVB` file header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavBlock {
    pub grid_type: f32,
    pub projection: String,
    pub kx: usize,
    pub ky: usize,
    pub lower_left: (f32, f32),
    pub upper_right: (f32, f32),
    pub angles: [f32; 3],
}

impl NavBlock {
    pub fn decode(values: &[f32]) -> Result<Self> {
        if values.len() < 11 {
            return Err(GempakError::MissingStructure(format!(
                "navigation block has {} values",
                values.len()
            )));
        }
        let projection = String::from_utf8_lossy(&values[1].to_bits().to_be_bytes())
            .trim_matches(|c: char| c == ' ' || c == '\0')
            .to_string();
        Ok(Self {
            grid_type: values[0],
            projection,
            kx: values[2].max(0.0) as usize,
            ky: values[3].max(0.0) as usize,
            lower_left: (values[4], values[5]),
            upper_right: (values[6], values[7]),
            angles: [values[8], values[9], values[10]],
        })
    }
}

/// A grid record read from the file, ready to decode without it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGrid {
    pub header: GridHeader,
    pub record: RawRecord,
    /// Dimensions from the navigation block.
    pub nav_dims: (usize, usize),
}

impl RawGrid {
    /// Decode into a grid in canonical orientation.
    ///
    /// Dimensions come from the record header when it matches the number
    /// of decoded points, otherwise from the navigation block.
    pub fn decode(self, config: &DecoderConfig) -> RecordOutcome<CalibratedGrid> {
        let nav_dims = self.nav_dims;
        self.record.decode(config).and_then(|record| {
            let len = record.data.len();
            let header_dims = match record.header.as_slice() {
                [kx, ky, ..] if *kx > 0 && *ky > 0 => Some((*kx as usize, *ky as usize)),
                _ => None,
            };
            let dims = header_dims
                .filter(|(kx, ky)| kx * ky == len)
                .or(Some(nav_dims).filter(|(kx, ky)| kx * ky == len));
            let Some((nx, ny)) = dims else {
                return RecordOutcome::NoData(NoDataReason::InvalidPacking(format!(
                    "{} values do not fit the grid dimensions",
                    len
                )));
            };
            match CalibratedGrid::new(record.data, nx, ny) {
                Ok(grid) => RecordOutcome::Decoded(grid),
                Err(e) => RecordOutcome::NoData(NoDataReason::InvalidPacking(e.to_string())),
            }
        })
    }
}

/// Reader for GEMPAK grid files.
#[derive(Debug)]
pub struct GempakGridReader<R> {
    file: GempakFile<R>,
    nav: NavBlock,
    analysis: Option<Vec<f32>>,
    grids: Vec<GridHeader>,
}

impl GempakGridReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>, config: DecoderConfig) -> Result<Self> {
        Self::from_file(GempakFile::open(path, config)?)
    }
}

impl<R: Read + Seek> GempakGridReader<R> {
    pub fn from_reader(inner: R, config: DecoderConfig, location: impl Into<String>) -> Result<Self> {
        Self::from_file(GempakFile::from_reader(inner, config, location)?)
    }

    /// Check that an open DM file is a grid file and index its grids.
    pub fn from_file(mut file: GempakFile<R>) -> Result<Self> {
        let kftype = file.label().kftype;
        if kftype != file_type::GRID {
            return Err(GempakError::WrongFileType {
                expected: file_type::GRID,
                found: kftype,
            });
        }

        let part = file
            .part(GRID_PART)
            .ok_or_else(|| GempakError::MissingStructure("no GRID part".to_string()))?;
        if part.part_type != data_type::GRID {
            return Err(GempakError::MissingStructure(format!(
                "GRID part has type {}",
                data_type::name(part.part_type)
            )));
        }
        if part.header_len > LLGDHD {
            return Err(GempakError::MissingStructure(format!(
                "grid header length {} exceeds {}",
                part.header_len, LLGDHD
            )));
        }

        let keys = &file.keys().column;
        if keys.len() != GRID_COLUMN_KEYS.len()
            || keys.iter().zip(GRID_COLUMN_KEYS).any(|(k, expected)| k != expected)
        {
            return Err(GempakError::MissingStructure(format!(
                "column keys {:?} are not grid keys",
                keys
            )));
        }

        let nav_values = file
            .read_file_header(NAVB)?
            .ok_or_else(|| GempakError::MissingStructure("no NAVB file header".to_string()))?;
        let nav = NavBlock::decode(&nav_values)?;
        let analysis = file.read_file_header(ANLB)?;

        let order = file.byte_order();
        let columns: Vec<(usize, Vec<i32>)> = file
            .column_headers()
            .iter()
            .enumerate()
            .filter_map(|(i, keys)| keys.clone().map(|keys| (i + 1, keys)))
            .collect();

        let mut grids = Vec::with_capacity(columns.len());
        for (grid_number, keys) in columns {
            let mut header = GridHeader::decode(grid_number, &keys, order)?;
            let packing = probe_packing_type(&mut file, grid_number)?;
            header.packing_type = packing;
            match packing {
                Some(packing) if packing.is_indexed() => grids.push(header),
                packing => debug!(
                    grid = grid_number,
                    param = %header.param,
                    packing = ?packing,
                    "Skipping grid"
                ),
            }
        }
        if grids.is_empty() {
            return Err(GempakError::MissingStructure(format!(
                "{} has no decodable grids",
                file.location()
            )));
        }

        info!(
            location = %file.location(),
            grids = grids.len(),
            projection = %nav.projection,
            kx = nav.kx,
            ky = nav.ky,
            "Opened GEMPAK grid file"
        );
        Ok(Self {
            file,
            nav,
            analysis,
            grids,
        })
    }

    /// Indexed grids in column order.
    pub fn grids(&self) -> &[GridHeader] {
        &self.grids
    }

    pub fn grid_count(&self) -> usize {
        self.grids.len()
    }

    pub fn grid(&self, grid_number: usize) -> Option<&GridHeader> {
        self.grids.iter().find(|g| g.grid_number == grid_number)
    }

    /// First grid whose parameter name is `param`.
    pub fn find_grid(&self, param: &str) -> Option<&GridHeader> {
        let param = param.trim();
        self.grids.iter().find(|g| g.param == param)
    }

    pub fn nav_block(&self) -> &NavBlock {
        &self.nav
    }

    pub fn analysis_block(&self) -> Option<&[f32]> {
        self.analysis.as_deref()
    }

    pub fn file(&self) -> &GempakFile<R> {
        &self.file
    }

    pub fn config(&self) -> &DecoderConfig {
        self.file.config()
    }

    /// Packing type of a grid's record, read from the file.
    pub fn packing_type(&mut self, grid_number: usize) -> Result<Option<PackingType>> {
        probe_packing_type(&mut self.file, grid_number)
    }

    /// Read a grid's record without decoding it.
    pub fn read_raw_grid(&mut self, grid_number: usize) -> Result<RecordOutcome<RawGrid>> {
        let Some(header) = self.grid(grid_number).cloned() else {
            return Ok(RecordOutcome::NoData(NoDataReason::InvalidLocation {
                row: 1,
                col: grid_number,
                part: GRID_PART.to_string(),
            }));
        };
        let nav_dims = (self.nav.kx, self.nav.ky);
        let outcome = self
            .file
            .read_raw_record(1, grid_number, GRID_PART, header.decimal_scale)?;
        Ok(outcome.map(|record| RawGrid {
            header,
            record,
            nav_dims,
        }))
    }

    /// Read and decode a grid.
    pub fn decode_grid(&mut self, grid_number: usize) -> Result<RecordOutcome<CalibratedGrid>> {
        let config = self.file.config().clone();
        match self.read_raw_grid(grid_number)? {
            RecordOutcome::Decoded(raw) => {
                let decoded = raw.decode(&config);
                if let Some(reason) = decoded.no_data_reason() {
                    self.file.log_no_data(1, grid_number, reason);
                }
                Ok(decoded)
            }
            RecordOutcome::NoData(reason) => Ok(RecordOutcome::NoData(reason)),
        }
    }

    /// Read a grid's values, or `None` when the grid has no data.
    pub fn read_grid(&mut self, header: &GridHeader) -> Result<Option<Vec<f32>>> {
        Ok(self
            .decode_grid(header.grid_number)?
            .into_option()
            .map(CalibratedGrid::into_data))
    }
}

/// Read just the packing-type word of a grid record.
fn probe_packing_type<R: Read + Seek>(
    file: &mut GempakFile<R>,
    grid_number: usize,
) -> Result<Option<PackingType>> {
    let Some(pointer) = file.data_pointer(1, grid_number, GRID_PART) else {
        return Ok(None);
    };
    let Some(header_len) = file.part(GRID_PART).map(|p| p.header_len) else {
        return Ok(None);
    };
    let max_words = file.config().max_record_words;

    match read_packing_word(file, pointer, header_len, max_words) {
        Ok(code) => Ok(code.and_then(PackingType::from_code)),
        Err(e) if e.is_end_of_file() => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_packing_word<R: Read + Seek>(
    file: &mut GempakFile<R>,
    pointer: i64,
    header_len: i32,
    max_words: i32,
) -> Result<Option<i32>> {
    let reader = file.reader_mut();
    let istart = reader.read_int(pointer)?;
    if istart <= 0 {
        return Ok(None);
    }
    let length = reader.read_int(istart as i64)?;
    if length <= header_len || length.unsigned_abs() > max_words.unsigned_abs() {
        return Ok(None);
    }
    Ok(Some(reader.read_int(istart as i64 + 1 + header_len as i64)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_yymmdd() {
        let time = GridTime::decode(240315, 1200).unwrap();
        assert_eq!(
            time.reference,
            NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        );
        assert!(time.forecast.is_none());
        assert_eq!(time.to_string(), "240315/1200");
    }

    #[test]
    fn test_time_with_forecast() {
        // 03/15/24 12:00, forecast hour 6
        let time = GridTime::decode(315_241_200, 100_600).unwrap();
        assert_eq!(time.reference.format("%Y-%m-%d %H:%M").to_string(), "2024-03-15 12:00");
        let fc = time.forecast.unwrap();
        assert_eq!(fc.kind, ForecastType::Forecast);
        assert_eq!((fc.hours, fc.minutes), (6, 0));
        assert_eq!(time.to_string(), "240315/1200F006");

        let time = GridTime::decode(1_019_991_800, 1_230).unwrap();
        assert_eq!(time.reference.format("%Y").to_string(), "1999");
        assert_eq!(time.to_string(), "991019/1800A01230");
    }

    #[test]
    fn test_time_missing() {
        assert!(GridTime::decode(0, 0).is_none());
        assert!(GridTime::decode(-9999, 0).is_none());
        assert!(GridTime::decode(241399, 0).is_none());
    }

    #[test]
    fn test_vertical_coordinate() {
        assert_eq!(VerticalCoordinate::decode(1, ByteOrder::BigEndian), VerticalCoordinate::Pressure);
        let code = i32::from_be_bytes(*b"MSL ");
        assert_eq!(
            VerticalCoordinate::decode(code, ByteOrder::BigEndian),
            VerticalCoordinate::Other("MSL".to_string())
        );
        let code = i32::from_le_bytes(*b"MSL ");
        assert_eq!(
            VerticalCoordinate::decode(code, ByteOrder::LittleEndian).to_string(),
            "MSL"
        );
    }

    #[test]
    fn test_header_param_name() {
        let mut keys = vec![240315, 1200, 0, 0, 500, -1, 1];
        keys.extend([b"TMPK", b"    ", b"    "].iter().map(|b| i32::from_be_bytes(**b)));
        let header = GridHeader::decode(3, &keys, ByteOrder::BigEndian).unwrap();
        assert_eq!(header.param, "TMPK");
        assert_eq!(header.vcoord, VerticalCoordinate::Pressure);
        assert!(header.time2.is_none());
        assert!(GridHeader::decode(3, &keys[..6], ByteOrder::BigEndian).is_err());
    }

    #[test]
    fn test_nav_block() {
        let projection = f32::from_bits(u32::from_be_bytes(*b"CED "));
        let values = [2.0, projection, 4.0, 3.0, 20.0, -130.0, 55.0, -60.0, 0.0, 0.0, 0.0];
        let nav = NavBlock::decode(&values).unwrap();
        assert_eq!(nav.projection, "CED");
        assert_eq!((nav.kx, nav.ky), (4, 3));
        assert_eq!(nav.upper_right, (55.0, -60.0));
        assert!(NavBlock::decode(&values[..5]).is_err());
    }
}
