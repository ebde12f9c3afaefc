//! GEMPAK data management (DM) file structure.
//!
//! A DM file is a table of rows and columns. Each row and column has a
//! header of key values; each (row, column, part) cell holds a pointer to a
//! record. The label at word 1 locates everything else.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::DecoderConfig;
use crate::constants::{data_type, machine, DM_LABEL, NAVB};
use crate::error::{end_of_file_as_no_data, GempakError, NoDataReason, RecordOutcome, Result};
use crate::packing::{read_packed, RawGridRecord, RealPackingLayout};
use crate::reader::{ByteOrder, MissingValues, WordReader};

/// Words of the label after the 28-character identifier.
const LABEL_INT_WORD: i64 = 8;
const LABEL_INT_COUNT: usize = 20;
const SMISSD_WORD: i64 = 31;

/// The DM label.
#[derive(Debug, Clone, PartialEq)]
pub struct DmLabel {
    pub kversn: i32,
    pub kfhdrs: i32,
    pub kpfile: i32,
    pub krow: i32,
    pub krkeys: i32,
    pub kprkey: i32,
    pub kprowh: i32,
    pub kcol: i32,
    pub kckeys: i32,
    pub kpckey: i32,
    pub kpcolh: i32,
    pub kprt: i32,
    pub kppart: i32,
    pub kpdmgt: i32,
    pub kldmgt: i32,
    pub kpdata: i32,
    pub kftype: i32,
    pub kfsrce: i32,
    pub kmachn: i32,
    pub kmissd: i32,
    pub smissd: f32,
}

impl DmLabel {
    fn from_words(words: &[i32], smissd: f32) -> Self {
        Self {
            kversn: words[0],
            kfhdrs: words[1],
            kpfile: words[2],
            krow: words[3],
            krkeys: words[4],
            kprkey: words[5],
            kprowh: words[6],
            kcol: words[7],
            kckeys: words[8],
            kpckey: words[9],
            kpcolh: words[10],
            kprt: words[11],
            kppart: words[12],
            kpdmgt: words[13],
            kldmgt: words[14],
            kpdata: words[15],
            kftype: words[16],
            kfsrce: words[17],
            kmachn: words[18],
            kmissd: words[19],
            smissd,
        }
    }

    /// Name of the machine that wrote the file.
    pub fn machine_name(&self) -> &'static str {
        machine::name(self.kmachn)
    }
}

/// Row and column key names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DmKeys {
    pub row: Vec<String>,
    pub column: Vec<String>,
}

/// Name, length and type of one file header.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeaderInfo {
    pub name: String,
    pub length: i32,
    pub kind: i32,
}

/// One parameter of a part.
#[derive(Debug, Clone, PartialEq)]
pub struct DmParam {
    pub name: String,
    pub scale: i32,
    pub offset: i32,
    pub bits: i32,
}

/// A part: one kind of record stored in every cell.
#[derive(Debug, Clone, PartialEq)]
pub struct DmPart {
    pub name: String,
    pub header_len: i32,
    pub part_type: i32,
    pub params: Vec<DmParam>,
    /// Bit layout of real-packed records, when the parameters define one.
    pub packing: Option<RealPackingLayout>,
}

/// Header ints and decoded values of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordData {
    pub header: Vec<i32>,
    pub data: Vec<f32>,
}

/// Record payload before decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    Real(Vec<f32>),
    Grid(RawGridRecord),
    Packed {
        words: Vec<u32>,
        layout: RealPackingLayout,
    },
}

/// A record read from the file but not yet decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub header: Vec<i32>,
    pub body: RecordBody,
}

impl RawRecord {
    pub fn decode(self, config: &DecoderConfig) -> RecordOutcome<RecordData> {
        let header = self.header;
        match self.body {
            RecordBody::Real(data) => RecordOutcome::Decoded(RecordData { header, data }),
            RecordBody::Grid(grid) => grid
                .decode(config)
                .map(|data| RecordData { header, data }),
            RecordBody::Packed { words, layout } => {
                match layout.unpack(&words, config.float_missing) {
                    Some(data) => RecordOutcome::Decoded(RecordData { header, data }),
                    None => RecordOutcome::NoData(NoDataReason::InvalidPacking(format!(
                        "{} words is not a multiple of the {}-word packed record",
                        words.len(),
                        layout.words_per_record()
                    ))),
                }
            }
        }
    }
}

/// An open DM file.
#[derive(Debug)]
pub struct GempakFile<R> {
    reader: WordReader<R>,
    config: DecoderConfig,
    location: String,
    label: DmLabel,
    keys: DmKeys,
    file_headers: Vec<FileHeaderInfo>,
    parts: Vec<DmPart>,
    row_headers: Vec<Option<Vec<i32>>>,
    column_headers: Vec<Option<Vec<i32>>>,
}

impl GempakFile<BufReader<File>> {
    /// Open a DM file on disk.
    pub fn open(path: impl AsRef<Path>, config: DecoderConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), config, path.display().to_string())
    }
}

fn count(value: i32, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| GempakError::MissingStructure(format!("negative {} count: {}", what, value)))
}

impl<R: Read + Seek> GempakFile<R> {
    /// Check that `n` entries of `words_each` words starting at `pointer`
    /// lie inside the file. Counts come from the label, so this runs before
    /// anything is allocated from them.
    fn check_block(&mut self, pointer: i64, n: usize, words_each: usize) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        let len = self.reader.len_words()?;
        let needed = n.checked_mul(words_each);
        let fits = match (u64::try_from(pointer), needed) {
            (Ok(start), Some(needed)) => {
                start >= 1 && (start - 1).saturating_add(needed as u64) <= len
            }
            _ => false,
        };
        if !fits {
            return Err(GempakError::OutOfBounds {
                start: pointer.max(0) as usize,
                count: needed.unwrap_or(usize::MAX),
                len: len as usize,
            });
        }
        Ok(())
    }

    /// Read the structure of a DM file from any seekable source.
    ///
    /// `location` names the source in log messages.
    pub fn from_reader(inner: R, config: DecoderConfig, location: impl Into<String>) -> Result<Self> {
        config.validate()?;
        let location = location.into();
        let mut reader = WordReader::new(inner, MissingValues::universal(&config));

        if reader.len_words()? < SMISSD_WORD as u64 {
            return Err(GempakError::NotGempak(format!(
                "{} is too short to hold a label",
                location
            )));
        }
        let identifier = reader.read_string(1, DM_LABEL.len())?;
        if identifier != DM_LABEL {
            return Err(GempakError::NotGempak(format!(
                "{} has label {:?}",
                location,
                identifier.trim_end()
            )));
        }

        let kmachn = reader.detect_byte_order()?;
        let words = reader.read_int_vec(LABEL_INT_WORD, LABEL_INT_COUNT)?;
        let smissd = reader.read_float(SMISSD_WORD)?;
        let label = DmLabel::from_words(&words, smissd);
        debug!(
            location = %location,
            machine = machine::name(kmachn),
            swapped = reader.needs_swap(),
            file_type = label.kftype,
            "Read DM label"
        );
        let missing = reader.missing().with_file_codes(label.kmissd, label.smissd);
        reader.set_missing(missing);

        let mut file = Self {
            reader,
            config,
            location,
            label,
            keys: DmKeys::default(),
            file_headers: Vec::new(),
            parts: Vec::new(),
            row_headers: Vec::new(),
            column_headers: Vec::new(),
        };
        file.read_keys()?;
        file.read_parts()?;
        file.read_file_header_info()?;
        file.read_row_column_headers()?;

        info!(
            location = %file.location,
            rows = file.label.krow,
            columns = file.label.kcol,
            parts = file.parts.len(),
            "Opened GEMPAK file"
        );
        Ok(file)
    }

    fn read_keys(&mut self) -> Result<()> {
        let nrow = count(self.label.krkeys, "row key")?;
        let ncol = count(self.label.kckeys, "column key")?;
        if nrow == 0 || ncol == 0 {
            return Err(GempakError::MissingStructure(format!(
                "{} has no row or column keys",
                self.location
            )));
        }
        self.check_block(self.label.kprkey as i64, nrow, 1)?;
        self.check_block(self.label.kpckey as i64, ncol, 1)?;
        for i in 0..nrow {
            let key = self.reader.read_chars(self.label.kprkey as i64 + i as i64)?;
            self.keys.row.push(key.trim_end().to_string());
        }
        for i in 0..ncol {
            let key = self.reader.read_chars(self.label.kpckey as i64 + i as i64)?;
            self.keys.column.push(key.trim_end().to_string());
        }
        Ok(())
    }

    fn read_parts(&mut self) -> Result<()> {
        let nparts = count(self.label.kprt, "part")?;
        if nparts == 0 {
            return Err(GempakError::MissingStructure(format!(
                "{} has no parts",
                self.location
            )));
        }
        // Name, header length, type and parameter count per part
        self.check_block(self.label.kppart as i64, nparts, 4)?;
        let mut iread = self.label.kppart as i64;
        let mut names = Vec::with_capacity(nparts);
        for _ in 0..nparts {
            names.push(self.reader.read_chars(iread)?.trim_end().to_string());
            iread += 1;
        }
        let header_lens = self.reader.read_int_vec(iread, nparts)?;
        iread += nparts as i64;
        let part_types = self.reader.read_int_vec(iread, nparts)?;
        iread += nparts as i64;
        let param_counts = self.reader.read_int_vec(iread, nparts)?;
        iread += nparts as i64;

        let counts = param_counts
            .iter()
            .map(|&n| count(n, "parameter"))
            .collect::<Result<Vec<_>>>()?;
        let total = counts
            .iter()
            .try_fold(0usize, |acc, n| acc.checked_add(*n))
            .unwrap_or(usize::MAX);
        self.check_block(iread, total, 4)?;

        // Names, scales, offsets and bit widths each run part-major
        let mut param_names = Vec::with_capacity(total);
        for _ in 0..total {
            param_names.push(self.reader.read_chars(iread)?.trim_end().to_string());
            iread += 1;
        }
        let scales = self.reader.read_int_vec(iread, total)?;
        iread += total as i64;
        let offsets = self.reader.read_int_vec(iread, total)?;
        iread += total as i64;
        let bits = self.reader.read_int_vec(iread, total)?;

        let mut next = 0;
        for (i, name) in names.into_iter().enumerate() {
            let params: Vec<DmParam> = (next..next + counts[i])
                .map(|k| DmParam {
                    name: param_names[k].clone(),
                    scale: scales[k],
                    offset: offsets[k],
                    bits: bits[k],
                })
                .collect();
            next += counts[i];

            let packing = if part_types[i] == data_type::RPCK {
                RealPackingLayout::new(params.iter().map(|p| (p.scale, p.offset, p.bits)))
            } else {
                None
            };
            self.parts.push(DmPart {
                name,
                header_len: header_lens[i],
                part_type: part_types[i],
                params,
                packing,
            });
        }
        Ok(())
    }

    fn read_file_header_info(&mut self) -> Result<()> {
        let nheaders = count(self.label.kfhdrs, "file header")?;
        self.check_block(self.label.kpfile as i64, nheaders, 3)?;
        let mut iread = self.label.kpfile as i64;
        let mut names = Vec::with_capacity(nheaders);
        for _ in 0..nheaders {
            names.push(self.reader.read_chars(iread)?.trim_end().to_string());
            iread += 1;
        }
        let lengths = self.reader.read_int_vec(iread, nheaders)?;
        iread += nheaders as i64;
        let kinds = self.reader.read_int_vec(iread, nheaders)?;

        self.file_headers = names
            .into_iter()
            .zip(lengths)
            .zip(kinds)
            .map(|((name, length), kind)| FileHeaderInfo { name, length, kind })
            .collect();
        Ok(())
    }

    fn read_row_column_headers(&mut self) -> Result<()> {
        let krkeys = self.keys.row.len();
        let kckeys = self.keys.column.len();
        let krow = count(self.label.krow, "row")?;
        let kcol = count(self.label.kcol, "column")?;
        self.check_block(self.label.kprowh as i64, krow, krkeys + 1)?;
        self.check_block(self.label.kpcolh as i64, kcol, kckeys + 1)?;

        let mut rows = Vec::with_capacity(krow);
        for i in 0..krow {
            let base = self.label.kprowh as i64 + (i * (krkeys + 1)) as i64;
            rows.push(self.read_header_slot(base, krkeys)?);
        }
        let mut columns = Vec::with_capacity(kcol);
        for i in 0..kcol {
            let base = self.label.kpcolh as i64 + (i * (kckeys + 1)) as i64;
            columns.push(self.read_header_slot(base, kckeys)?);
        }
        self.row_headers = rows;
        self.column_headers = columns;
        Ok(())
    }

    fn read_header_slot(&mut self, base: i64, nkeys: usize) -> Result<Option<Vec<i32>>> {
        let flag = self.reader.read_int(base)?;
        if flag == self.config.int_missing {
            return Ok(None);
        }
        Ok(Some(self.reader.read_int_vec(base + 1, nkeys)?))
    }

    pub fn label(&self) -> &DmLabel {
        &self.label
    }

    pub fn keys(&self) -> &DmKeys {
        &self.keys
    }

    pub fn parts(&self) -> &[DmPart] {
        &self.parts
    }

    pub fn part(&self, name: &str) -> Option<&DmPart> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// 1-based number of the named part.
    pub fn part_number(&self, name: &str) -> Option<usize> {
        self.parts.iter().position(|p| p.name == name).map(|i| i + 1)
    }

    pub fn file_headers(&self) -> &[FileHeaderInfo] {
        &self.file_headers
    }

    pub fn find_file_header(&self, name: &str) -> Option<&FileHeaderInfo> {
        self.file_headers.iter().find(|h| h.name == name)
    }

    /// Read the values of a REAL file header.
    ///
    /// Returns `None` when the header does not exist, is not REAL, or holds
    /// no values.
    pub fn read_file_header(&mut self, name: &str) -> Result<Option<Vec<f32>>> {
        let Some(index) = self.file_headers.iter().position(|h| h.name == name) else {
            return Ok(None);
        };
        if self.file_headers[index].kind != data_type::REAL {
            return Ok(None);
        }
        let mut iread = self.label.kpfile as i64 + 3 * self.label.kfhdrs as i64;
        for header in &self.file_headers[..index] {
            iread += header.length as i64 + 1;
        }
        let nword = self.reader.read_int(iread)?;
        if nword <= 0 {
            warn!(location = %self.location, header = name, length = nword, "Invalid file header length");
            return Ok(None);
        }
        iread += 1;

        let nword = nword as usize;
        if name == NAVB && self.reader.needs_swap() && nword >= 2 {
            // The projection name is character data stored unswapped
            let mut values = Vec::with_capacity(nword);
            values.push(self.reader.read_float(iread)?);
            values.push(self.reader.read_float_unswapped(iread + 1)?);
            values.extend(self.reader.read_float_vec(iread + 2, nword - 2)?);
            return Ok(Some(values));
        }
        Ok(Some(self.reader.read_float_vec(iread, nword)?))
    }

    /// Key values of every row; `None` marks an unused row.
    pub fn row_headers(&self) -> &[Option<Vec<i32>>] {
        &self.row_headers
    }

    /// Key values of every column; `None` marks an unused column.
    pub fn column_headers(&self) -> &[Option<Vec<i32>>] {
        &self.column_headers
    }

    /// Word holding the pointer to the record at `(irow, icol)` in `part`.
    pub fn data_pointer(&self, irow: usize, icol: usize, part: &str) -> Option<i64> {
        let label = &self.label;
        if irow < 1 || irow > label.krow as usize || icol < 1 || icol > label.kcol as usize {
            return None;
        }
        let iprt = self.part_number(part)?;
        let part_type = self.parts[iprt - 1].part_type;
        if !matches!(part_type, data_type::REAL | data_type::GRID | data_type::RPCK) {
            return None;
        }
        Some(
            label.kpdata as i64
                + ((irow - 1) * label.kcol as usize * label.kprt as usize) as i64
                + ((icol - 1) * label.kprt as usize) as i64
                + (iprt - 1) as i64,
        )
    }

    /// Read a record without decoding its payload.
    pub fn read_raw_record(
        &mut self,
        irow: usize,
        icol: usize,
        part: &str,
        decimal_scale: i32,
    ) -> Result<RecordOutcome<RawRecord>> {
        let (Some(pointer), Some(dm_part)) = (self.data_pointer(irow, icol, part), self.part(part))
        else {
            let reason = NoDataReason::InvalidLocation {
                row: irow,
                col: icol,
                part: part.to_string(),
            };
            self.log_no_data(irow, icol, &reason);
            return Ok(RecordOutcome::NoData(reason));
        };
        let header_len = dm_part.header_len;
        let part_type = dm_part.part_type;
        let packing = dm_part.packing.clone();

        let outcome = end_of_file_as_no_data(self.read_record_at(
            pointer,
            header_len,
            part_type,
            packing,
            decimal_scale,
        ))?;
        if let Some(reason) = outcome.no_data_reason() {
            self.log_no_data(irow, icol, reason);
        }
        Ok(outcome)
    }

    fn read_record_at(
        &mut self,
        pointer: i64,
        header_len: i32,
        part_type: i32,
        packing: Option<RealPackingLayout>,
        decimal_scale: i32,
    ) -> Result<RecordOutcome<RawRecord>> {
        let istart = self.reader.read_int(pointer)?;
        if istart <= 0 {
            return Ok(RecordOutcome::NoData(NoDataReason::EmptyPointer));
        }
        let istart = istart as i64;
        let length = self.reader.read_int(istart)?;
        if length <= header_len {
            return Ok(RecordOutcome::NoData(NoDataReason::LengthNotAboveHeader {
                length,
                header_len,
            }));
        }
        if length.unsigned_abs() > self.config.max_record_words.unsigned_abs() {
            return Ok(RecordOutcome::NoData(NoDataReason::HugeLength(length)));
        }

        let header = self.reader.read_int_vec(istart + 1, header_len.max(0) as usize)?;
        let isword = istart + 1 + header_len as i64;
        let nword = length - header_len;

        let body = match part_type {
            data_type::REAL => RecordBody::Real(self.reader.read_float_vec(isword, nword as usize)?),
            data_type::GRID => match read_packed(&mut self.reader, isword, nword, decimal_scale)? {
                RecordOutcome::Decoded(grid) => RecordBody::Grid(grid),
                RecordOutcome::NoData(reason) => return Ok(RecordOutcome::NoData(reason)),
            },
            data_type::RPCK => {
                let Some(layout) = packing else {
                    return Ok(RecordOutcome::NoData(NoDataReason::InvalidPacking(
                        "part has no usable packing layout".to_string(),
                    )));
                };
                let words = self.reader.read_raw_words(isword, nword as usize)?;
                RecordBody::Packed { words, layout }
            }
            other => {
                return Ok(RecordOutcome::NoData(NoDataReason::InvalidPacking(format!(
                    "cannot read {} part",
                    data_type::name(other)
                ))))
            }
        };
        Ok(RecordOutcome::Decoded(RawRecord { header, body }))
    }

    /// Read and decode the record at `(irow, icol)` in `part`.
    pub fn read_record(
        &mut self,
        irow: usize,
        icol: usize,
        part: &str,
        decimal_scale: i32,
    ) -> Result<RecordOutcome<RecordData>> {
        match self.read_raw_record(irow, icol, part, decimal_scale)? {
            RecordOutcome::Decoded(record) => {
                let outcome = record.decode(&self.config);
                if let Some(reason) = outcome.no_data_reason() {
                    self.log_no_data(irow, icol, reason);
                }
                Ok(outcome)
            }
            RecordOutcome::NoData(reason) => Ok(RecordOutcome::NoData(reason)),
        }
    }

    pub(crate) fn log_no_data(&self, irow: usize, icol: usize, reason: &NoDataReason) {
        match reason {
            NoDataReason::EmptyPointer => {
                debug!(location = %self.location, row = irow, col = icol, "Record has no data");
            }
            _ => warn!(
                location = %self.location,
                row = irow,
                col = icol,
                reason = %reason,
                "No data for record"
            ),
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.reader.byte_order()
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Where the file was opened from.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub(crate) fn reader_mut(&mut self) -> &mut WordReader<R> {
        &mut self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use test_utils::gempak::{DmFileBuilder, FileEndian, ParamSpec, PartSpec, Word};

    fn surface_builder() -> DmFileBuilder {
        DmFileBuilder::new(1)
            .row_keys(&["DATE", "TIME"])
            .column_keys(&["STID"])
            .part(PartSpec::new(
                "SFDT",
                1,
                1,
                vec![ParamSpec::new("TMPC", 0, 0, 0), ParamSpec::new("DWPC", 0, 0, 0)],
            ))
            .row(vec![Word::Int(240315), Word::Int(1200)])
            .column(vec![Word::chars("KDEN")])
            .unused_column()
            .record(1, 1, "SFDT", vec![42], vec![Word::Float(12.5), Word::Float(-3.0)])
    }

    fn open(builder: &DmFileBuilder) -> GempakFile<Cursor<Vec<u8>>> {
        GempakFile::from_reader(Cursor::new(builder.build()), DecoderConfig::default(), "memory")
            .unwrap()
    }

    #[test]
    fn test_structure() {
        let file = open(&surface_builder());
        assert_eq!(file.label().kftype, 1);
        assert_eq!(file.keys().row, vec!["DATE", "TIME"]);
        assert_eq!(file.keys().column, vec!["STID"]);
        assert_eq!(file.parts().len(), 1);
        assert_eq!(file.parts()[0].params[1].name, "DWPC");
        assert_eq!(file.part_number("SFDT"), Some(1));
        assert_eq!(file.part_number("SNDT"), None);
        assert_eq!(file.row_headers()[0], Some(vec![240315, 1200]));
        assert!(file.column_headers()[1].is_none());
    }

    #[test]
    fn test_real_record() {
        for order in [FileEndian::Big, FileEndian::Little] {
            let mut file = open(&surface_builder().byte_order(order));
            let record = file.read_record(1, 1, "SFDT", 0).unwrap().into_option().unwrap();
            assert_eq!(record.header, vec![42]);
            assert_eq!(record.data, vec![12.5, -3.0]);
        }
    }

    #[test]
    fn test_invalid_location() {
        let mut file = open(&surface_builder());
        assert_eq!(file.data_pointer(0, 1, "SFDT"), None);
        assert_eq!(file.data_pointer(2, 1, "SFDT"), None);
        assert_eq!(file.data_pointer(1, 3, "SFDT"), None);
        let outcome = file.read_record(1, 1, "NOPE", 0).unwrap();
        assert!(matches!(
            outcome.no_data_reason(),
            Some(NoDataReason::InvalidLocation { .. })
        ));
    }

    #[test]
    fn test_empty_pointer() {
        let mut file = open(&surface_builder());
        let outcome = file.read_record(1, 2, "SFDT", 0).unwrap();
        assert_eq!(outcome, RecordOutcome::NoData(NoDataReason::EmptyPointer));
    }

    #[test]
    fn test_not_gempak() {
        let bytes = surface_builder().label("NOT A GEMPAK FILE AT ALL    ").build();
        let err = GempakFile::from_reader(Cursor::new(bytes), DecoderConfig::default(), "memory")
            .unwrap_err();
        assert!(matches!(err, GempakError::NotGempak(_)));

        let err = GempakFile::from_reader(Cursor::new(vec![0u8; 16]), DecoderConfig::default(), "memory")
            .unwrap_err();
        assert!(matches!(err, GempakError::NotGempak(_)));
    }
}
