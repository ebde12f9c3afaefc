//! Synthetic GEMPAK data management (DM) files.
//!
//! [`DmFileBuilder`] lays out a complete DM file: label, keys, file headers,
//! parts, row and column headers, data pointers and records, in either byte
//! order. [`GridFileBuilder`] sits on top of it and produces grid files with
//! a `NAVB` navigation block, the standard grid column keys and one record
//! per grid.

use std::collections::HashMap;
use std::io::Write;

use crate::bits::pack_msb_words;

/// The 28-character DM label.
pub const DM_LABEL: &str = "GEMPAK DATA MANAGEMENT FILE ";

/// Universal integer missing value.
pub const IMISSD: i32 = -9999;

/// Universal float missing value.
pub const RMISSD: f32 = -9999.0;

/// Column key names of a grid file.
pub const GRID_COLUMN_KEYS: [&str; 10] = [
    "GDT1", "GTM1", "GDT2", "GTM2", "GLV1", "GLV2", "GVCD", "GPM1", "GPM2", "GPM3",
];

/// Byte order of the machine that "wrote" the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEndian {
    Big,
    Little,
}

impl FileEndian {
    /// Machine type code stored in the label (SUN or LNUX).
    pub fn machine_type(self) -> i32 {
        match self {
            FileEndian::Big => 3,
            FileEndian::Little => 11,
        }
    }
}

/// One 32-bit word of file content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Word {
    Int(i32),
    Float(f32),
    /// Raw bytes written as-is in either byte order.
    Raw([u8; 4]),
}

impl Word {
    /// Four characters, space padded.
    pub fn chars(s: &str) -> Word {
        let mut bytes = [b' '; 4];
        for (slot, b) in bytes.iter_mut().zip(s.bytes()) {
            *slot = b;
        }
        Word::Raw(bytes)
    }

    pub fn encode(self, order: FileEndian) -> [u8; 4] {
        match (self, order) {
            (Word::Int(v), FileEndian::Big) => v.to_be_bytes(),
            (Word::Int(v), FileEndian::Little) => v.to_le_bytes(),
            (Word::Float(v), FileEndian::Big) => v.to_be_bytes(),
            (Word::Float(v), FileEndian::Little) => v.to_le_bytes(),
            (Word::Raw(b), _) => b,
        }
    }
}

/// Split a string into space-padded 4-character words.
pub fn char_words(s: &str, nwords: usize) -> Vec<Word> {
    let padded = format!("{:<width$}", s, width = nwords * 4);
    padded
        .as_bytes()
        .chunks(4)
        .take(nwords)
        .map(|c| Word::Raw([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Wrap bytes as raw words, zero padding the tail.
pub fn byte_words(bytes: &[u8]) -> Vec<Word> {
    bytes
        .chunks(4)
        .map(|c| {
            let mut w = [0u8; 4];
            w[..c.len()].copy_from_slice(c);
            Word::Raw(w)
        })
        .collect()
}

/// One parameter of a part.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub scale: i32,
    pub offset: i32,
    pub bits: i32,
}

impl ParamSpec {
    pub fn new(name: &str, scale: i32, offset: i32, bits: i32) -> Self {
        Self {
            name: name.to_string(),
            scale,
            offset,
            bits,
        }
    }
}

/// A part definition.
#[derive(Debug, Clone)]
pub struct PartSpec {
    pub name: String,
    pub header_len: i32,
    pub part_type: i32,
    pub params: Vec<ParamSpec>,
}

impl PartSpec {
    pub fn new(name: &str, header_len: i32, part_type: i32, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.to_string(),
            header_len,
            part_type,
            params,
        }
    }
}

#[derive(Debug, Clone)]
struct FileHeaderSpec {
    name: String,
    kind: i32,
    slot_len: usize,
    values: Vec<Word>,
}

#[derive(Debug, Clone)]
struct RecordSpec {
    row: usize,
    col: usize,
    part: usize,
    header: Vec<i32>,
    payload: Vec<Word>,
    length_override: Option<i32>,
}

/// Builder for a generic DM file.
#[derive(Debug, Clone)]
pub struct DmFileBuilder {
    order: FileEndian,
    file_type: i32,
    kmissd: i32,
    smissd: f32,
    label: String,
    row_keys: Vec<String>,
    col_keys: Vec<String>,
    file_headers: Vec<FileHeaderSpec>,
    parts: Vec<PartSpec>,
    rows: Vec<Option<Vec<Word>>>,
    cols: Vec<Option<Vec<Word>>>,
    records: Vec<RecordSpec>,
}

/// Word offsets of the structures in a built file.
#[derive(Debug, Clone, Default)]
pub struct DmLayout {
    pub kprkey: usize,
    pub kpckey: usize,
    pub kpfile: usize,
    pub kppart: usize,
    pub kprowh: usize,
    pub kpcolh: usize,
    pub kpdata: usize,
    /// First word of each record, keyed by `(row, col, part)` (1-based).
    pub records: HashMap<(usize, usize, usize), usize>,
}

impl DmFileBuilder {
    pub fn new(file_type: i32) -> Self {
        Self {
            order: FileEndian::Big,
            file_type,
            kmissd: IMISSD,
            smissd: RMISSD,
            label: DM_LABEL.to_string(),
            row_keys: Vec::new(),
            col_keys: Vec::new(),
            file_headers: Vec::new(),
            parts: Vec::new(),
            rows: Vec::new(),
            cols: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn byte_order(mut self, order: FileEndian) -> Self {
        self.order = order;
        self
    }

    /// File-specific missing codes.
    pub fn missing_codes(mut self, kmissd: i32, smissd: f32) -> Self {
        self.kmissd = kmissd;
        self.smissd = smissd;
        self
    }

    /// Replace the 28-character label (for negative tests).
    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn row_keys(mut self, keys: &[&str]) -> Self {
        self.row_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn column_keys(mut self, keys: &[&str]) -> Self {
        self.col_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Add a file header with room for `slot_len` words.
    pub fn file_header(mut self, name: &str, kind: i32, slot_len: usize, values: Vec<Word>) -> Self {
        self.file_headers.push(FileHeaderSpec {
            name: name.to_string(),
            kind,
            slot_len: slot_len.max(values.len()),
            values,
        });
        self
    }

    pub fn part(mut self, part: PartSpec) -> Self {
        self.parts.push(part);
        self
    }

    /// Add a used row with the given key values.
    pub fn row(mut self, keys: Vec<Word>) -> Self {
        self.rows.push(Some(keys));
        self
    }

    pub fn unused_row(mut self) -> Self {
        self.rows.push(None);
        self
    }

    /// Add a used column with the given key values.
    pub fn column(mut self, keys: Vec<Word>) -> Self {
        self.cols.push(Some(keys));
        self
    }

    pub fn unused_column(mut self) -> Self {
        self.cols.push(None);
        self
    }

    /// Add a record for `(row, col)` (1-based) in the named part.
    pub fn record(mut self, row: usize, col: usize, part: &str, header: Vec<i32>, payload: Vec<Word>) -> Self {
        let part = self.part_number(part);
        self.records.push(RecordSpec {
            row,
            col,
            part,
            header,
            payload,
            length_override: None,
        });
        self
    }

    /// Add a record whose length word is `length` regardless of its content.
    pub fn record_with_length(
        mut self,
        row: usize,
        col: usize,
        part: &str,
        length: i32,
        header: Vec<i32>,
        payload: Vec<Word>,
    ) -> Self {
        let part = self.part_number(part);
        self.records.push(RecordSpec {
            row,
            col,
            part,
            header,
            payload,
            length_override: Some(length),
        });
        self
    }

    fn part_number(&self, name: &str) -> usize {
        self.parts
            .iter()
            .position(|p| p.name == name)
            .map(|i| i + 1)
            .unwrap_or_else(|| panic!("unknown part {}", name))
    }

    /// Compute the layout and the words of the file.
    pub fn build_words(&self) -> (Vec<Word>, DmLayout) {
        let krow = self.rows.len();
        let kcol = self.cols.len();
        let kprt = self.parts.len();
        let krkeys = self.row_keys.len();
        let kckeys = self.col_keys.len();
        let kfhdrs = self.file_headers.len();

        let mut layout = DmLayout {
            kprkey: 32,
            ..Default::default()
        };
        layout.kpckey = layout.kprkey + krkeys;
        layout.kpfile = layout.kpckey + kckeys;
        let header_values: usize = self.file_headers.iter().map(|h| h.slot_len + 1).sum();
        layout.kppart = layout.kpfile + 3 * kfhdrs + header_values;
        let nparams: usize = self.parts.iter().map(|p| p.params.len()).sum();
        layout.kprowh = layout.kppart + 4 * kprt + 4 * nparams;
        layout.kpcolh = layout.kprowh + krow * (krkeys + 1);
        layout.kpdata = layout.kpcolh + kcol * (kckeys + 1);
        let mut next = layout.kpdata + krow * kcol * kprt;
        for rec in &self.records {
            layout.records.insert((rec.row, rec.col, rec.part), next);
            next += 1 + rec.header.len() + rec.payload.len();
        }

        let mut words = vec![Word::Int(0); next - 1];
        let mut put = |word: usize, value: Word| words[word - 1] = value;

        // Label
        for (i, w) in char_words(&self.label, 7).into_iter().enumerate() {
            put(1 + i, w);
        }
        let label_ints = [
            1,
            kfhdrs as i32,
            layout.kpfile as i32,
            krow as i32,
            krkeys as i32,
            layout.kprkey as i32,
            layout.kprowh as i32,
            kcol as i32,
            kckeys as i32,
            layout.kpckey as i32,
            layout.kpcolh as i32,
            kprt as i32,
            layout.kppart as i32,
            0,
            0,
            layout.kpdata as i32,
            self.file_type,
            0,
            self.order.machine_type(),
            self.kmissd,
        ];
        for (i, v) in label_ints.iter().enumerate() {
            put(8 + i, Word::Int(*v));
        }
        put(31, Word::Float(self.smissd));

        // Keys
        for (i, k) in self.row_keys.iter().enumerate() {
            put(layout.kprkey + i, Word::chars(k));
        }
        for (i, k) in self.col_keys.iter().enumerate() {
            put(layout.kpckey + i, Word::chars(k));
        }

        // File headers
        for (i, h) in self.file_headers.iter().enumerate() {
            put(layout.kpfile + i, Word::chars(&h.name));
            put(layout.kpfile + kfhdrs + i, Word::Int(h.slot_len as i32));
            put(layout.kpfile + 2 * kfhdrs + i, Word::Int(h.kind));
        }
        let mut iread = layout.kpfile + 3 * kfhdrs;
        for h in &self.file_headers {
            put(iread, Word::Int(h.values.len() as i32));
            for (j, v) in h.values.iter().enumerate() {
                put(iread + 1 + j, *v);
            }
            iread += h.slot_len + 1;
        }

        // Parts
        let mut iread = layout.kppart;
        for p in &self.parts {
            put(iread, Word::chars(&p.name));
            iread += 1;
        }
        for p in &self.parts {
            put(iread, Word::Int(p.header_len));
            iread += 1;
        }
        for p in &self.parts {
            put(iread, Word::Int(p.part_type));
            iread += 1;
        }
        for p in &self.parts {
            put(iread, Word::Int(p.params.len() as i32));
            iread += 1;
        }
        for p in &self.parts {
            for prm in &p.params {
                put(iread, Word::chars(&prm.name));
                iread += 1;
            }
        }
        for p in &self.parts {
            for prm in &p.params {
                put(iread, Word::Int(prm.scale));
                iread += 1;
            }
        }
        for p in &self.parts {
            for prm in &p.params {
                put(iread, Word::Int(prm.offset));
                iread += 1;
            }
        }
        for p in &self.parts {
            for prm in &p.params {
                put(iread, Word::Int(prm.bits));
                iread += 1;
            }
        }

        // Row and column headers
        for (i, row) in self.rows.iter().enumerate() {
            let base = layout.kprowh + i * (krkeys + 1);
            write_header(&mut put, base, row.as_deref(), krkeys, self.kmissd);
        }
        for (i, col) in self.cols.iter().enumerate() {
            let base = layout.kpcolh + i * (kckeys + 1);
            write_header(&mut put, base, col.as_deref(), kckeys, self.kmissd);
        }

        // Data pointers and records
        for rec in &self.records {
            let start = layout.records[&(rec.row, rec.col, rec.part)];
            let pointer = layout.kpdata
                + (rec.row - 1) * kcol * kprt
                + (rec.col - 1) * kprt
                + (rec.part - 1);
            put(pointer, Word::Int(start as i32));

            let length = rec
                .length_override
                .unwrap_or((rec.header.len() + rec.payload.len()) as i32);
            put(start, Word::Int(length));
            for (j, h) in rec.header.iter().enumerate() {
                put(start + 1 + j, Word::Int(*h));
            }
            for (j, w) in rec.payload.iter().enumerate() {
                put(start + 1 + rec.header.len() + j, *w);
            }
        }

        (words, layout)
    }

    /// Serialize the file.
    pub fn build(&self) -> Vec<u8> {
        let (words, _) = self.build_words();
        words.iter().flat_map(|w| w.encode(self.order)).collect()
    }

    /// Serialize the file into a temporary file on disk.
    pub fn write_temp(&self) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(&self.build()).expect("Failed to write temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }
}

fn write_header(
    put: &mut impl FnMut(usize, Word),
    base: usize,
    keys: Option<&[Word]>,
    nkeys: usize,
    kmissd: i32,
) {
    match keys {
        Some(keys) => {
            put(base, Word::Int(1));
            for (j, k) in keys.iter().take(nkeys).enumerate() {
                put(base + 1 + j, *k);
            }
        }
        None => {
            put(base, Word::Int(kmissd));
        }
    }
}

// ===== Grid files =====

/// Key values of one grid column header.
#[derive(Debug, Clone)]
pub struct GridHeaderSpec {
    pub time1: [i32; 2],
    pub time2: [i32; 2],
    pub level1: i32,
    pub level2: i32,
    pub vcoord: Word,
    pub param: String,
}

impl GridHeaderSpec {
    /// An analysis at 2024-03-15 12:00 on the 500 hPa surface.
    pub fn new(param: &str) -> Self {
        Self {
            time1: [240315, 1200],
            time2: [0, 0],
            level1: 500,
            level2: -1,
            vcoord: Word::Int(1),
            param: param.to_string(),
        }
    }

    /// Date `yymmdd`, time `hhmm` with forecast type `ftype` (0 A, 1 F, 2 G,
    /// 3 I) at `hhhmm`.
    pub fn forecast(mut self, yymmdd: i32, hhmm: i32, ftype: i32, hhhmm: i32) -> Self {
        let yy = yymmdd / 10000;
        let mmdd = yymmdd % 10000;
        let mmddyy = mmdd * 100 + yy;
        self.time1 = [mmddyy * 10000 + hhmm, ftype * 100000 + hhhmm];
        self
    }

    pub fn level(mut self, level1: i32, level2: i32, vcoord: Word) -> Self {
        self.level1 = level1;
        self.level2 = level2;
        self.vcoord = vcoord;
        self
    }

    pub fn to_words(&self) -> Vec<Word> {
        let mut words = vec![
            Word::Int(self.time1[0]),
            Word::Int(self.time1[1]),
            Word::Int(self.time2[0]),
            Word::Int(self.time2[1]),
            Word::Int(self.level1),
            Word::Int(self.level2),
            self.vcoord,
        ];
        words.extend(char_words(&self.param, 3));
        words
    }
}

/// Payload of a packed grid record.
#[derive(Debug, Clone)]
pub enum GridPayload {
    /// Packing type 0: plain floats.
    Unpacked(Vec<f32>),
    /// Packing type 1 with `nbits`-wide fields, MSB first.
    Grib {
        nbits: i32,
        missing_flag: bool,
        reference: f32,
        scale: f32,
        fields: Vec<u32>,
    },
    /// Packing type 4, laid out like type 1.
    Decimal {
        nbits: i32,
        missing_flag: bool,
        reference: f32,
        scale: f32,
        fields: Vec<u32>,
    },
    /// Packing type 3.
    Difference {
        nbits: i32,
        missing_flag: bool,
        kx: i32,
        reference: f32,
        scale: f32,
        difmin: f32,
        fields: Vec<u32>,
    },
    /// Packing type 5: an embedded GRIB2 message.
    Grib2 {
        kx: i32,
        ky: i32,
        scan_mode: i32,
        message: Vec<u8>,
    },
    /// Packing type 2 with placeholder parameters.
    Nmc { kxky: i32 },
    /// Arbitrary payload words, packing type word included.
    Words(Vec<Word>),
}

impl GridPayload {
    pub fn to_words(&self) -> Vec<Word> {
        match self {
            GridPayload::Unpacked(values) => {
                let mut words = vec![Word::Int(0)];
                words.extend(values.iter().map(|v| Word::Float(*v)));
                words
            }
            GridPayload::Grib {
                nbits,
                missing_flag,
                reference,
                scale,
                fields,
            } => simple_words(1, *nbits, *missing_flag, *reference, *scale, fields),
            GridPayload::Decimal {
                nbits,
                missing_flag,
                reference,
                scale,
                fields,
            } => simple_words(4, *nbits, *missing_flag, *reference, *scale, fields),
            GridPayload::Difference {
                nbits,
                missing_flag,
                kx,
                reference,
                scale,
                difmin,
                fields,
            } => {
                let mut words = vec![
                    Word::Int(3),
                    Word::Int(*nbits),
                    Word::Int(*missing_flag as i32),
                    Word::Int(fields.len() as i32),
                    Word::Int(*kx),
                    Word::Float(*reference),
                    Word::Float(*scale),
                    Word::Float(*difmin),
                ];
                words.extend(
                    pack_msb_words(fields, *nbits as usize)
                        .into_iter()
                        .map(|w| Word::Int(w as i32)),
                );
                words
            }
            GridPayload::Grib2 {
                kx,
                ky,
                scan_mode,
                message,
            } => {
                let mut words = vec![
                    Word::Int(5),
                    Word::Int(0),
                    Word::Int(*kx),
                    Word::Int(*ky),
                    Word::Int(*scan_mode),
                    Word::Float(0.0),
                ];
                words.extend(byte_words(message));
                words
            }
            GridPayload::Nmc { kxky } => vec![
                Word::Int(2),
                Word::Int(8),
                Word::Int(0),
                Word::Int(*kxky),
                Word::Float(0.0),
                Word::Float(1.0),
                Word::Int(0),
            ],
            GridPayload::Words(words) => words.clone(),
        }
    }
}

fn simple_words(
    packing: i32,
    nbits: i32,
    missing_flag: bool,
    reference: f32,
    scale: f32,
    fields: &[u32],
) -> Vec<Word> {
    let mut words = vec![
        Word::Int(packing),
        Word::Int(nbits),
        Word::Int(missing_flag as i32),
        Word::Int(fields.len() as i32),
        Word::Float(reference),
        Word::Float(scale),
    ];
    words.extend(
        pack_msb_words(fields, nbits as usize)
            .into_iter()
            .map(|w| Word::Int(w as i32)),
    );
    words
}

/// Navigation block contents.
#[derive(Debug, Clone)]
pub struct NavSpec {
    pub projection: String,
    pub kx: i32,
    pub ky: i32,
    pub lower_left: (f32, f32),
    pub upper_right: (f32, f32),
    pub angles: [f32; 3],
}

impl NavSpec {
    /// A cylindrical equidistant grid over the continental US.
    pub fn ced(kx: i32, ky: i32) -> Self {
        Self {
            projection: "CED".to_string(),
            kx,
            ky,
            lower_left: (20.0, -130.0),
            upper_right: (55.0, -60.0),
            angles: [0.0, 0.0, 0.0],
        }
    }

    pub fn to_words(&self) -> Vec<Word> {
        let mut words = vec![
            Word::Float(2.0),
            Word::chars(&self.projection),
            Word::Float(self.kx as f32),
            Word::Float(self.ky as f32),
            Word::Float(self.lower_left.0),
            Word::Float(self.lower_left.1),
            Word::Float(self.upper_right.0),
            Word::Float(self.upper_right.1),
            Word::Float(self.angles[0]),
            Word::Float(self.angles[1]),
            Word::Float(self.angles[2]),
        ];
        words.resize(13, Word::Float(0.0));
        words
    }
}

/// Builder for a GEMPAK grid file.
#[derive(Debug, Clone)]
pub struct GridFileBuilder {
    order: FileEndian,
    kmissd: i32,
    smissd: f32,
    nav: NavSpec,
    with_nav: bool,
    grid_header_len: i32,
    grids: Vec<(Option<GridHeaderSpec>, Option<GridPayload>)>,
}

impl GridFileBuilder {
    pub fn new(kx: i32, ky: i32) -> Self {
        Self {
            order: FileEndian::Big,
            kmissd: IMISSD,
            smissd: RMISSD,
            nav: NavSpec::ced(kx, ky),
            with_nav: true,
            grid_header_len: 2,
            grids: Vec::new(),
        }
    }

    pub fn byte_order(mut self, order: FileEndian) -> Self {
        self.order = order;
        self
    }

    pub fn missing_codes(mut self, kmissd: i32, smissd: f32) -> Self {
        self.kmissd = kmissd;
        self.smissd = smissd;
        self
    }

    pub fn nav(mut self, nav: NavSpec) -> Self {
        self.nav = nav;
        self
    }

    pub fn without_nav(mut self) -> Self {
        self.with_nav = false;
        self
    }

    pub fn grid_header_len(mut self, len: i32) -> Self {
        self.grid_header_len = len;
        self
    }

    /// Add a grid with a data record.
    pub fn grid(mut self, header: GridHeaderSpec, payload: GridPayload) -> Self {
        self.grids.push((Some(header), Some(payload)));
        self
    }

    /// Add a grid header whose data pointer is empty.
    pub fn grid_without_data(mut self, header: GridHeaderSpec) -> Self {
        self.grids.push((Some(header), None));
        self
    }

    /// Add an unused column slot.
    pub fn unused_slot(mut self) -> Self {
        self.grids.push((None, None));
        self
    }

    /// The underlying DM builder, for further customization.
    pub fn dm_builder(&self) -> DmFileBuilder {
        let mut dm = DmFileBuilder::new(3)
            .byte_order(self.order)
            .missing_codes(self.kmissd, self.smissd)
            .row_keys(&["GRID"])
            .column_keys(&GRID_COLUMN_KEYS)
            .part(PartSpec::new("GRID", self.grid_header_len, 5, Vec::new()))
            .row(vec![Word::Int(1)]);
        if self.with_nav {
            dm = dm.file_header("NAVB", 1, 256, self.nav.to_words());
        }
        dm = dm.file_header("ANLB", 1, 128, vec![Word::Float(2.0); 8]);

        let mut header = vec![self.nav.kx, self.nav.ky];
        header.resize(self.grid_header_len.max(0) as usize, 0);
        for (i, (spec, payload)) in self.grids.iter().enumerate() {
            dm = match spec {
                Some(spec) => dm.column(spec.to_words()),
                None => dm.unused_column(),
            };
            if let Some(payload) = payload {
                dm = dm.record(1, i + 1, "GRID", header.clone(), payload.to_words());
            }
        }
        dm
    }

    pub fn build(&self) -> Vec<u8> {
        self.dm_builder().build()
    }

    pub fn write_temp(&self) -> tempfile::NamedTempFile {
        self.dm_builder().write_temp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_and_machine_type() {
        let bytes = DmFileBuilder::new(3).build();
        assert_eq!(&bytes[..28], DM_LABEL.as_bytes());
        // Word 26 holds the machine type
        assert_eq!(&bytes[100..104], &3i32.to_be_bytes());

        let bytes = DmFileBuilder::new(3).byte_order(FileEndian::Little).build();
        assert_eq!(&bytes[100..104], &11i32.to_le_bytes());
    }

    #[test]
    fn test_record_pointer_layout() {
        let builder = DmFileBuilder::new(1)
            .row_keys(&["STID"])
            .column_keys(&["DATE"])
            .part(PartSpec::new("SFDT", 1, 1, vec![ParamSpec::new("TMPC", 0, 0, 0)]))
            .row(vec![Word::chars("KDEN")])
            .column(vec![Word::Int(240315)])
            .record(1, 1, "SFDT", vec![7], vec![Word::Float(12.5)]);
        let (words, layout) = builder.build_words();
        let start = layout.records[&(1, 1, 1)];
        assert_eq!(words[layout.kpdata - 1], Word::Int(start as i32));
        assert_eq!(words[start - 1], Word::Int(2));
        assert_eq!(words[start], Word::Int(7));
        assert_eq!(words[start + 1], Word::Float(12.5));
    }

    #[test]
    fn test_forecast_time_words() {
        let spec = GridHeaderSpec::new("TMPK").forecast(240315, 1200, 1, 600);
        assert_eq!(spec.time1, [31524 * 10000 + 1200, 100600]);
    }

    #[test]
    fn test_char_words_pad() {
        assert_eq!(
            char_words("TMPK", 3),
            vec![Word::chars("TMPK"), Word::chars(""), Word::chars("")]
        );
    }
}
