//! GRIB2 test data generator.
//!
//! Creates minimal synthetic GRIB2 messages with a latitude/longitude grid
//! (template 3.0), simple packing (template 5.0) and full control over the
//! packed integers, the scanning mode, the bitmap and quasi-regular line
//! lists. Several fields can share one grid section.

use crate::bits::pack_msb_bytes;

/// All-ones Ni/Nj marking a varying dimension.
pub const MISSING_DIM: u32 = 0xFFFF_FFFF;

/// Contents of Section 6 for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum BitmapSpec {
    /// Indicator 255: every point present.
    None,
    /// Indicator 0 with one flag per grid point.
    Present(Vec<bool>),
    /// Indicator 254: reuse the previous bitmap.
    Reuse,
}

/// One field: product definition, packing and data.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub param_category: u8,
    pub param_number: u8,
    pub level_type: u8,
    pub level_value: u32,
    pub forecast_hour: u32,
    pub data_template: u16,
    pub reference_value: f32,
    pub binary_scale: i16,
    pub decimal_scale: i16,
    pub bits_per_value: u8,
    /// Packed integers, one per present point.
    pub packed: Vec<u32>,
    pub bitmap: BitmapSpec,
}

impl FieldSpec {
    /// A field with explicit packing parameters and packed integers.
    pub fn packed(reference: f32, binary_scale: i16, decimal_scale: i16, bits: u8, packed: Vec<u32>) -> Self {
        Self {
            param_category: 0,
            param_number: 0,
            level_type: 100,
            level_value: 50000,
            forecast_hour: 0,
            data_template: 0,
            reference_value: reference,
            binary_scale,
            decimal_scale,
            bits_per_value: bits,
            packed,
            bitmap: BitmapSpec::None,
        }
    }

    /// Pack `values` with `bits` per value after scaling by 10^`decimal_scale`.
    ///
    /// Unpacking formula: value = (R + X * 2^E) * 10^-D.
    /// E is chosen as ceil(log2(range / (2^bits - 1))).
    pub fn from_values(values: &[f32], bits: u8, decimal_scale: i16) -> Self {
        let factor = 10f64.powi(decimal_scale as i32);
        let scaled: Vec<f64> = values.iter().map(|v| *v as f64 * factor).collect();
        let (min_val, max_val) = scaled
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| (min.min(v), max.max(v)));
        let range = max_val - min_val;

        if values.is_empty() || range == 0.0 || bits == 0 {
            let reference = if values.is_empty() { 0.0 } else { min_val as f32 };
            return Self::packed(reference, 0, decimal_scale, 0, Vec::new());
        }

        let max_packed = ((1u64 << bits) - 1) as f64;
        let binary_scale = (range / max_packed).log2().ceil() as i16;
        let step = 2f64.powi(binary_scale as i32);
        let reference = min_val as f32;
        let packed = scaled
            .iter()
            .map(|v| (((v - reference as f64) / step).round().max(0.0) as u64).min(max_packed as u64) as u32)
            .collect();
        Self::packed(reference, binary_scale, decimal_scale, bits, packed)
    }

    pub fn with_parameter(mut self, category: u8, number: u8) -> Self {
        self.param_category = category;
        self.param_number = number;
        self
    }

    pub fn with_level(mut self, level_type: u8, level_value: u32) -> Self {
        self.level_type = level_type;
        self.level_value = level_value;
        self
    }

    pub fn with_forecast_hour(mut self, hour: u32) -> Self {
        self.forecast_hour = hour;
        self
    }

    pub fn with_bitmap(mut self, bitmap: BitmapSpec) -> Self {
        self.bitmap = bitmap;
        self
    }

    pub fn with_data_template(mut self, template: u16) -> Self {
        self.data_template = template;
        self
    }
}

/// Build a GRIB2 message with the specified parameters
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    center: u16,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    grid_template: u16,
    ni: u32,
    nj: u32,
    la1: i32,
    lo1: i32,
    la2: i32,
    lo2: i32,
    di: u32,
    dj: u32,
    scanning_mode: u8,
    npts_in_line: Vec<u16>,
    fields: Vec<FieldSpec>,
}

impl Grib2Builder {
    /// An `ni` x `nj` one-degree grid with a constant zero field.
    pub fn new(ni: u32, nj: u32) -> Self {
        Self {
            discipline: 0,
            center: 7,
            year: 2024,
            month: 3,
            day: 15,
            hour: 12,
            grid_template: 0,
            ni,
            nj,
            la1: 45_000_000,
            lo1: -130_000_000,
            la2: 35_000_000,
            lo2: -120_000_000,
            di: 1_000_000,
            dj: 1_000_000,
            scanning_mode: 0b0100_0000,
            npts_in_line: Vec::new(),
            fields: vec![FieldSpec::packed(0.0, 0, 0, 0, Vec::new())],
        }
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self
    }

    pub fn with_center(mut self, center: u16) -> Self {
        self.center = center;
        self
    }

    pub fn with_scanning_mode(mut self, mode: u8) -> Self {
        self.scanning_mode = mode;
        self
    }

    pub fn with_grid_template(mut self, template: u16) -> Self {
        self.grid_template = template;
        self
    }

    /// Rows of varying length; Ni becomes missing.
    pub fn with_quasi_rows(mut self, counts: &[u16]) -> Self {
        self.ni = MISSING_DIM;
        self.nj = counts.len() as u32;
        self.npts_in_line = counts.to_vec();
        self
    }

    /// Columns of varying length; Nj becomes missing.
    pub fn with_quasi_columns(mut self, counts: &[u16]) -> Self {
        self.ni = counts.len() as u32;
        self.nj = MISSING_DIM;
        self.npts_in_line = counts.to_vec();
        self
    }

    /// Replace the first field.
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields[0] = field;
        self
    }

    /// Append a field that repeats Sections 4 to 7 after the previous one.
    pub fn add_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Convenience for a single field packed from `values` with 16 bits.
    pub fn with_data(self, values: &[f32]) -> Self {
        self.with_field(FieldSpec::from_values(values, 16, 0))
    }

    fn num_data_points(&self) -> u32 {
        if self.npts_in_line.is_empty() {
            self.ni.wrapping_mul(self.nj)
        } else {
            self.npts_in_line.iter().map(|n| *n as u32).sum()
        }
    }

    /// Build the complete GRIB2 message bytes
    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.build_section1());
        body.extend_from_slice(&self.build_section3());
        for field in &self.fields {
            body.extend_from_slice(&build_section4(field));
            body.extend_from_slice(&self.build_section5(field));
            body.extend_from_slice(&build_section6(field));
            body.extend_from_slice(&build_section7(field));
        }

        let message_length = 16 + body.len() + 4;
        let mut message = Vec::with_capacity(message_length);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(self.discipline);
        message.push(2);
        message.extend_from_slice(&(message_length as u64).to_be_bytes());
        message.extend_from_slice(&body);
        message.extend_from_slice(b"7777");
        message
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(1);
        section.extend_from_slice(&self.center.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Sub-center
        section.push(2); // Master table version
        section.push(1); // Local table version
        section.push(1); // Significance of reference time
        section.extend_from_slice(&self.year.to_be_bytes());
        section.push(self.month);
        section.push(self.day);
        section.push(self.hour);
        section.push(0);
        section.push(0);
        section.push(0); // Production status
        section.push(1); // Type of data
        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let list_octets: u8 = if self.npts_in_line.is_empty() { 0 } else { 2 };
        let section_length = 72 + self.npts_in_line.len() * list_octets as usize;

        let mut section = Vec::with_capacity(section_length);
        section.extend_from_slice(&(section_length as u32).to_be_bytes());
        section.push(3);
        section.push(0); // Source of grid definition
        section.extend_from_slice(&self.num_data_points().to_be_bytes());
        section.push(list_octets);
        section.push(if list_octets > 0 { 1 } else { 0 });
        section.extend_from_slice(&self.grid_template.to_be_bytes());

        section.push(6); // Shape of the earth
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        section.extend_from_slice(&self.ni.to_be_bytes());
        section.extend_from_slice(&self.nj.to_be_bytes());
        section.extend_from_slice(&0u32.to_be_bytes()); // Basic angle
        section.extend_from_slice(&MISSING_DIM.to_be_bytes()); // Subdivisions
        section.extend_from_slice(&signed32(self.la1));
        section.extend_from_slice(&signed32(self.lo1));
        section.push(48); // Resolution and component flags
        section.extend_from_slice(&signed32(self.la2));
        section.extend_from_slice(&signed32(self.lo2));
        section.extend_from_slice(&self.di.to_be_bytes());
        section.extend_from_slice(&self.dj.to_be_bytes());
        section.push(self.scanning_mode);

        for n in &self.npts_in_line {
            section.extend_from_slice(&n.to_be_bytes());
        }
        section
    }

    fn build_section5(&self, field: &FieldSpec) -> Vec<u8> {
        let mut section = Vec::with_capacity(21);
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(5);
        section.extend_from_slice(&self.num_data_points().to_be_bytes());
        section.extend_from_slice(&field.data_template.to_be_bytes());
        section.extend_from_slice(&field.reference_value.to_be_bytes());
        section.extend_from_slice(&signed16(field.binary_scale));
        section.extend_from_slice(&signed16(field.decimal_scale));
        section.push(field.bits_per_value);
        section.push(0); // Original field type
        section
    }
}

fn build_section4(field: &FieldSpec) -> Vec<u8> {
    let mut section = Vec::with_capacity(34);
    section.extend_from_slice(&34u32.to_be_bytes());
    section.push(4);
    section.extend_from_slice(&0u16.to_be_bytes()); // Coordinate values
    section.extend_from_slice(&0u16.to_be_bytes()); // Template 4.0
    section.push(field.param_category);
    section.push(field.param_number);
    section.push(2); // Generating process
    section.push(0);
    section.push(0);
    section.extend_from_slice(&0u16.to_be_bytes());
    section.push(0);
    section.push(1); // Hours
    section.extend_from_slice(&field.forecast_hour.to_be_bytes());
    section.push(field.level_type);
    section.push(0);
    section.extend_from_slice(&field.level_value.to_be_bytes());
    section.push(255);
    section.push(0);
    section.extend_from_slice(&0u32.to_be_bytes());
    section
}

fn build_section6(field: &FieldSpec) -> Vec<u8> {
    let mut section = Vec::new();
    match &field.bitmap {
        BitmapSpec::None | BitmapSpec::Reuse => {
            section.extend_from_slice(&6u32.to_be_bytes());
            section.push(6);
            section.push(if field.bitmap == BitmapSpec::Reuse { 254 } else { 255 });
        }
        BitmapSpec::Present(flags) => {
            let bits: Vec<u32> = flags.iter().map(|f| *f as u32).collect();
            let bytes = pack_msb_bytes(&bits, 1);
            section.extend_from_slice(&((6 + bytes.len()) as u32).to_be_bytes());
            section.push(6);
            section.push(0);
            section.extend_from_slice(&bytes);
        }
    }
    section
}

fn build_section7(field: &FieldSpec) -> Vec<u8> {
    let packed = if field.bits_per_value == 0 {
        Vec::new()
    } else {
        pack_msb_bytes(&field.packed, field.bits_per_value as usize)
    };
    let mut section = Vec::with_capacity(5 + packed.len());
    section.extend_from_slice(&((5 + packed.len()) as u32).to_be_bytes());
    section.push(7);
    section.extend_from_slice(&packed);
    section
}

/// Sign-magnitude encoding of a 16-bit value.
fn signed16(v: i16) -> [u8; 2] {
    let magnitude = v.unsigned_abs() & 0x7FFF;
    let raw = if v < 0 { 0x8000 | magnitude } else { magnitude };
    raw.to_be_bytes()
}

/// Sign-magnitude encoding of a 32-bit value.
fn signed32(v: i32) -> [u8; 4] {
    let magnitude = v.unsigned_abs() & 0x7FFF_FFFF;
    let raw = if v < 0 { 0x8000_0000 | magnitude } else { magnitude };
    raw.to_be_bytes()
}
