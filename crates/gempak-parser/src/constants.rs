//! Fixed codes of the GEMPAK data management (DM) layer.

/// Identifier at the start of every DM file.
pub const DM_LABEL: &str = "GEMPAK DATA MANAGEMENT FILE ";

/// Universal integer missing value.
pub const IMISSD: i32 = -9999;

/// Universal float missing value.
pub const RMISSD: f32 = -9999.0;

/// Tolerance when comparing a float against a missing code.
pub const RDIFFD: f32 = 0.1;

/// Largest record length, in words, accepted before a record is treated as corrupt.
pub const MAX_RECORD_WORDS: i32 = 10_000_000;

/// Maximum grid header length.
pub const LLGDHD: i32 = 128;

/// Word holding the machine type inside the label.
pub const MACHINE_TYPE_WORD: i64 = 26;

/// Raw machine-type values above this mean the label was written with the
/// other byte order.
pub const SWAP_THRESHOLD: i32 = 100;

/// Machine types recorded in the label.
pub mod machine {
    pub const VAX: i32 = 2;
    pub const SUN: i32 = 3;
    pub const IRIS: i32 = 4;
    pub const APOL: i32 = 5;
    pub const IBM: i32 = 6;
    pub const IGPH: i32 = 7;
    pub const ULTX: i32 = 8;
    pub const HP: i32 = 9;
    pub const ALPH: i32 = 10;
    pub const LNUX: i32 = 11;

    /// True for machines that store words least significant byte first.
    pub fn is_little_endian(kmachn: i32) -> bool {
        matches!(kmachn, VAX | ULTX | ALPH | LNUX | IGPH)
    }

    /// Short machine name, or `"UNKN"`.
    pub fn name(kmachn: i32) -> &'static str {
        match kmachn {
            VAX => "VAX",
            SUN => "SUN",
            IRIS => "IRIS",
            APOL => "APOL",
            IBM => "IBM",
            IGPH => "IGPH",
            ULTX => "ULTX",
            HP => "HP",
            ALPH => "ALPH",
            LNUX => "LNUX",
            _ => "UNKN",
        }
    }
}

/// File types recorded in the label.
pub mod file_type {
    pub const SURFACE: i32 = 1;
    pub const SOUNDING: i32 = 2;
    pub const GRID: i32 = 3;
}

/// Data types of parts and file headers.
pub mod data_type {
    pub const REAL: i32 = 1;
    pub const INTG: i32 = 2;
    pub const CHAR: i32 = 3;
    pub const RPCK: i32 = 4;
    pub const GRID: i32 = 5;

    pub fn name(code: i32) -> &'static str {
        match code {
            REAL => "REAL",
            INTG => "INTG",
            CHAR => "CHAR",
            RPCK => "RPCK",
            GRID => "GRID",
            _ => "UNKN",
        }
    }
}

/// Column keys of a grid file, in file order.
pub const GRID_COLUMN_KEYS: [&str; 10] = [
    "GDT1", "GTM1", "GDT2", "GTM2", "GLV1", "GLV2", "GVCD", "GPM1", "GPM2", "GPM3",
];

/// Name of the part holding grid records.
pub const GRID_PART: &str = "GRID";

/// Name of the navigation file header.
pub const NAVB: &str = "NAVB";

/// Name of the analysis file header.
pub const ANLB: &str = "ANLB";
