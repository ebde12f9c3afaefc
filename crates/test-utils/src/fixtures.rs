//! Named sample files, grid shapes and the default in-memory grid file.

use crate::gempak::{FileEndian, GridFileBuilder, GridHeaderSpec, GridPayload};

/// Optional real-world sample files looked up with `require_test_file!`.
pub mod files {
    /// A GFS grid file written on a big-endian machine.
    pub const GFS_GRID: &str = "gfs_sample.gem";

    /// An ECMWF grid file holding GRIB2-packed grids.
    pub const ECMWF_GRIB2_GRID: &str = "ecmwf_sample.gem";
}

/// Grid shapes chosen to catch row/column and parity mistakes.
pub mod grid {
    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub width: usize,
        pub height: usize,
    }

    impl GridSpec {
        pub fn size(&self) -> usize {
            self.width * self.height
        }
    }

    /// Wider than tall, so row and column mistakes show up.
    pub const SMALL_4X3: GridSpec = GridSpec {
        width: 4,
        height: 3,
    };

    /// Odd on both axes.
    pub const ODD_5X3: GridSpec = GridSpec {
        width: 5,
        height: 3,
    };

    /// Even on both axes.
    pub const EVEN_4X4: GridSpec = GridSpec {
        width: 4,
        height: 4,
    };
}

/// Every scanning mode byte that changes the traversal.
pub const ALL_SCAN_MODES: [u8; 16] = [
    0x00, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80, 0x90, 0xA0, 0xB0, 0xC0, 0xD0, 0xE0, 0xF0,
];

/// A 4x3 grid file with three grids: one unpacked temperature field, one
/// GRIB-packed height field and one grid header without data.
pub fn sample_grid_file(order: FileEndian) -> GridFileBuilder {
    let spec = grid::SMALL_4X3;
    let temperatures: Vec<f32> = (0..spec.size()).map(|i| 270.0 + i as f32).collect();
    GridFileBuilder::new(spec.width as i32, spec.height as i32)
        .byte_order(order)
        .grid(GridHeaderSpec::new("TMPK"), GridPayload::Unpacked(temperatures))
        .grid(
            GridHeaderSpec::new("HGHT").forecast(240315, 1200, 1, 600),
            GridPayload::Grib {
                nbits: 8,
                missing_flag: false,
                reference: 5000.0,
                scale: 10.0,
                fields: (0..spec.size() as u32).collect(),
            },
        )
        .grid_without_data(GridHeaderSpec::new("RELH").level(850, -1, crate::gempak::Word::Int(1)))
}
