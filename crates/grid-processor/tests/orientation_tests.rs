//! Integration tests: every scanning mode on grids of several shapes, and
//! quasi-regular rectification of generated lines.

use grid_processor::{
    canonical_len, normalize, normalize_flag, rectify, CalibratedGrid, GridProcessorError,
    InterpolationMethod, QuasiGridShape, ScanMode, CANONICAL_SCAN_MODE,
};
use test_utils::fixtures::grid::{GridSpec, EVEN_4X4, ODD_5X3, SMALL_4X3};
use test_utils::{assert_approx_eq, create_quasi_lines, create_test_grid, encode_scan_order, ALL_SCAN_MODES};

const SHAPES: [GridSpec; 7] = [
    SMALL_4X3,
    ODD_5X3,
    EVEN_4X4,
    GridSpec { width: 3, height: 2 },
    GridSpec { width: 2, height: 3 },
    GridSpec { width: 3, height: 3 },
    GridSpec { width: 1, height: 4 },
];

#[test]
fn test_every_scan_mode_restores_canonical_order() {
    for spec in SHAPES {
        let canonical = create_test_grid(spec.width, spec.height);
        for flag in ALL_SCAN_MODES {
            let stored = encode_scan_order(&canonical, spec.width, spec.height, flag);
            let restored = normalize_flag(&stored, spec.width, spec.height, flag).unwrap();
            assert_eq!(
                restored, canonical,
                "scan mode {:#04x} on {}x{}",
                flag, spec.width, spec.height
            );
        }
    }
}

#[test]
fn test_low_flag_bits_are_ignored() {
    let canonical = create_test_grid(4, 3);
    for flag in ALL_SCAN_MODES {
        let stored = encode_scan_order(&canonical, 4, 3, flag);
        let restored = normalize_flag(&stored, 4, 3, flag | 0x0F).unwrap();
        assert_eq!(restored, canonical, "scan mode {:#04x}", flag);
    }
}

#[test]
fn test_canonical_mode_is_identity() {
    let scan = ScanMode::from_flag(CANONICAL_SCAN_MODE);
    assert!(scan.is_canonical());
    for spec in SHAPES {
        let grid = create_test_grid(spec.width, spec.height);
        assert_eq!(normalize(&grid, spec.width, spec.height, scan).unwrap(), grid);
    }
}

#[test]
fn test_canonical_len_matches_output() {
    for spec in SHAPES {
        for flag in ALL_SCAN_MODES {
            let scan = ScanMode::from_flag(flag);
            let stored = vec![0.0; spec.size()];
            let out = normalize(&stored, spec.width, spec.height, scan).unwrap();
            assert_eq!(out.len(), canonical_len(scan, spec.width, spec.height));
        }
    }
}

#[test]
fn test_normalize_rejects_wrong_length() {
    let err = normalize_flag(&[0.0; 11], 4, 3, 0x00).unwrap_err();
    assert!(matches!(
        err,
        GridProcessorError::DimensionMismatch {
            expected: 12,
            actual: 11
        }
    ));
}

#[test]
fn test_normalized_grid_indexes_from_south_west() {
    // Rows stored north to south, columns east to west.
    let canonical = create_test_grid(4, 3);
    let stored = encode_scan_order(&canonical, 4, 3, 0x80);
    let grid = CalibratedGrid::new(normalize_flag(&stored, 4, 3, 0x80).unwrap(), 4, 3).unwrap();

    // create_test_grid stores col * 1000 + row.
    assert_eq!(grid.get(0, 0), Some(0.0));
    assert_eq!(grid.get(3, 0), Some(3000.0));
    assert_eq!(grid.get(2, 1), Some(2001.0));
    assert_eq!(grid.get(4, 0), None);
}

#[test]
fn test_rectify_generated_rows() {
    let counts = [4, 8, 6];
    let lines = create_quasi_lines(&counts);
    let shape = QuasiGridShape::new(-1, 3, counts.to_vec()).unwrap();
    assert_eq!(shape.input_len(), lines.len());

    let grid = rectify(&lines, &shape, InterpolationMethod::Linear).unwrap();
    assert_eq!((grid.nx(), grid.ny()), (8, 3));

    // The longest row is copied as is.
    let row1: Vec<f32> = (0..8).map(|p| 100.0 + p as f32).collect();
    assert_eq!(&grid.data()[8..16], row1.as_slice());

    // A 4-point row doubles: every other value is a midpoint.
    assert_approx_eq!(grid.data()[0], 0.0, 1e-6);
    assert_approx_eq!(grid.data()[1], 0.5, 1e-6);
    assert_approx_eq!(grid.data()[2], 1.0, 1e-6);
    assert_approx_eq!(grid.data()[6], 3.0, 1e-6);
}

#[test]
fn test_rectify_methods_agree_on_line_starts() {
    let counts = [3, 5, 4];
    let lines = create_quasi_lines(&counts);
    let shape = QuasiGridShape::new(3, -1, counts.to_vec()).unwrap();

    let linear = rectify(&lines, &shape, InterpolationMethod::Linear).unwrap();
    let cubic = rectify(&lines, &shape, InterpolationMethod::Cubic).unwrap();
    assert_eq!((linear.nx(), linear.ny()), (3, 5));
    assert_eq!((cubic.nx(), cubic.ny()), (3, 5));

    for col in 0..3 {
        let first = (col * 100) as f32;
        assert_approx_eq!(linear.get(col, 0).unwrap(), first, 1e-4);
        assert_approx_eq!(cubic.get(col, 0).unwrap(), first, 1e-4);
    }
    // The full-length column is identical under both methods.
    for row in 0..5 {
        assert_eq!(linear.get(1, row), Some(100.0 + row as f32));
        assert_eq!(cubic.get(1, row), Some(100.0 + row as f32));
    }
}

#[test]
fn test_rectify_rejects_short_input() {
    let shape = QuasiGridShape::new(-1, 2, vec![3, 4]).unwrap();
    let err = rectify(&[0.0; 6], &shape, InterpolationMethod::Linear).unwrap_err();
    assert!(matches!(
        err,
        GridProcessorError::DimensionMismatch {
            expected: 7,
            actual: 6
        }
    ));
}
