//! Integration tests for the grid file reader.

use std::io::Cursor;

use gempak_parser::{
    DecoderConfig, GempakGridReader, InterpolationMethod, NoDataReason, PackingType,
    RecordOutcome, VerticalCoordinate,
};
use test_utils::gempak::{FileEndian, GridFileBuilder, GridHeaderSpec, GridPayload};
use test_utils::grib2::Grib2Builder;
use test_utils::{assert_approx_eq, encode_scan_order, sample_grid_file};

type MemoryReader = GempakGridReader<Cursor<Vec<u8>>>;

fn open(builder: GridFileBuilder, config: DecoderConfig) -> MemoryReader {
    GempakGridReader::from_reader(Cursor::new(builder.build()), config, "memory").unwrap()
}

fn heights() -> Vec<f32> {
    (0..12).map(|i| 5000.0 + 10.0 * i as f32).collect()
}

#[test]
fn test_grid_index() {
    let reader = open(sample_grid_file(FileEndian::Big), DecoderConfig::default());

    // RELH has no data record and is left out.
    assert_eq!(reader.grid_count(), 2);
    let params: Vec<&str> = reader.grids().iter().map(|g| g.param.as_str()).collect();
    assert_eq!(params, vec!["TMPK", "HGHT"]);
    assert!(reader.find_grid("RELH").is_none());

    let tmpk = reader.find_grid("TMPK ").unwrap();
    assert_eq!(tmpk.grid_number, 1);
    assert_eq!(tmpk.packing_type, Some(PackingType::None));
    assert_eq!(tmpk.level1, 500);
    assert_eq!(tmpk.level2, -1);
    assert_eq!(tmpk.vcoord, VerticalCoordinate::Pressure);
    assert_eq!(tmpk.decimal_scale, 0);
    assert_eq!(tmpk.time1.unwrap().to_string(), "240315/1200");
    assert!(tmpk.time2.is_none());

    let hght = reader.grid(2).unwrap();
    assert_eq!(hght.param, "HGHT");
    assert_eq!(hght.packing_type, Some(PackingType::Grib));
    assert_eq!(hght.time1.unwrap().to_string(), "240315/1200F006");

    assert_eq!(reader.analysis_block(), Some(&[2.0f32; 8][..]));
}

#[test]
fn test_grid_index_little_endian() {
    let reader = open(sample_grid_file(FileEndian::Little), DecoderConfig::default());
    let params: Vec<&str> = reader.grids().iter().map(|g| g.param.as_str()).collect();
    assert_eq!(params, vec!["TMPK", "HGHT"]);
    assert_eq!(reader.grids()[0].vcoord, VerticalCoordinate::Pressure);
}

#[test]
fn test_grib_packed_grid() {
    for order in [FileEndian::Big, FileEndian::Little] {
        let mut reader = open(sample_grid_file(order), DecoderConfig::default());
        let header = reader.find_grid("HGHT").cloned().unwrap();
        assert_eq!(reader.read_grid(&header).unwrap().unwrap(), heights());

        let grid = reader.decode_grid(2).unwrap().into_option().unwrap();
        assert_eq!((grid.nx(), grid.ny()), (4, 3));
        assert_eq!(grid.get(3, 2), Some(5110.0));
    }
}

#[test]
fn test_word_and_stream_unpackers_agree() {
    let mut fields: Vec<u32> = (0..12).map(|i| (i * 173) % 2047).collect();
    fields[5] = 2047;
    let builder = |order| {
        sample_grid_file(order).grid(
            GridHeaderSpec::new("OMEG"),
            GridPayload::Grib {
                nbits: 11,
                missing_flag: true,
                reference: -5.0,
                scale: 0.25,
                fields: fields.clone(),
            },
        )
    };
    let stream_config = DecoderConfig {
        use_word_unpacker: false,
        ..Default::default()
    };

    for order in [FileEndian::Big, FileEndian::Little] {
        let mut by_word = open(builder(order), DecoderConfig::default());
        let mut by_stream = open(builder(order), stream_config.clone());

        for param in ["HGHT", "OMEG"] {
            let header = by_word.find_grid(param).cloned().unwrap();
            let words = by_word.read_grid(&header).unwrap().unwrap();
            let stream = by_stream.read_grid(&header).unwrap().unwrap();
            assert_eq!(words, stream, "{} differs in {:?} file", param, order);
        }

        let header = by_word.find_grid("OMEG").cloned().unwrap();
        let values = by_word.read_grid(&header).unwrap().unwrap();
        assert_eq!(values[5], -9999.0);
        assert_approx_eq!(values[1], -5.0 + 173.0 * 0.25, 1e-4);
    }
}

#[test]
fn test_degenerate_packing_decodes_to_zeros() {
    let builder = GridFileBuilder::new(2, 2).grid(
        GridHeaderSpec::new("TMPK"),
        GridPayload::Grib {
            nbits: 1,
            missing_flag: false,
            reference: 280.0,
            scale: 1.0,
            fields: vec![1, 0, 1, 0],
        },
    );
    let mut reader = open(builder, DecoderConfig::default());
    let header = reader.find_grid("TMPK").cloned().unwrap();
    assert_eq!(reader.read_grid(&header).unwrap().unwrap(), vec![0.0; 4]);
}

#[test]
fn test_embedded_grib2_is_normalized() {
    // Rows stored north to south.
    let stored: Vec<f32> = (0..12).map(|v| v as f32).collect();
    let message = Grib2Builder::new(4, 3)
        .with_scanning_mode(0x00)
        .with_data(&stored)
        .build();
    let builder = GridFileBuilder::new(4, 3).grid(
        GridHeaderSpec::new("TMPK"),
        GridPayload::Grib2 {
            kx: 4,
            ky: 3,
            scan_mode: 0x00,
            message,
        },
    );

    for order in [FileEndian::Big, FileEndian::Little] {
        let mut reader = open(builder.clone().byte_order(order), DecoderConfig::default());
        let header = reader.find_grid("TMPK").cloned().unwrap();
        assert_eq!(header.packing_type, Some(PackingType::Grib2));

        let values = reader.read_grid(&header).unwrap().unwrap();
        let expected = [8.0, 9.0, 10.0, 11.0, 4.0, 5.0, 6.0, 7.0, 0.0, 1.0, 2.0, 3.0];
        assert_eq!(values.len(), expected.len());
        for (value, expected) in values.iter().zip(expected) {
            assert_approx_eq!(*value, expected, 1e-3);
        }
    }
}

#[test]
fn test_embedded_grib2_scan_modes() {
    let canonical: Vec<f32> = (0..12).map(|v| v as f32 * 2.0).collect();
    for flag in [0x40u8, 0x80, 0xC0] {
        let stored = encode_scan_order(&canonical, 4, 3, flag);
        let message = Grib2Builder::new(4, 3)
            .with_scanning_mode(flag)
            .with_data(&stored)
            .build();
        let builder = GridFileBuilder::new(4, 3).grid(
            GridHeaderSpec::new("TMPK"),
            GridPayload::Grib2 {
                kx: 4,
                ky: 3,
                scan_mode: flag as i32,
                message,
            },
        );
        let mut reader = open(builder, DecoderConfig::default());
        let header = reader.find_grid("TMPK").cloned().unwrap();
        let values = reader.read_grid(&header).unwrap().unwrap();

        // South-to-north scans are passed through as stored.
        let expected = if flag & 0x40 != 0 { &stored } else { &canonical };
        for (value, expected) in values.iter().zip(expected) {
            assert_approx_eq!(*value, *expected, 1e-3);
        }
    }
}

#[test]
fn test_embedded_quasi_regular_grib2() {
    let lines = [0.0, 1.0, 2.0, 3.0, 10.0, 20.0, 4.0, 5.0, 6.0, 7.0];
    let message = Grib2Builder::new(4, 3)
        .with_quasi_rows(&[4, 2, 4])
        .with_data(&lines)
        .build();
    let builder = GridFileBuilder::new(4, 3).grid(
        GridHeaderSpec::new("TMPK"),
        GridPayload::Grib2 {
            kx: 4,
            ky: 3,
            scan_mode: 0x40,
            message,
        },
    );
    let mut reader = open(builder, DecoderConfig::default());

    let grid = reader.decode_grid(1).unwrap().into_option().unwrap();
    assert_eq!((grid.nx(), grid.ny()), (4, 3));
    // Short rows wrap around: the last point lies between the row's end
    // and its start.
    let expected = [0.0, 1.0, 2.0, 3.0, 10.0, 15.0, 20.0, 15.0, 4.0, 5.0, 6.0, 7.0];
    for (value, expected) in grid.data().iter().zip(expected) {
        assert_approx_eq!(*value, expected, 1e-3);
    }
}

#[test]
fn test_quasi_interpolation_is_configurable() {
    let lines = [0.0, 1.0, 2.0, 3.0, 10.0, 20.0, 4.0, 5.0, 6.0, 7.0];
    let message = Grib2Builder::new(4, 3)
        .with_quasi_rows(&[4, 2, 4])
        .with_data(&lines)
        .build();
    let builder = GridFileBuilder::new(4, 3).grid(
        GridHeaderSpec::new("TMPK"),
        GridPayload::Grib2 {
            kx: 4,
            ky: 3,
            scan_mode: 0x40,
            message,
        },
    );
    let config = DecoderConfig {
        quasi_interpolation: InterpolationMethod::Cubic,
        ..Default::default()
    };
    let mut reader = open(builder, config);

    let grid = reader.decode_grid(1).unwrap().into_option().unwrap();
    // Full-length rows are copied whatever the method.
    assert_eq!(grid.data()[..4], [0.0, 1.0, 2.0, 3.0]);
    assert_eq!(grid.data()[8..], [4.0, 5.0, 6.0, 7.0]);
    assert_approx_eq!(grid.data()[4], 10.0, 1e-3);
}

#[test]
fn test_truncated_grid_has_no_data() {
    let mut bytes = sample_grid_file(FileEndian::Big).build();
    bytes.truncate(bytes.len() - 4);
    let mut reader =
        GempakGridReader::from_reader(Cursor::new(bytes), DecoderConfig::default(), "memory")
            .unwrap();

    assert_eq!(
        reader.decode_grid(2).unwrap(),
        RecordOutcome::NoData(NoDataReason::EndOfFile)
    );
    let header = reader.find_grid("HGHT").cloned().unwrap();
    assert!(reader.read_grid(&header).unwrap().is_none());
    assert!(reader.find_grid("TMPK").is_some());
}

#[test]
fn test_unknown_grid_number() {
    let mut reader = open(sample_grid_file(FileEndian::Big), DecoderConfig::default());
    let outcome = reader.read_raw_grid(3).unwrap();
    assert!(matches!(
        outcome.no_data_reason(),
        Some(NoDataReason::InvalidLocation { col: 3, .. })
    ));
}

#[test]
fn test_packing_type_probe() {
    let mut reader = open(sample_grid_file(FileEndian::Little), DecoderConfig::default());
    assert_eq!(reader.packing_type(1).unwrap(), Some(PackingType::None));
    assert_eq!(reader.packing_type(2).unwrap(), Some(PackingType::Grib));
    assert_eq!(reader.packing_type(3).unwrap(), None);
}

#[test]
fn test_header_display_and_json() {
    let reader = open(sample_grid_file(FileEndian::Big), DecoderConfig::default());
    let header = reader.find_grid("HGHT").unwrap();

    let line = header.to_string();
    assert!(line.contains("240315/1200F006"));
    assert!(line.contains("PRES"));
    assert!(line.ends_with("HGHT"));

    let json = serde_json::to_value(header).unwrap();
    assert_eq!(json["param"], "HGHT");
    assert_eq!(json["level1"], 500);
    assert_eq!(json["time1"]["forecast"]["hours"], 6);

    let nav = serde_json::to_value(reader.nav_block()).unwrap();
    assert_eq!(nav["projection"], "CED");
}

#[test]
fn test_gfs_sample_file() {
    let path = test_utils::require_test_file!(test_utils::files::GFS_GRID);
    let mut reader = GempakGridReader::open(&path, DecoderConfig::default()).unwrap();
    let nav = reader.nav_block().clone();
    assert!(reader.grid_count() > 0);

    let header = reader.grids()[0].clone();
    if let Some(values) = reader.read_grid(&header).unwrap() {
        assert_eq!(values.len(), nav.kx * nav.ky);
    }
}

#[test]
fn test_ecmwf_grib2_sample_file() {
    let path = test_utils::require_test_file!(test_utils::files::ECMWF_GRIB2_GRID);
    let mut reader = GempakGridReader::open(&path, DecoderConfig::default()).unwrap();

    let grib2: Vec<_> = reader
        .grids()
        .iter()
        .filter(|g| g.packing_type == Some(PackingType::Grib2))
        .cloned()
        .collect();
    for header in grib2.iter().take(3) {
        let grid = reader.decode_grid(header.grid_number).unwrap();
        assert!(grid.is_decoded(), "grid {} did not decode", header);
    }
}
