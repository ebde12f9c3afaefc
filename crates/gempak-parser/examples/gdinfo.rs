//! List the grids in a GEMPAK grid file.
//!
//! Run with: cargo run --package gempak-parser --example gdinfo -- <file> [--param TMPK]

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use gempak_parser::{
    DecoderConfig, GempakGridReader, GridHeader, InterpolationMethod, NavBlock,
};

#[derive(Parser, Debug)]
#[command(name = "gdinfo")]
#[command(about = "Show the navigation and grid index of a GEMPAK grid file")]
struct Args {
    /// GEMPAK grid file
    file: String,

    /// Decode grids with this parameter name and print their value range
    #[arg(short, long)]
    param: Option<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Unpack GRIB-packed grids with the streaming bit cursor
    #[arg(long, env = "GEMPAK_STREAM_UNPACKER")]
    stream: bool,

    /// Interpolation for quasi-regular grids (linear or cubic)
    #[arg(long, default_value = "linear", env = "GEMPAK_QUASI_INTERPOLATION")]
    interpolation: String,

    /// Log level
    #[arg(long, default_value = "warn", env = "RUST_LOG")]
    log_level: String,
}

#[derive(Serialize)]
struct GridSummary<'a> {
    header: &'a GridHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<(f32, f32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing: Option<usize>,
}

#[derive(Serialize)]
struct FileSummary<'a> {
    file: &'a str,
    navigation: &'a NavBlock,
    grids: Vec<GridSummary<'a>>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt().with_env_filter(filter).with_target(true).init();

    let config = DecoderConfig {
        use_word_unpacker: !args.stream,
        quasi_interpolation: InterpolationMethod::from_str(&args.interpolation),
        ..DecoderConfig::from_env()
    };
    let missing = config.float_missing;

    let mut reader = GempakGridReader::open(&args.file, config)
        .with_context(|| format!("Failed to open {}", args.file))?;
    info!(file = %args.file, grids = reader.grid_count(), "Opened grid file");

    let headers = reader.grids().to_vec();
    let mut stats = Vec::with_capacity(headers.len());
    for header in &headers {
        let wanted = args.param.as_deref().map(str::trim) == Some(header.param.as_str());
        if !wanted {
            stats.push((None, None));
            continue;
        }
        let decoded = reader
            .decode_grid(header.grid_number)
            .with_context(|| format!("Failed to read grid {}", header.grid_number))?
            .into_option();
        stats.push(match decoded {
            Some(grid) => (grid.value_range(missing), Some(grid.count_missing(missing))),
            None => (None, None),
        });
    }

    let summary = FileSummary {
        file: &args.file,
        navigation: reader.nav_block(),
        grids: headers
            .iter()
            .zip(stats)
            .map(|(header, (range, missing))| GridSummary {
                header,
                range,
                missing,
            })
            .collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let nav = summary.navigation;
    println!("GRID FILE: {}", summary.file);
    println!(
        "GRID NAVIGATION: {} {} x {}  LL ({}, {})  UR ({}, {})",
        nav.projection,
        nav.kx,
        nav.ky,
        nav.lower_left.0,
        nav.lower_left.1,
        nav.upper_right.0,
        nav.upper_right.1
    );
    println!();
    println!(
        "{:>5} {:<15} {:<15} {:>5} {:>5} {:<4} PARM",
        "NUM", "TIME1", "TIME2", "LEVL1", "LEVL2", "VCORD"
    );
    for grid in &summary.grids {
        match (grid.range, grid.missing) {
            (Some((lo, hi)), Some(missing)) => {
                println!("{}  min {} max {} missing {}", grid.header, lo, hi, missing)
            }
            (None, Some(missing)) => println!("{}  all {} points missing", grid.header, missing),
            _ => println!("{}", grid.header),
        }
    }
    Ok(())
}
