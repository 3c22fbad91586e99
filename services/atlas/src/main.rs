//! Atlas command-line tool.
//!
//! Ingests gridded datasets from JSON grid files into a geospatial point
//! store and runs bounding-box and resampling queries against it.

mod config;
mod json_source;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use atlas_common::LonLat;
use grid_query::{QueryWindow, SpatialQueryEngine};
use ingestion::{Coordinator, ExecutionMode, GridSource, IngestOutcome};
use storage::GeoStore;

use config::AtlasConfig;
use json_source::{load_grid, parse_name_keys, LoadOptions};

#[derive(Parser, Debug)]
#[command(name = "atlas")]
#[command(about = "Gridded dataset ingestion and spatial queries")]
struct Args {
    /// Configuration file path (YAML); environment variables otherwise
    #[arg(short, long, env = "ATLAS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest one or more grid files; several files are tiles of one dataset
    Ingest(IngestArgs),
    /// Points inside a bounding box
    Bbox(BboxArgs),
    /// Interpolated values at query points
    Resample(ResampleArgs),
}

#[derive(ClapArgs, Debug)]
struct GridArgs {
    /// Grid file(s) in JSON format
    #[arg(long = "grid", required = true)]
    grids: Vec<PathBuf>,

    /// Dataset name, overriding the one in the file
    #[arg(long)]
    dataset: Option<String>,

    /// Comma-separated parameter names for the file stem tokens
    #[arg(long)]
    name_keys: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct IngestArgs {
    #[command(flatten)]
    grid: GridArgs,

    /// Run a single worker instead of fanning out
    #[arg(long)]
    serial: bool,

    /// Number of parallel workers
    #[arg(long, env = "ATLAS_WORKERS")]
    workers: Option<usize>,

    /// Fixed-point scale exponent
    #[arg(long, env = "ATLAS_SCALE")]
    scale: Option<u32>,
}

#[derive(ClapArgs, Debug)]
struct QueryArgs {
    /// Dataset name
    #[arg(long)]
    dataset: String,

    /// Variable to read
    #[arg(long)]
    variable: String,

    /// Grid file ingested before querying, for the in-memory store
    #[arg(long)]
    preload: Vec<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct BboxArgs {
    #[command(flatten)]
    query: QueryArgs,

    /// Top-left corner as lon,lat
    #[arg(long, value_parser = parse_lonlat, allow_hyphen_values = true)]
    top_left: LonLat,

    /// Bottom-right corner as lon,lat
    #[arg(long, value_parser = parse_lonlat, allow_hyphen_values = true)]
    bottom_right: LonLat,

    /// Print encoded values instead of decoded ones
    #[arg(long)]
    raw: bool,
}

#[derive(ClapArgs, Debug)]
struct ResampleArgs {
    #[command(flatten)]
    query: QueryArgs,

    /// Query point as lon,lat; repeatable
    #[arg(long = "point", required = true, value_parser = parse_lonlat, allow_hyphen_values = true)]
    points: Vec<LonLat>,

    /// Neighbours per point
    #[arg(long)]
    k: Option<usize>,

    /// Search radius in meters
    #[arg(long)]
    max_distance: Option<f64>,
}

fn parse_lonlat(s: &str) -> std::result::Result<LonLat, String> {
    let (lon, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lon,lat, got '{}'", s))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude: {}", e))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {}", e))?;
    Ok(LonLat::new(lon, lat))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    if args.json_logs {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    // Load configuration
    let config = match &args.config {
        Some(path) => AtlasConfig::from_yaml(path)?,
        None => AtlasConfig::from_env()?,
    };

    let store = config
        .store
        .open()
        .await
        .context("Failed to open geospatial store")?;
    info!(backend = ?config.store.backend, "Opened store");

    match args.command {
        Command::Ingest(ingest) => run_ingest(config, store, ingest).await,
        Command::Bbox(bbox) => run_bbox(config, store, bbox).await,
        Command::Resample(resample) => run_resample(config, store, resample).await,
    }
}

fn load_sources(grid: &GridArgs) -> Result<Vec<Arc<dyn GridSource>>> {
    let options = LoadOptions {
        name: grid.dataset.clone(),
        name_keys: grid.name_keys.as_deref().map(parse_name_keys).unwrap_or_default(),
    };
    grid.grids
        .iter()
        .map(|path| load_grid(path, &options).map(|d| Arc::new(d) as Arc<dyn GridSource>))
        .collect()
}

async fn run_ingest(mut config: AtlasConfig, store: Arc<dyn GeoStore>, args: IngestArgs) -> Result<()> {
    if let Some(workers) = args.workers {
        config.ingest.workers = Some(workers);
    }
    if let Some(scale) = args.scale {
        config.ingest.scale = scale;
    }
    config.validate()?;

    let mode = if args.serial {
        ExecutionMode::Serial
    } else {
        ExecutionMode::Parallel
    };
    let sources = load_sources(&args.grid)?;
    let coordinator = Coordinator::new(store, config.ingest)?;

    let reports = if let [single] = sources.as_slice() {
        vec![coordinator.ingest_source(single.as_ref(), mode).await?]
    } else {
        let dataset = match &args.grid.dataset {
            Some(name) => name.clone(),
            None => sources[0].name().to_string(),
        };
        coordinator.ingest_tiles(&dataset, &sources, mode).await?
    };

    let mut failed = false;
    for (tile, report) in reports.iter().enumerate() {
        let summary = serde_json::json!({
            "dataset": report.dataset,
            "tile": tile + 1,
            "documents": report.documents_written(),
            "batches": report.batches(),
            "outcome": format!("{:?}", report.outcome()),
            "failed_slices": report.failed_slices(),
            "error": report.first_error().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string(&summary)?);
        if report.outcome() != IngestOutcome::Complete {
            warn!(tile = tile + 1, "Tile did not complete");
            failed = true;
        }
    }

    if failed {
        bail!("Ingestion finished with failures");
    }
    Ok(())
}

async fn preload(config: &AtlasConfig, store: &Arc<dyn GeoStore>, paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        return Ok(());
    }
    let grid = GridArgs {
        grids: paths.to_vec(),
        dataset: None,
        name_keys: None,
    };
    let coordinator = Coordinator::new(Arc::clone(store), config.ingest.clone())?;
    for source in load_sources(&grid)? {
        let report = coordinator
            .ingest_source(source.as_ref(), ExecutionMode::Parallel)
            .await?;
        if !report.succeeded() {
            bail!("Preloading {} failed", source.name());
        }
    }
    Ok(())
}

async fn run_bbox(config: AtlasConfig, store: Arc<dyn GeoStore>, args: BboxArgs) -> Result<()> {
    preload(&config, &store, &args.query.preload).await?;

    let engine = SpatialQueryEngine::new(store);
    let window = QueryWindow::new(args.top_left, args.bottom_right)?;

    let output = if args.raw {
        let points = engine
            .bbox(&args.query.dataset, &window, &args.query.variable)
            .await?;
        serde_json::to_string_pretty(&points)?
    } else {
        let points = engine
            .bbox_values(&args.query.dataset, &window, &args.query.variable)
            .await?;
        serde_json::to_string_pretty(&points)?
    };
    println!("{}", output);
    Ok(())
}

async fn run_resample(mut config: AtlasConfig, store: Arc<dyn GeoStore>, args: ResampleArgs) -> Result<()> {
    if let Some(k) = args.k {
        config.resample.k = k;
    }
    if let Some(max_distance) = args.max_distance {
        config.resample.max_distance = max_distance;
    }
    config.validate()?;
    preload(&config, &store, &args.query.preload).await?;

    let engine = SpatialQueryEngine::new(store);
    let results = engine
        .resample(
            &args.query.dataset,
            &args.points,
            &args.query.variable,
            &config.resample,
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lonlat() {
        assert_eq!(parse_lonlat("-10.5, 45").unwrap(), LonLat::new(-10.5, 45.0));
        assert!(parse_lonlat("10").is_err());
        assert!(parse_lonlat("a,b").is_err());
    }

    #[test]
    fn test_cli_parses_ingest() {
        let args = Args::try_parse_from([
            "atlas",
            "ingest",
            "--grid",
            "a.json",
            "--grid",
            "b.json",
            "--serial",
            "--scale",
            "2",
        ])
        .unwrap();
        match args.command {
            Command::Ingest(ingest) => {
                assert_eq!(ingest.grid.grids.len(), 2);
                assert!(ingest.serial);
                assert_eq!(ingest.scale, Some(2));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_resample_points() {
        let args = Args::try_parse_from([
            "atlas",
            "resample",
            "--dataset",
            "gsde",
            "--variable",
            "clay",
            "--point",
            "10,45",
            "--point",
            "-1.5,2",
        ])
        .unwrap();
        match args.command {
            Command::Resample(resample) => {
                assert_eq!(resample.points.len(), 2);
                assert_eq!(resample.points[1], LonLat::new(-1.5, 2.0));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
