//! Substation proximity analysis.
//!
//! Loads the substation and charging station layers named in a TOML config,
//! classifies every station against the substation buffers and writes the
//! layers consumed by the map renderers.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use substation_proximity::crs::Crs;
use substation_proximity::io::{export_all, load_sites};
use substation_proximity::models::SiteLayer;
use substation_proximity::pipeline::ProximityAnalysis;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "analyze")]
#[command(about = "Classify EV charging stations by distance to substations")]
struct Args {
    /// TOML config file describing the input layers
    #[arg(short, long)]
    config: PathBuf,

    /// Buffer radius in target CRS units (overrides config)
    #[arg(long)]
    radius: Option<f64>,

    /// Projected CRS for the analysis, e.g. EPSG:3857 (overrides config)
    #[arg(long)]
    target_crs: Option<String>,

    /// Directory for exported layers (overrides config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// CRS of the exported GeoJSON layers (overrides config)
    #[arg(long)]
    export_crs: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG takes precedence when set
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Substation Proximity Analysis");
    info!("Config: {}", args.config.display());

    let config = Config::load_from_file(&args.config)?;

    let radius = args.radius.unwrap_or(config.analysis.radius);
    let target_crs = args
        .target_crs
        .as_deref()
        .unwrap_or(&config.analysis.target_crs);
    let target_crs = Crs::parse(target_crs).context("Invalid target CRS")?;
    let export_crs = args
        .export_crs
        .as_deref()
        .unwrap_or(&config.output.export_crs);
    let export_crs = Crs::parse(export_crs).context("Invalid export CRS")?;
    let output_dir = args.output_dir.unwrap_or(config.output.dir.clone());

    let analysis = ProximityAnalysis::new(target_crs, radius)?;
    info!(
        "Buffer radius {} in {}",
        analysis.radius(),
        analysis.target_crs()
    );

    // Load both layers
    let substations = load_sites(
        &config.substations.path,
        SiteLayer::Substations,
        &config.substations.load_options()?,
    )
    .context("Failed to load substations")?;
    let stations = load_sites(
        &config.charging_stations.path,
        SiteLayer::ChargingStations,
        &config.charging_stations.load_options()?,
    )
    .context("Failed to load charging stations")?;

    if substations.crs != stations.crs {
        info!(
            "Input layers use different CRSs ({} vs {}); both are reprojected before buffering",
            substations.crs, stations.crs
        );
    }

    let output = analysis
        .run(substations, stations)
        .context("Proximity analysis failed")?;

    let summary = output.summary();
    info!(
        "{} of {} charging stations are within {} of a substation",
        summary.within_buffer, summary.charging_stations, summary.radius
    );
    if summary.within_buffer == 0 {
        warn!("No charging station falls inside any substation buffer");
    }

    let written = export_all(
        &output,
        &output_dir,
        &export_crs,
        config.analysis.buffer_segments,
    )?;
    for path in &written {
        info!("  {}", path.display());
    }

    Ok(())
}
