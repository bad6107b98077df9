//! Runs the whole delineation on a GeoTIFF DEM.
//!
//! ```text
//! cargo run --release --example delineate_watershed -- dem.tif config.json out/
//! ```
//!
//! Set `RUST_LOG=hydro_watershed=debug` for per-stage detail.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use hydro_watershed::{run_pipeline, PipelineConfig, Raster};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [dem, config, out] = args.as_slice() else {
        bail!("usage: delineate_watershed <dem.tif> <config.json> <output dir>");
    };

    let config = PipelineConfig::from_path(&PathBuf::from(config))
        .with_context(|| format!("reading config {config}"))?;
    let dem = Raster::<f64>::read(&PathBuf::from(dem)).with_context(|| format!("reading DEM {dem}"))?;

    let outputs = run_pipeline(&dem, &config)?;
    for p in &outputs.pour_points {
        println!(
            "pour point ({:.1}, {:.1}) snapped {:.1} to cell ({}, {})",
            p.requested.0, p.requested.1, p.distance, p.row, p.col
        );
    }
    let area = outputs.watershed.data.iter().filter(|&&m| m == 1).count() as f64 * dem.resx() * dem.resy();
    println!("watershed area {area:.0} square map units, {} stream links", outputs.stream_links.len());

    outputs.save(&PathBuf::from(out))?;
    Ok(())
}
