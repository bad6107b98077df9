//! The full delineation run: resolver, director, accumulator, extractor, snapper, delineator.

use std::fs;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::accumulation::flow_accumulation;
use crate::d8::flow_directions;
use crate::depressions::{resolve_depressions, DepressionParams};
use crate::error::{HydroError, Result};
use crate::hillshade::{shaded_relief, HillshadeParams};
use crate::raster::Raster;
use crate::snap::{snap_pour_point, SnappedPoint};
use crate::streams::stream_network;
use crate::vector::{links_to_geojson, pour_points_to_geojson, stream_links, write_geojson, StreamLink};
use crate::watershed::delineate_watershed;

fn default_breach_distance() -> usize {
    100
}

fn default_fill() -> bool {
    true
}

/// Settings for [`run_pipeline`], usually read from JSON.
///
/// ```
/// use hydro_watershed::PipelineConfig;
///
/// let config = PipelineConfig::from_json(r#"{
///     "stream_threshold": 500,
///     "snap_distance": 60.0,
///     "pour_points": [[1361300.0, 5006200.0]]
/// }"#).unwrap();
/// assert_eq!(config.breach_distance, 100);
/// assert!(config.fill);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Longest breach path in cells, `0` to only fill.
    #[serde(default = "default_breach_distance")]
    pub breach_distance: usize,
    /// Fill depressions that breaching could not remove.
    #[serde(default = "default_fill")]
    pub fill: bool,
    /// Unresolved depressions and undefined interior directions tolerated before aborting.
    #[serde(default)]
    pub max_unresolved: usize,
    /// Accumulation (cells) at which a cell becomes a stream.
    pub stream_threshold: f64,
    /// Furthest a pour point may be moved, in map units.
    pub snap_distance: f64,
    /// Outlets in map coordinates.
    pub pour_points: Vec<[f64; 2]>,
    #[serde(default)]
    pub hillshade: HillshadeParams,
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.stream_threshold.is_finite() || self.stream_threshold <= 0.0 {
            return Err(HydroError::invalid(
                "stream_threshold",
                self.stream_threshold,
                "must be a positive number of cells",
            ));
        }
        if !self.snap_distance.is_finite() || self.snap_distance < 0.0 {
            return Err(HydroError::invalid("snap_distance", self.snap_distance, "must be finite and not negative"));
        }
        if self.pour_points.is_empty() {
            return Err(HydroError::invalid("pour_points", "[]", "at least one pour point is needed"));
        }
        if let Some(p) = self.pour_points.iter().find(|p| !p[0].is_finite() || !p[1].is_finite()) {
            return Err(HydroError::invalid("pour_points", format!("{p:?}"), "coordinates must be finite"));
        }
        if !(0.0..=90.0).contains(&self.hillshade.altitude) {
            return Err(HydroError::invalid("hillshade.altitude", self.hillshade.altitude, "must be within 0..=90 degrees"));
        }
        Ok(())
    }

    fn depression_params(&self) -> DepressionParams {
        DepressionParams {
            breach_distance: self.breach_distance,
            fill: self.fill,
            max_unresolved: self.max_unresolved,
        }
    }
}

/// Everything a run produces, all on the input DEM's grid.
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub conditioned: Raster<f64>,
    pub flow_direction: Raster<u8>,
    pub accumulation: Raster<f64>,
    pub streams: Raster<u8>,
    pub pour_points: Vec<SnappedPoint>,
    pub watershed: Raster<u8>,
    pub hillshade: Raster<f64>,
    pub stream_links: Vec<StreamLink>,
}

impl PipelineOutputs {
    /// Writes the rasters as GeoTIFFs and the vectors as GeoJSON into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        self.conditioned.write(&dir.join("conditioned_dem.tif"))?;
        self.flow_direction.write(&dir.join("d8_pointer.tif"))?;
        self.accumulation.write(&dir.join("flow_accumulation.tif"))?;
        self.streams.write(&dir.join("streams.tif"))?;
        self.watershed.write(&dir.join("watershed.tif"))?;
        self.hillshade.write(&dir.join("hillshade.tif"))?;
        write_geojson(links_to_geojson(&self.stream_links), &dir.join("streams.geojson"))?;
        write_geojson(pour_points_to_geojson(&self.pour_points), &dir.join("pour_points.geojson"))?;
        info!(dir = %dir.display(), "saved pipeline outputs");
        Ok(())
    }
}

/// Runs every stage on `dem`, stopping at the first condition it cannot resolve.
pub fn run_pipeline(dem: &Raster<f64>, config: &PipelineConfig) -> Result<PipelineOutputs> {
    let start = Instant::now();
    config.validate()?;
    let (rows, cols) = dem.shape();
    info!(rows, cols, "starting watershed delineation");

    let resolved = resolve_depressions(dem, &config.depression_params())?;

    let directions = flow_directions(&resolved.dem)?;
    if directions.unresolved.len() > config.max_unresolved {
        let (row, col) = directions.unresolved[0];
        return Err(HydroError::UndefinedFlowDirection {
            row,
            col,
            count: directions.unresolved.len(),
        });
    }
    if !directions.unresolved.is_empty() {
        warn!(count = directions.unresolved.len(), "interior cells without a flow direction");
    }

    let accumulation = flow_accumulation(&directions.pointer)?;
    let streams = stream_network(&accumulation, config.stream_threshold)?;
    streams.same_grid(&directions.pointer)?;

    let pour_points = config
        .pour_points
        .iter()
        .map(|p| snap_pour_point((p[0], p[1]), &streams, config.snap_distance))
        .collect::<Result<Vec<_>>>()?;

    let watershed = delineate_watershed(&directions.pointer, &pour_points)?;
    let hillshade = shaded_relief(dem, &config.hillshade)?;
    let links = stream_links(&streams, &directions.pointer)?;

    info!(
        links = links.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "finished watershed delineation"
    );

    Ok(PipelineOutputs {
        conditioned: resolved.dem,
        flow_direction: directions.pointer,
        accumulation,
        streams,
        pour_points,
        watershed,
        hillshade,
        stream_links: links,
    })
}
