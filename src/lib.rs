//! # Hydro-watershed
//!
//! `hydro-watershed` delineates watersheds from a gridded DEM with the D8 model.  The
//! algorithms follow [whitebox](https://github.com/jblindsay/whitebox-tools): least-cost
//! depression breaching, priority-flood filling, D8 flow pointers, topological flow
//! accumulation, threshold stream extraction, pour point snapping and upstream watershed
//! tracing.
//!
//! Each stage is available twice: as a function on bare `ndarray` arrays (with the no-data
//! value and cell size passed alongside), and as a stage on a georeferenced [`Raster`] that
//! checks its inputs share a grid and logs through `tracing`.  [`run_pipeline`] chains the
//! stages together from a [`PipelineConfig`].
//!
//! ## Example
//!
//! ```
//! use ndarray::Array2;
//! use hydro_watershed::fill_depressions;
//!
//! let mut dem = Array2::from_shape_vec(
//!     (3, 3),
//!     vec![
//!         10.0, 12.0, 10.0,
//!         12.0, 9.0,  12.0,
//!         10.0, 12.0, 10.0,
//!     ],
//! ).expect("Failed to create DEM");
//!
//! fill_depressions(&mut dem, -3.0, 8.0, 8.0, true);
//! assert!(dem[[1, 1]] >= 10.0);
//! ```
//!
//! A whole run, from a synthetic valley to a watershed mask:
//!
//! ```
//! use ndarray::Array2;
//! use hydro_watershed::{run_pipeline, GeoTransform, PipelineConfig, Raster};
//!
//! // a valley draining south down column 2
//! let data = Array2::from_shape_fn((5, 5), |(r, c)| {
//!     10.0 + (c as f64 - 2.0).abs() * 2.0 - r as f64
//! });
//! let dem = Raster::new(data, -9999.0).with_transform(GeoTransform::new(0.0, 50.0, 10.0, -10.0));
//! let config = PipelineConfig::from_json(r#"{
//!     "stream_threshold": 3,
//!     "snap_distance": 20.0,
//!     "pour_points": [[25.0, 5.0]]
//! }"#).unwrap();
//!
//! let out = run_pipeline(&dem, &config).unwrap();
//! assert_eq!((out.pour_points[0].row, out.pour_points[0].col), (4, 2));
//! assert_eq!(out.watershed.data[[0, 2]], 1);
//! ```

pub mod accumulation;
pub mod d8;
pub mod depressions;
pub mod error;
pub mod hillshade;
pub mod io;
pub mod pipeline;
pub mod raster;
pub mod snap;
pub mod streams;
pub mod vector;
pub mod watershed;

pub use accumulation::{d8_flow_accumulation, flow_accumulation, ACCUM_NODATA};
pub use d8::{d8_pointer, flow_directions, FlowDirections, D8_CODES, D8_NODATA};
pub use depressions::{
    breach_depressions, fill_depressions, remaining_pits, resolve_depressions, small_num, DepressionParams,
    ResolvedDem,
};
pub use error::{HydroError, Result};
pub use hillshade::{hillshade, shaded_relief, HillshadeParams, HILLSHADE_NODATA};
pub use io::{array_to_rasterfile, rasterfile_to_array, RasterElement};
pub use pipeline::{run_pipeline, PipelineConfig, PipelineOutputs};
pub use raster::{is_nodata, Crs, GeoTransform, Raster};
pub use snap::{snap_pour_point, SnappedPoint};
pub use streams::{extract_streams, stream_network};
pub use vector::{links_to_geojson, pour_points_to_geojson, stream_links, write_geojson, StreamLink};
pub use watershed::{delineate_watershed, watershed};
