//! Stream network extraction by thresholding flow accumulation.

use ndarray::{Array2, Zip};
use tracing::info;

use crate::error::{HydroError, Result};
use crate::raster::{is_nodata, Raster};

/// Marks cells whose accumulation is at least `threshold` with `1`, everything else `0`.
///
/// The threshold (in cells) sets the drainage density and has to come from the caller; it
/// must be finite and positive.
pub fn extract_streams(accum: &Array2<f64>, nodata: f64, threshold: f64) -> Result<Array2<u8>> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(HydroError::invalid(
            "stream_threshold",
            threshold,
            "must be a positive number of cells",
        ));
    }
    Ok(Zip::from(accum).par_map_collect(|&a| u8::from(!is_nodata(a, nodata) && a >= threshold)))
}

/// Stream stage on an accumulation raster's grid.
pub fn stream_network(accum: &Raster<f64>, threshold: f64) -> Result<Raster<u8>> {
    let streams = extract_streams(&accum.data, accum.nodata, threshold)?;
    info!(
        threshold,
        cells = streams.iter().filter(|&&s| s == 1).count(),
        "extracted streams"
    );
    accum.derive(streams, 0)
}
