//! Moving pour points onto the stream network.

use tracing::debug;

use crate::error::{HydroError, Result};
use crate::raster::Raster;

/// A pour point after snapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnappedPoint {
    /// Coordinate as given.
    pub requested: (f64, f64),
    pub row: usize,
    pub col: usize,
    /// Centre of the stream cell.
    pub x: f64,
    pub y: f64,
    /// How far the point moved, in map units.
    pub distance: f64,
}

/// Relocates `point` (map units) to the centre of the nearest stream cell.
///
/// Only cells whose centres lie within `max_distance` of the point are considered; ties go to
/// the lowest row, then the lowest column.  A point already on a stream cell centre stays
/// where it is.  When no stream cell is close enough the call fails with
/// [`HydroError::PourPointSnapFailure`] rather than moving the point further.
pub fn snap_pour_point(point: (f64, f64), streams: &Raster<u8>, max_distance: f64) -> Result<SnappedPoint> {
    if !max_distance.is_finite() || max_distance < 0.0 {
        return Err(HydroError::invalid("snap_distance", max_distance, "must be finite and not negative"));
    }
    let (x, y) = point;
    let failure = HydroError::PourPointSnapFailure { x, y, max_distance };
    let (rows, cols) = streams.shape();
    if rows == 0 || cols == 0 {
        return Err(failure);
    }
    let (Some((rowf, colf)), Some((reach_r, reach_c))) =
        (streams.transform.to_cell(x, y), streams.transform.cell_reach(max_distance))
    else {
        return Err(failure);
    };

    // window of cells that can possibly be close enough
    let reach_r = reach_r.ceil() + 1.0;
    let reach_c = reach_c.ceil() + 1.0;
    let clamp = |v: f64, n: usize| v.max(0.0).min((n - 1) as f64) as usize;
    let (r0, r1) = (clamp((rowf - reach_r).floor(), rows), clamp((rowf + reach_r).floor(), rows));
    let (c0, c1) = (clamp((colf - reach_c).floor(), cols), clamp((colf + reach_c).floor(), cols));

    let mut best: Option<(f64, usize, usize)> = None;
    for row in r0..=r1 {
        for col in c0..=c1 {
            if streams.data[[row, col]] != 1 {
                continue;
            }
            let (cx, cy) = streams.transform.cell_center(row, col);
            let d = (cx - x).hypot(cy - y);
            if d > max_distance {
                continue;
            }
            // row-major scan, so only a strictly closer cell replaces the best
            if best.is_none_or(|(bd, _, _)| d < bd) {
                best = Some((d, row, col));
            }
        }
    }

    let (distance, row, col) = best.ok_or(failure)?;
    let (sx, sy) = streams.transform.cell_center(row, col);
    debug!(x, y, row, col, distance, "snapped pour point");
    Ok(SnappedPoint {
        requested: point,
        row,
        col,
        x: sx,
        y: sy,
        distance,
    })
}
