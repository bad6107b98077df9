//! D8 flow directions.
//!
//! Pointers follow the Whitebox convention, one bit per neighbour:
//!
//! ```text
//!  64 128   1
//!  32   0   2
//!  16   8   4
//! ```
//!
//! `0` means the cell has no downslope neighbour and [`D8_NODATA`] marks no-data cells.

use ndarray::{Array2, Axis};
use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::raster::{is_nodata, Raster};

pub(crate) const DX: [isize; 8] = [1, 1, 1, 0, -1, -1, -1, 0];
pub(crate) const DY: [isize; 8] = [-1, 0, 1, 1, 1, 0, -1, -1];

/// Pointer value for each neighbour, in the same order as the offsets.
pub const D8_CODES: [u8; 8] = [1, 2, 4, 8, 16, 32, 64, 128];

/// No-data value of pointer rasters.
pub const D8_NODATA: u8 = 255;

/// Neighbour index (0..8) of a pointer value, `None` for `0`, no-data or garbage.
pub fn code_index(code: u8) -> Option<usize> {
    D8_CODES.iter().position(|&c| c == code)
}

/// Cell that `(row, col)` drains into, `None` if the pointer is undefined or leaves the grid.
pub fn downstream(row: usize, col: usize, code: u8, rows: usize, cols: usize) -> Option<(usize, usize)> {
    let n = code_index(code)?;
    neighbour(row, col, n, rows, cols)
}

/// In-grid neighbour `n` of `(row, col)`.
pub(crate) fn neighbour(row: usize, col: usize, n: usize, rows: usize, cols: usize) -> Option<(usize, usize)> {
    let rn = row as isize + DY[n];
    let cn = col as isize + DX[n];
    if rn < 0 || cn < 0 || rn as usize >= rows || cn as usize >= cols {
        return None;
    }
    Some((rn as usize, cn as usize))
}

/// True for cells on the raster edge or next to a no-data cell; flow may leave the grid there.
pub(crate) fn on_boundary(dem: &Array2<f64>, nodata: f64, row: usize, col: usize) -> bool {
    let (rows, cols) = dem.dim();
    if row == 0 || col == 0 || row + 1 == rows || col + 1 == cols {
        return true;
    }
    (0..8).any(|n| match neighbour(row, col, n, rows, cols) {
        Some((rn, cn)) => is_nodata(dem[[rn, cn]], nodata),
        None => true,
    })
}

/// Computes the D8 pointer of a (depression free) DEM.
///
/// Each cell points at the neighbour with the steepest drop, where the drop is divided by
/// `resx`/`resy` for orthogonal neighbours and by the diagonal length otherwise.  Ties go to
/// the first neighbour in NE, E, SE, S, SW, W, NW, N order.  Cells without a lower neighbour
/// get `0`.  No-data cells get [`D8_NODATA`], which is also returned as the second element.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use hydro_watershed::d8_pointer;
///
/// let dem = array![
///     [3.0, 3.0, 3.0],
///     [3.0, 2.0, 1.0],
///     [3.0, 3.0, 3.0],
/// ];
/// let (d8, nd) = d8_pointer(&dem, -9999.0, 8.0, 8.0);
/// assert_eq!(nd, 255);
/// assert_eq!(d8[[1, 1]], 2);
/// ```
pub fn d8_pointer(dem: &Array2<f64>, nodata: f64, resx: f64, resy: f64) -> (Array2<u8>, u8) {
    let (rows, columns) = dem.dim();
    let diag = (resx * resx + resy * resy).sqrt();
    let grid_lengths = [diag, resx, diag, resy, diag, resx, diag, resy];

    let mut d8 = Array2::<u8>::zeros((rows, columns));
    d8.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(row, mut line)| {
            for col in 0..columns {
                let z = dem[[row, col]];
                if is_nodata(z, nodata) {
                    line[col] = D8_NODATA;
                    continue;
                }
                let mut dir = 0u8;
                let mut max_slope = 0.0;
                for n in 0..8 {
                    if let Some((rn, cn)) = neighbour(row, col, n, rows, columns) {
                        let zn = dem[[rn, cn]];
                        if is_nodata(zn, nodata) {
                            continue;
                        }
                        let slope = (z - zn) / grid_lengths[n];
                        if slope > max_slope {
                            max_slope = slope;
                            dir = D8_CODES[n];
                        }
                    }
                }
                line[col] = dir;
            }
        });

    (d8, D8_NODATA)
}

/// A D8 pointer raster plus the interior cells that got no direction.
#[derive(Debug, Clone)]
pub struct FlowDirections {
    pub pointer: Raster<u8>,
    /// Cells with pointer `0` that are neither on the edge nor next to no-data, row-major.
    pub unresolved: Vec<(usize, usize)>,
}

/// D8 stage: pointer raster on the DEM's grid, reporting flats and pits it could not route.
pub fn flow_directions(dem: &Raster<f64>) -> Result<FlowDirections> {
    let (d8, nd) = d8_pointer(&dem.data, dem.nodata, dem.resx(), dem.resy());

    let unresolved: Vec<(usize, usize)> = d8
        .indexed_iter()
        .filter(|&((row, col), &code)| code == 0 && !on_boundary(&dem.data, dem.nodata, row, col))
        .map(|(idx, _)| idx)
        .collect();
    debug!(unresolved = unresolved.len(), "computed d8 pointer");

    Ok(FlowDirections {
        pointer: dem.derive(d8, nd)?,
        unresolved,
    })
}
