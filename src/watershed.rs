//! Watershed delineation from pour points.

use std::collections::VecDeque;
use std::time::Instant;

use ndarray::Array2;
use tracing::info;

use crate::d8::{neighbour, D8_CODES};
use crate::error::{HydroError, Result};
use crate::raster::Raster;
use crate::snap::SnappedPoint;

/// Marks with `1` every cell whose D8 flow path reaches one of `pour_points` (`(row, col)`).
///
/// Works upstream from each pour point: a neighbour joins the watershed when its pointer
/// points back at a cell already inside.  Watersheds of several pour points are unioned.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use hydro_watershed::watershed;
///
/// // left half drains west, right half drains east
/// let d8 = array![
///     [32u8, 32, 2, 2],
///     [32, 32, 2, 2],
/// ];
/// let mask = watershed(&d8, 255, &[(0, 0)]).unwrap();
/// assert_eq!(mask, array![[1u8, 1, 0, 0], [0, 0, 0, 0]]);
/// ```
pub fn watershed(d8: &Array2<u8>, nodata: u8, pour_points: &[(usize, usize)]) -> Result<Array2<u8>> {
    let (rows, columns) = d8.dim();
    if pour_points.is_empty() {
        return Err(HydroError::invalid("pour_points", "[]", "at least one pour point is needed"));
    }

    let mut mask = Array2::<u8>::zeros((rows, columns));
    let mut queue = VecDeque::new();
    for &(row, col) in pour_points {
        if row >= rows || col >= columns {
            return Err(HydroError::PourPointOutOfBounds { row, col, rows, cols: columns });
        }
        if mask[[row, col]] == 0 {
            mask[[row, col]] = 1;
            queue.push_back((row, col));
        }
    }

    while let Some((row, col)) = queue.pop_front() {
        for n in 0..8 {
            let Some((rn, cn)) = neighbour(row, col, n, rows, columns) else {
                continue;
            };
            if mask[[rn, cn]] == 1 {
                continue;
            }
            let code = d8[[rn, cn]];
            // the neighbour lies in direction n, so it must point the opposite way
            if code != nodata && code == D8_CODES[(n + 4) % 8] {
                mask[[rn, cn]] = 1;
                queue.push_back((rn, cn));
            }
        }
    }

    Ok(mask)
}

/// Watershed stage: mask on the pointer raster's grid for already snapped pour points.
pub fn delineate_watershed(d8: &Raster<u8>, pour_points: &[SnappedPoint]) -> Result<Raster<u8>> {
    let start = Instant::now();
    let cells: Vec<(usize, usize)> = pour_points.iter().map(|p| (p.row, p.col)).collect();
    let mask = watershed(&d8.data, d8.nodata, &cells)?;
    info!(
        pour_points = cells.len(),
        cells = mask.iter().filter(|&&m| m == 1).count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "delineated watershed"
    );
    d8.derive(mask, 0)
}
