//! D8 flow accumulation.

use std::collections::VecDeque;
use std::time::Instant;

use ndarray::{Array2, Axis};
use rayon::prelude::*;
use tracing::info;

use crate::d8::{code_index, downstream, neighbour, D8_CODES};
use crate::error::{HydroError, Result};
use crate::raster::Raster;

/// No-data value of accumulation rasters.
pub const ACCUM_NODATA: f64 = -1.0;

/// Number of cells draining through each cell, the cell itself included.
///
/// Cells are visited in topological order: every cell starts with its own count, and once all
/// of a cell's contributors are done its total is passed to the cell it points at.  Pointers
/// of `0` (pits, flats, outlets) end a flow path.  No-data cells get [`ACCUM_NODATA`], which is
/// also returned as the second element.
///
/// Fails with [`HydroError::InvalidFlowCode`] on a pointer that is not a D8 code and with
/// [`HydroError::CyclicFlow`] when the pointers loop.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use hydro_watershed::d8_flow_accumulation;
///
/// // everything drains east along the row
/// let d8 = array![[2u8, 2, 2, 0]];
/// let (acc, _nd) = d8_flow_accumulation(&d8, 255).unwrap();
/// assert_eq!(acc, array![[1.0, 2.0, 3.0, 4.0]]);
/// ```
pub fn d8_flow_accumulation(d8: &Array2<u8>, nodata: u8) -> Result<(Array2<f64>, f64)> {
    let (rows, columns) = d8.dim();

    if let Some(((row, col), &code)) = d8
        .indexed_iter()
        .find(|&(_, &code)| code != 0 && code != nodata && code_index(code).is_none())
    {
        return Err(HydroError::InvalidFlowCode { row, col, code });
    }

    // how many neighbours point at each cell
    let mut in_degree = Array2::<u8>::zeros((rows, columns));
    in_degree
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(row, mut line)| {
            for col in 0..columns {
                if d8[[row, col]] == nodata {
                    continue;
                }
                line[col] = (0..8)
                    .filter(|&n| {
                        neighbour(row, col, n, rows, columns)
                            .is_some_and(|(rn, cn)| d8[[rn, cn]] == D8_CODES[(n + 4) % 8])
                    })
                    .count() as u8;
            }
        });

    let mut accum = d8.mapv(|code| if code == nodata { ACCUM_NODATA } else { 1.0 });
    let mut queue: VecDeque<(usize, usize)> = d8
        .indexed_iter()
        .filter(|&((row, col), &code)| code != nodata && in_degree[[row, col]] == 0)
        .map(|(idx, _)| idx)
        .collect();

    let mut processed = 0;
    while let Some((row, col)) = queue.pop_front() {
        processed += 1;
        let Some((rn, cn)) = downstream(row, col, d8[[row, col]], rows, columns) else {
            continue;
        };
        if d8[[rn, cn]] == nodata {
            continue;
        }
        accum[[rn, cn]] += accum[[row, col]];
        in_degree[[rn, cn]] -= 1;
        if in_degree[[rn, cn]] == 0 {
            queue.push_back((rn, cn));
        }
    }

    let valid = d8.iter().filter(|&&code| code != nodata).count();
    if processed < valid {
        if let Some(((row, col), _)) = in_degree.indexed_iter().find(|&(_, &deg)| deg > 0) {
            return Err(HydroError::CyclicFlow { row, col });
        }
    }

    Ok((accum, ACCUM_NODATA))
}

/// Accumulation stage on a pointer raster's grid.
pub fn flow_accumulation(d8: &Raster<u8>) -> Result<Raster<f64>> {
    let start = Instant::now();
    let (accum, nd) = d8_flow_accumulation(&d8.data, d8.nodata)?;
    info!(
        max = accum.iter().cloned().fold(0.0, f64::max),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "accumulated flow"
    );
    d8.derive(accum, nd)
}
