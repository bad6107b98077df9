//! Depression removal: least-cost breaching with a priority-flood fill fallback.
//!
//! Both kernels work in place on an `Array2<f64>` and follow
//! [whitebox](https://github.com/jblindsay/whitebox-tools)'s `BreachDepressionsLeastCost`
//! and `FillDepressions`.  [`resolve_depressions`] is the pipeline stage: it leaves its input
//! alone and returns a new raster.

use std::cmp::Ordering;
use std::cmp::Ordering::Equal;
use std::collections::{BinaryHeap, VecDeque};
use std::f64::consts::SQRT_2;
use std::time::Instant;

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::d8::{neighbour, on_boundary, DX, DY};
use crate::error::{HydroError, Result};
use crate::raster::{is_nodata, Raster};

/// Step length in cells, same order as the D8 offsets.
const STEP_LENGTH: [f64; 8] = [SQRT_2, 1.0, SQRT_2, 1.0, SQRT_2, 1.0, SQRT_2, 1.0];

#[derive(PartialEq, Debug)]
struct GridCell {
    row: usize,
    column: usize,
    priority: f64,
}

impl Eq for GridCell {}

impl PartialOrd for GridCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GridCell {
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority.partial_cmp(&self.priority).unwrap_or(Equal)
    }
}

#[derive(PartialEq, Debug)]
struct GridCell2 {
    row: usize,
    column: usize,
    z: f64,
    priority: f64,
}

impl Eq for GridCell2 {}

impl PartialOrd for GridCell2 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GridCell2 {
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority.partial_cmp(&self.priority).unwrap_or(Equal)
    }
}

/// Search front of the breach path finder.  Equal costs pop in discovery order.
#[derive(PartialEq, Debug)]
struct BreachCell {
    row: usize,
    column: usize,
    steps: usize,
    seq: usize,
    cost: f64,
}

impl Eq for BreachCell {}

impl PartialOrd for BreachCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BreachCell {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Elevation increment used to impose strictly descending profiles.
///
/// Scaled so it stays well below the precision the DEM's largest elevation is stored with.
/// No-data cells do not count towards that elevation.
pub fn small_num(dem: &Array2<f64>, nodata: f64, resx: f64, resy: f64) -> f64 {
    let diagres = (resx * resx + resy * resy).sqrt();
    let max_elev = dem
        .iter()
        .copied()
        .filter(|&z| !is_nodata(z, nodata) && z.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let max_elev = if max_elev.is_finite() { max_elev } else { 0.0 };
    let elev_digits = (max_elev as i64)
        .to_string()
        .len() as i32;
    let elev_multiplier = 10.0_f64.powi(9 - elev_digits);
    1.0_f64 / elev_multiplier * diagres.ceil()
}

/// Interior cell with no lower and no no-data neighbour.
fn is_pit(dem: &Array2<f64>, nodata: f64, row: usize, col: usize) -> bool {
    let (rows, columns) = dem.dim();
    if row == 0 || col == 0 || row + 1 >= rows || col + 1 >= columns {
        return false;
    }
    let z = dem[[row, col]];
    if is_nodata(z, nodata) {
        return false;
    }
    (0..8).all(|n| {
        let zn = dem[[(row as isize + DY[n]) as usize, (col as isize + DX[n]) as usize]];
        zn >= z && !is_nodata(zn, nodata)
    })
}

/// All pits of `dem` as `(row, col, z)`, in row-major order.
fn find_pits(dem: &Array2<f64>, nodata: f64) -> Vec<(usize, usize, f64)> {
    let (rows, columns) = dem.dim();
    if rows < 3 || columns < 3 {
        return vec![];
    }
    (1..rows - 1)
        .into_par_iter()
        .flat_map(|row| {
            let mut local_pits = Vec::new();
            for col in 1..columns - 1 {
                if is_pit(dem, nodata, row, col) {
                    local_pits.push((row, col, dem[[row, col]]));
                }
            }
            local_pits
        })
        .collect()
}

/// Cells of `dem` that still have nowhere to drain, in row-major order.
pub fn remaining_pits(dem: &Array2<f64>, nodata: f64) -> Vec<(usize, usize)> {
    find_pits(dem, nodata).into_iter().map(|(r, c, _)| (r, c)).collect()
}

/// Breaches depressions (sinks) in a digital elevation model (DEM).
///
/// Pits are taken lowest first.  Each is set just below its lowest neighbour and a least-cost
/// path is searched, at most `max_dist` cells long, to either a cell lower than the descending
/// path level or the raster edge.  The cells on that path are lowered so the profile drops by
/// `small_num` per step.  No-data cells are never crossed.
///
/// Returns the number of pits that could not be breached within `max_dist`.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use hydro_watershed::breach_depressions;
///
/// let mut dem = array![
///     [2.0, 2.0, 2.0],
///     [2.0, 1.0, 1.9],
///     [2.0, 2.0, 2.0],
/// ];
/// let n = breach_depressions(&mut dem, -999.0, 8.0, 8.0, 100);
/// assert_eq!(n, 0);
/// assert!(dem[[1, 1]] > dem[[1, 2]]);
/// ```
pub fn breach_depressions(
    dem: &mut Array2<f64>, nodata: f64, resx: f64, resy: f64, max_dist: usize
) -> usize
{
    breach_pits(dem, nodata, resx, resy, max_dist).len()
}

fn breach_pits(
    dem: &mut Array2<f64>, nodata: f64, resx: f64, resy: f64, max_dist: usize
) -> Vec<(usize, usize)>
{
    let (rows, columns) = dem.dim();
    let small_num = small_num(dem, nodata, resx, resy);
    let on_edge = |row: usize, col: usize| row == 0 || col == 0 || row + 1 == rows || col + 1 == columns;

    let mut pits = find_pits(dem, nodata);
    // popped lowest first
    pits.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Equal));

    let mut unresolved = vec![];
    let mut cost = Array2::<f64>::from_elem((rows, columns), f64::INFINITY);
    let mut settled = Array2::<bool>::from_elem((rows, columns), false);
    let mut backlink = Array2::<u8>::from_elem((rows, columns), u8::MAX);
    let mut touched: Vec<(usize, usize)> = vec![];
    let mut minheap = BinaryHeap::new();

    while let Some((row, col, _)) = pits.pop() {
        // an earlier breach may have drained this one
        if !is_pit(dem, nodata, row, col) {
            continue;
        }

        let lowest = (0..8)
            .map(|n| dem[[(row as isize + DY[n]) as usize, (col as isize + DX[n]) as usize]])
            .fold(f64::INFINITY, f64::min);
        let z0 = lowest - small_num;
        dem[[row, col]] = z0;

        for (r, c) in touched.drain(..) {
            cost[[r, c]] = f64::INFINITY;
            settled[[r, c]] = false;
            backlink[[r, c]] = u8::MAX;
        }
        minheap.clear();

        cost[[row, col]] = 0.0;
        touched.push((row, col));
        let mut seq = 0;
        minheap.push(BreachCell { row, column: col, steps: 0, seq, cost: 0.0 });

        let mut outlet = None;
        while let Some(cell) = minheap.pop() {
            if settled[[cell.row, cell.column]] {
                continue;
            }
            settled[[cell.row, cell.column]] = true;

            if (cell.row, cell.column) != (row, col) && on_edge(cell.row, cell.column) {
                outlet = Some((cell.row, cell.column));
                break;
            }
            if cell.steps >= max_dist {
                continue;
            }

            let steps = cell.steps + 1;
            let target = z0 - steps as f64 * small_num;
            for n in 0..8 {
                let Some((rn, cn)) = neighbour(cell.row, cell.column, n, rows, columns) else {
                    continue;
                };
                if settled[[rn, cn]] {
                    continue;
                }
                let zn = dem[[rn, cn]];
                if is_nodata(zn, nodata) {
                    continue;
                }
                if zn < target {
                    // lower ground, nothing left to carve
                    backlink[[rn, cn]] = n as u8;
                    touched.push((rn, cn));
                    outlet = Some((rn, cn));
                    break;
                }
                let c = cell.cost + (zn - target) * STEP_LENGTH[n];
                if c < cost[[rn, cn]] {
                    cost[[rn, cn]] = c;
                    backlink[[rn, cn]] = n as u8;
                    touched.push((rn, cn));
                    seq += 1;
                    minheap.push(BreachCell { row: rn, column: cn, steps, seq, cost: c });
                }
            }
            if outlet.is_some() {
                break;
            }
        }

        match outlet {
            Some((orow, ocol)) => {
                let mut path = vec![];
                let (mut r, mut c) = (orow, ocol);
                while (r, c) != (row, col) {
                    path.push((r, c));
                    let n = backlink[[r, c]] as usize;
                    if n >= 8 {
                        break;
                    }
                    r = (r as isize - DY[n]) as usize;
                    c = (c as isize - DX[n]) as usize;
                }
                for (k, &(r, c)) in path.iter().rev().enumerate() {
                    let zt = z0 - (k + 1) as f64 * small_num;
                    if dem[[r, c]] > zt {
                        dem[[r, c]] = zt;
                    }
                }
            }
            None => unresolved.push((row, col)),
        }
    }

    unresolved
}

/// Fills depressions (sinks) in a digital elevation model (DEM).
///
/// More-or-less the contents of
/// [whitebox fill_depressions](https://github.com/jblindsay/whitebox-tools/blob/master/whitebox-tools-app/src/tools/hydro_analysis/fill_depressions.rs)
///
/// This function modifies the input `dem` to ensure that all depressions (local minima that do not
/// drain) are removed, making the surface hydrologically correct. Cells on the raster edge or
/// next to no-data drain out of the grid. It also considers no-data values and can optionally
/// fix flat areas.
///
/// # Parameters
///
/// - `dem`: A mutable reference to a 2D array (`Array2<f64>`) representing the elevation data.
/// - `nodata`: The value representing no-data cells in the DEM.
/// - `resx`: The horizontal resolution (grid spacing in the x-direction).
/// - `resy`: The vertical resolution (grid spacing in the y-direction).
/// - `fix_flats`: A boolean flag to determine whether flat areas should be slightly sloped.
///
/// # Example
///
/// ```
/// use ndarray::Array2;
/// use hydro_watershed::fill_depressions;
///
/// let mut dem = Array2::from_shape_vec(
///     (3, 3),
///     vec![
///         10.0, 12.0, 10.0,
///         12.0, 9.0,  12.0,
///         10.0, 12.0, 10.0,
///     ],
/// ).expect("Failed to create DEM");
///
/// fill_depressions(&mut dem, -3.0, 8.0, 8.0, true);
/// assert!(dem[[1, 1]] > 10.0);
/// ```
pub fn fill_depressions(
    dem: &mut Array2<f64>, nodata: f64, resx: f64, resy: f64, fix_flats: bool
)
{
    let (rows, columns) = dem.dim();
    let small_num = small_num(dem, nodata, resx, resy);

    let mut pits = find_pits(dem, nodata);

    let mut minheap = BinaryHeap::new();
    let mut minheap2 = BinaryHeap::new();
    let mut visited = Array2::<u8>::zeros((rows, columns));
    let mut flats = Array2::<u8>::zeros((rows, columns));
    let mut possible_outlets = vec![];
    let mut queue = VecDeque::new();

    // go through pits from highest to lowest
    pits.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Equal));
    while let Some(cell) = pits.pop() {
        let row: usize = cell.0;
        let col: usize = cell.1;

        // if it's already in a solved site, don't do it a second time.
        if flats[[row, col]] == 1 {
            continue;
        }

        // First there is a priority region-growing operation to find the outlets.
        minheap.clear();
        minheap.push(GridCell {
            row,
            column: col,
            priority: dem[[row, col]],
        });
        visited[[row, col]] = 1;
        let mut outlet_found = false;
        let mut outlet_z = f64::INFINITY;
        queue.clear();
        while let Some(cell2) = minheap.pop() {
            let z = cell2.priority;
            if outlet_found && z > outlet_z {
                break;
            }
            if !outlet_found && on_boundary(dem, nodata, cell2.row, cell2.column) {
                // spills off the grid; handled with the other outlets at this level below
                outlet_found = true;
                outlet_z = z;
            }
            if !outlet_found {
                for n in 0..8 {
                    let cn: usize = (cell2.column as isize + DX[n]) as usize;
                    let rn: usize = (cell2.row as isize + DY[n]) as usize;
                    if rn < rows && cn < columns && visited[[rn, cn]] == 0 {
                        let zn = dem[[rn, cn]];
                        if !outlet_found {
                            if zn >= z && !is_nodata(zn, nodata) {
                                minheap.push(GridCell {
                                    row: rn,
                                    column: cn,
                                    priority: zn,
                                });
                                visited[[rn, cn]] = 1;
                            } else if !is_nodata(zn, nodata) {
                                // zn < z
                                // 'cell' has a lower neighbour that hasn't already passed through minheap.
                                // Therefore, 'cell' is a pour point cell.
                                outlet_found = true;
                                outlet_z = z;
                                queue.push_back((cell2.row, cell2.column));
                                possible_outlets.push((cell2.row, cell2.column));
                            }
                        } else if zn == outlet_z {
                            // We've found the outlet but are still looking for additional depression cells.
                            minheap.push(GridCell {
                                row: rn,
                                column: cn,
                                priority: zn,
                            });
                            visited[[rn, cn]] = 1;
                        }
                    }
                }
            } else if z == outlet_z {
                // We've found the outlet but are still looking for additional depression cells and potential outlets.
                let mut anoutlet = on_boundary(dem, nodata, cell2.row, cell2.column);
                for n in 0..8 {
                    let cn: usize = (cell2.column as isize + DX[n]) as usize;
                    let rn: usize = (cell2.row as isize + DY[n]) as usize;
                    if rn < rows && cn < columns && visited[[rn, cn]] == 0 {
                        let zn = dem[[rn, cn]];
                        if is_nodata(zn, nodata) {
                            continue;
                        }
                        if zn < z {
                            anoutlet = true;
                        } else if zn == outlet_z {
                            minheap.push(GridCell {
                                row: rn,
                                column: cn,
                                priority: zn,
                            });
                            visited[[rn, cn]] = 1;
                        }
                    }
                }
                if anoutlet {
                    queue.push_back((cell2.row, cell2.column));
                    possible_outlets.push((cell2.row, cell2.column));
                }
            }
        }

        if outlet_found {
            // Now that we have the outlets, raise the interior of the depression.
            // Start from the outlets.
            while let Some(cell2) = queue.pop_front() {
                for n in 0..8 {
                    let rn: usize = (cell2.0 as isize + DY[n]) as usize;
                    let cn: usize = (cell2.1 as isize + DX[n]) as usize;
                    if rn < rows && cn < columns && visited[[rn, cn]] == 1 {
                        visited[[rn, cn]] = 0;
                        queue.push_back((rn, cn));
                        let z = dem[[rn, cn]];
                        if z < outlet_z {
                            dem[[rn, cn]] = outlet_z;
                            flats[[rn, cn]] = 1;
                        } else if z == outlet_z {
                            flats[[rn, cn]] = 1;
                        }
                    }
                }
            }
        } else {
            queue.push_back((row, col)); // start at the pit cell and clean up visited
            visited[[row, col]] = 0;
            while let Some(cell2) = queue.pop_front() {
                for n in 0..8 {
                    let rn: usize = (cell2.0 as isize + DY[n]) as usize;
                    let cn: usize = (cell2.1 as isize + DX[n]) as usize;
                    if rn < rows && cn < columns && visited[[rn, cn]] == 1 {
                        visited[[rn, cn]] = 0;
                        queue.push_back((rn, cn));
                    }
                }
            }
        }
    }

    drop(visited);

    if small_num > 0.0 && fix_flats {
        // Some of the potential outlets really will have lower cells.
        minheap.clear();
        while let Some(cell) = possible_outlets.pop() {
            let z = dem[[cell.0, cell.1]];
            let anoutlet = on_boundary(dem, nodata, cell.0, cell.1)
                || (0..8).any(|n| {
                    neighbour(cell.0, cell.1, n, rows, columns).is_some_and(|(rn, cn)| {
                        let zn = dem[[rn, cn]];
                        zn < z && !is_nodata(zn, nodata)
                    })
                });
            if anoutlet {
                minheap.push(GridCell {
                    row: cell.0,
                    column: cell.1,
                    priority: z,
                });
            }
        }

        let mut outlets = vec![];
        while let Some(cell) = minheap.pop() {
            if flats[[cell.row, cell.column]] == 3 {
                continue;
            }
            let z = dem[[cell.row, cell.column]];
            flats[[cell.row, cell.column]] = 3;
            outlets.clear();
            outlets.push(cell);
            // Are there any other outlet cells at the same elevation (likely for the same feature)
            while minheap.peek().is_some_and(|cell2| cell2.priority == z) {
                if let Some(cell2) = minheap.pop() {
                    flats[[cell2.row, cell2.column]] = 3;
                    outlets.push(cell2);
                }
            }
            minheap2.clear();
            for cell2 in &outlets {
                let z = dem[[cell2.row, cell2.column]];
                for n in 0..8 {
                    let cn: usize = (cell2.column as isize + DX[n]) as usize;
                    let rn: usize = (cell2.row as isize + DY[n]) as usize;
                    if rn < rows && cn < columns && flats[[rn, cn]] != 3 {
                        let zn = dem[[rn, cn]];
                        if zn == z && !is_nodata(zn, nodata) {
                            minheap2.push(GridCell2 {
                                row: rn,
                                column: cn,
                                z,
                                priority: dem[[rn, cn]],
                            });
                            dem[[rn, cn]] = z + small_num;
                            flats[[rn, cn]] = 3;
                        }
                    }
                }
            }
            // Now fix the flats
            while let Some(cell2) = minheap2.pop() {
                let z = dem[[cell2.row, cell2.column]];
                for n in 0..8 {
                    let cn: usize = (cell2.column as isize + DX[n]) as usize;
                    let rn: usize = (cell2.row as isize + DY[n]) as usize;
                    if rn < rows && cn < columns && flats[[rn, cn]] != 3 {
                        let zn = dem[[rn, cn]];
                        if zn < z + small_num && zn >= cell2.z && !is_nodata(zn, nodata) {
                            minheap2.push(GridCell2 {
                                row: rn,
                                column: cn,
                                z: cell2.z,
                                priority: dem[[rn, cn]],
                            });
                            dem[[rn, cn]] = z + small_num;
                            flats[[rn, cn]] = 3;
                        }
                    }
                }
            }
        }
    }
}

/// Settings of the depression resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct DepressionParams {
    /// Longest breach path, in cells.  `0` skips breaching.
    pub breach_distance: usize,
    /// Fill whatever breaching left behind (and slope the flats).
    pub fill: bool,
    /// How many unresolved pits are tolerated before giving up.
    pub max_unresolved: usize,
}

impl Default for DepressionParams {
    fn default() -> Self {
        Self {
            breach_distance: 100,
            fill: true,
            max_unresolved: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedDem {
    pub dem: Raster<f64>,
    /// Pits in the input DEM.
    pub pits: usize,
    /// Pits still present in `dem`, row-major.
    pub unresolved: Vec<(usize, usize)>,
}

/// Depression resolver stage: breach, then fill the leftovers, on a copy of `dem`.
///
/// Fails with [`HydroError::UnresolvedDepression`] at the first remaining pit when more than
/// `max_unresolved` remain.
pub fn resolve_depressions(dem: &Raster<f64>, params: &DepressionParams) -> Result<ResolvedDem> {
    let start = Instant::now();
    let (resx, resy) = (dem.resx(), dem.resy());
    let mut data = dem.data.clone();
    let pits = find_pits(&data, dem.nodata).len();

    let mut unresolved = if params.breach_distance > 0 {
        let left = breach_pits(&mut data, dem.nodata, resx, resy, params.breach_distance);
        debug!(pits, unbreached = left.len(), "breached depressions");
        left
    } else {
        remaining_pits(&data, dem.nodata)
    };
    if params.fill {
        fill_depressions(&mut data, dem.nodata, resx, resy, true);
        unresolved = remaining_pits(&data, dem.nodata);
    }
    unresolved.sort_unstable();

    info!(
        pits,
        unresolved = unresolved.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "resolved depressions"
    );
    if unresolved.len() > params.max_unresolved {
        let (row, col) = unresolved[0];
        return Err(HydroError::UnresolvedDepression { row, col, count: unresolved.len() });
    }
    if !unresolved.is_empty() {
        warn!(count = unresolved.len(), "keeping unresolved depressions");
    }

    Ok(ResolvedDem {
        dem: dem.derive(data, dem.nodata)?,
        pits,
        unresolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_small_num() {
        let dem = array![[2.0, 1.0], [1.0, 1.0]];
        assert!((small_num(&dem, -1.0, 8.0, 8.0) - 1.2e-7).abs() < 1e-15);
        let dem = array![[10.0, 1.0], [1.0, 1.0]];
        assert!((small_num(&dem, -1.0, 8.0, 8.0) - 1.2e-6).abs() < 1e-14);
    }

    #[test]
    fn test_small_num_ignores_nodata() {
        let dem = array![[2.0, 1e10], [1.0, 1.0]];
        assert!((small_num(&dem, 1e10, 8.0, 8.0) - 1.2e-7).abs() < 1e-15);
        let dem = array![[2.0, f64::NAN], [1.0, 1.0]];
        assert!((small_num(&dem, f64::NAN, 8.0, 8.0) - 1.2e-7).abs() < 1e-15);
    }

    #[test]
    fn test_find_pits_skips_nodata_neighbours() {
        let dem = array![
            [5.0, 5.0, 5.0, 5.0],
            [5.0, 1.0, 5.0, 5.0],
            [5.0, 5.0, 2.0, -1.0],
            [5.0, 5.0, 5.0, 5.0],
        ];
        assert_eq!(remaining_pits(&dem, -1.0), vec![(1, 1)]);
    }

    #[test]
    fn test_breach_cell_order() {
        let mut heap = BinaryHeap::new();
        heap.push(BreachCell { row: 0, column: 0, steps: 1, seq: 2, cost: 1.0 });
        heap.push(BreachCell { row: 0, column: 1, steps: 1, seq: 1, cost: 1.0 });
        heap.push(BreachCell { row: 0, column: 2, steps: 1, seq: 0, cost: 3.0 });
        assert_eq!(heap.pop().map(|c| c.column), Some(1));
        assert_eq!(heap.pop().map(|c| c.column), Some(0));
        assert_eq!(heap.pop().map(|c| c.column), Some(2));
    }
}
