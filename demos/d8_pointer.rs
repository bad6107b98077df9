use anyhow::Result;
use hydro_watershed::{d8_pointer, flow_accumulation, flow_directions, resolve_depressions, DepressionParams, Raster};
use ndarray::{Array2, array};

fn main() -> Result<()> {
    let dem: Array2<f64> = array![
        [2.0, 3.0, 3.0, 7.0],
        [3.0, 5.0, 4.0, 2.0],
        [5.0, 6.0, 8.0, 0.0],
    ];
    let nd: f64 = -100.0;
    println!("Running d8 on {dem}");
    let (d8, _d8_nd) = d8_pointer(&dem, nd, 8.0, 8.0);
    println!("d8 is {d8}");

    // the same through the raster stages, with conditioning first
    let raster = Raster::new(dem, nd);
    let resolved = resolve_depressions(&raster, &DepressionParams::default())?;
    let dirs = flow_directions(&resolved.dem)?;
    println!("undefined interior cells: {:?}", dirs.unresolved);
    let acc = flow_accumulation(&dirs.pointer)?;
    println!("accumulation is {}", acc.data);

    Ok(())
}
