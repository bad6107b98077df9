use anyhow::Result;
use hydro_watershed::{breach_depressions, fill_depressions, remaining_pits};
use ndarray::{Array2, array};

fn main() -> Result<()> {
    let mut dem: Array2<f64> = array![
        [5.0, 5.0, 4.0, 4.0, 4.0, 3.0],
        [5.0, 5.0, 4.5, 2.0, 3.0, 2.0],
        [5.0, 3.0, 4.5, 4.0, 4.0, 3.0],
        [5.0, 4.0, 4.5, 4.0, 4.0, 3.0],
        [5.0, 1.0, 3.0, 4.0, 4.0, 3.0],
    ];
    let nd = -10.0;

    let n = breach_depressions(&mut dem, nd, 1.0, 1.0, 10);
    println!("Number of pits left is {n}");
    println!("Dem is now {dem:?}");

    if n > 0 {
        fill_depressions(&mut dem, nd, 1.0, 1.0, true);
        println!("After filling, pits at {:?}", remaining_pits(&dem, nd));
    }

    Ok(())
}
