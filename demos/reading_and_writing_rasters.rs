use anyhow::Result;
use hydro_watershed::{rasterfile_to_array, Crs, GeoTransform, Raster};
use ndarray::{Array2, array};
use tempfile::NamedTempFile;

fn main() -> Result<()> {
    let dem: Array2<f64> = array![
        [10.0, 12.0, 10.0, 10.0],
        [12.0, 1.0,  10.0, 12.0],
        [10.0, 12.0, 10.0, 9.0],
    ];
    let crs = Crs {
        epsg: 2193,
        geokeys: vec![1, 1, 0, 7, 1024, 0, 1, 1, 1025, 0, 1, 1, 1026, 34737, 48, 0, 2049, 34737, 9, 48, 2054, 0, 1, 9102, 3072, 0, 1, 2193, 3076, 0, 1, 9001],
        citation: "NZGD2000 / New Zealand Transverse Mercator 2000|NZGD2000|".to_string(),
    };
    let raster = Raster::new(dem, -100.0)
        .with_transform(GeoTransform::new(1361171.0, 5006315.0, 8.0, -8.0))
        .with_crs(crs);

    let tmp = NamedTempFile::new()?;
    println!("Writing DEM to {:?}", tmp.path());
    raster.write(tmp.path())?;

    // the same file through the array level api
    let (data, nd, epsg, geo, _gdir, proj) = rasterfile_to_array::<f64>(&tmp.path().to_path_buf())?;
    println!("EPSG:{epsg} ({proj}), transform {geo:?}, no-data {nd}");
    println!("{data}");

    let back = Raster::<f64>::read(tmp.path())?;
    assert_eq!(back, raster);
    println!("Cell (1, 1) is centred at {:?}", back.transform.cell_center(1, 1));

    tmp.close()?;
    Ok(())
}
