//! Shaded relief for map backdrops.

use ndarray::{Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::d8::neighbour;
use crate::error::Result;
use crate::raster::{is_nodata, Raster};

/// No-data value of hillshade rasters.
pub const HILLSHADE_NODATA: f64 = -1.0;

/// Illumination settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillshadeParams {
    /// Sun azimuth in degrees clockwise from north.
    pub azimuth: f64,
    /// Sun altitude in degrees above the horizon.
    pub altitude: f64,
    pub z_factor: f64,
}

impl Default for HillshadeParams {
    fn default() -> Self {
        Self {
            azimuth: 315.0,
            altitude: 45.0,
            z_factor: 1.0,
        }
    }
}

/// Hillshade of `dem` in `0..=255` using Horn's gradients.
///
/// Neighbours outside the grid or with no-data take the centre cell's elevation.  No-data
/// cells get [`HILLSHADE_NODATA`], which is also returned as the second element.
pub fn hillshade(
    dem: &Array2<f64>, nodata: f64, resx: f64, resy: f64, params: &HillshadeParams
) -> (Array2<f64>, f64)
{
    let (rows, columns) = dem.dim();
    let azimuth = (360.0 - params.azimuth + 90.0).to_radians();
    let zenith = (90.0 - params.altitude).to_radians();
    let (sin_zenith, cos_zenith) = zenith.sin_cos();

    let mut shade = Array2::<f64>::zeros((rows, columns));
    shade
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(row, mut line)| {
            for col in 0..columns {
                let z = dem[[row, col]];
                if is_nodata(z, nodata) {
                    line[col] = HILLSHADE_NODATA;
                    continue;
                }
                // window values indexed like the D8 offsets: NE, E, SE, S, SW, W, NW, N
                let mut w = [z; 8];
                for (n, v) in w.iter_mut().enumerate() {
                    if let Some((rn, cn)) = neighbour(row, col, n, rows, columns) {
                        let zn = dem[[rn, cn]];
                        if !is_nodata(zn, nodata) {
                            *v = zn * params.z_factor;
                            continue;
                        }
                    }
                    *v = z * params.z_factor;
                }
                let [ne, e, se, s, sw, wst, nw, nth] = w;
                let dz_dx = ((ne + 2.0 * e + se) - (nw + 2.0 * wst + sw)) / (8.0 * resx);
                let dz_dy = ((sw + 2.0 * s + se) - (nw + 2.0 * nth + ne)) / (8.0 * resy);

                let slope = dz_dx.hypot(dz_dy).atan();
                let aspect = if dz_dx == 0.0 && dz_dy == 0.0 {
                    0.0
                } else {
                    dz_dy.atan2(-dz_dx)
                };
                let value = cos_zenith * slope.cos() + sin_zenith * slope.sin() * (azimuth - aspect).cos();
                line[col] = (value.clamp(0.0, 1.0) * 255.0).round();
            }
        });

    (shade, HILLSHADE_NODATA)
}

/// Hillshade stage on the DEM's grid.
pub fn shaded_relief(dem: &Raster<f64>, params: &HillshadeParams) -> Result<Raster<f64>> {
    let (shade, nd) = hillshade(&dem.data, dem.nodata, dem.resx(), dem.resy(), params);
    dem.derive(shade, nd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_flat_and_nodata() {
        let dem = array![[5.0, 5.0, 5.0], [5.0, 5.0, 5.0], [5.0, 5.0, -1.0]];
        let (shade, nd) = hillshade(&dem, -1.0, 10.0, 10.0, &HillshadeParams::default());
        assert_eq!(nd, HILLSHADE_NODATA);
        assert_eq!(shade[[1, 1]], 180.0);
        assert_eq!(shade[[2, 2]], HILLSHADE_NODATA);
    }

    #[test]
    fn test_slopes_facing_the_sun_are_brighter() {
        let rising_east = array![[1.0, 2.0, 3.0], [1.0, 2.0, 3.0], [1.0, 2.0, 3.0]];
        let falling_east = rising_east.mapv(|z| 4.0 - z);
        let params = HillshadeParams::default();
        let (west_facing, _) = hillshade(&rising_east, -1.0, 1.0, 1.0, &params);
        let (east_facing, _) = hillshade(&falling_east, -1.0, 1.0, 1.0, &params);
        assert!(west_facing[[1, 1]] > 180.0);
        assert!(east_facing[[1, 1]] < 180.0);
    }
}
