#[cfg(test)]
mod tests {
    use hydro_watershed::{
        d8_flow_accumulation, flow_accumulation, flow_directions, is_nodata, resolve_depressions, DepressionParams,
        GeoTransform, HydroError, Raster, ACCUM_NODATA,
    };
    use ndarray::{Array2, array};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_converging_flow() {
        let d8: Array2<u8> = array![
            [4, 8, 16],
            [2, 8, 32],
            [2, 0, 32],
        ];
        let (acc, nd) = d8_flow_accumulation(&d8, 255).unwrap();
        assert_eq!(nd, ACCUM_NODATA);
        assert_eq!(acc, array![
            [1.0, 1.0, 1.0],
            [1.0, 6.0, 1.0],
            [1.0, 9.0, 1.0],
        ]);
    }

    #[test]
    fn test_nodata_stops_flow() {
        let d8: Array2<u8> = array![[2, 255, 2, 0]];
        let (acc, _) = d8_flow_accumulation(&d8, 255).unwrap();
        assert_eq!(acc, array![[1.0, ACCUM_NODATA, 1.0, 2.0]]);
    }

    #[test]
    fn test_cycle_is_an_error() {
        let d8: Array2<u8> = array![[2, 32, 0]];
        match d8_flow_accumulation(&d8, 255) {
            Err(HydroError::CyclicFlow { row, col }) => assert_eq!((row, col), (0, 0)),
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_code() {
        let d8: Array2<u8> = array![[2, 3, 0]];
        assert!(matches!(
            d8_flow_accumulation(&d8, 255),
            Err(HydroError::InvalidFlowCode { row: 0, col: 1, code: 3 })
        ));
    }

    #[test]
    fn test_outlet_collects_closed_basin() {
        // a valley draining south down the middle column
        let dem = Raster::new(
            Array2::from_shape_fn((5, 5), |(r, c)| 10.0 + (c as f64 - 2.0).abs() * 2.0 - r as f64),
            -9999.0,
        );
        let dirs = flow_directions(&dem).unwrap();
        let acc = flow_accumulation(&dirs.pointer).unwrap();
        assert_eq!(acc.data[[4, 2]], 25.0);

        // accumulation never drops going downstream
        let (rows, cols) = acc.shape();
        for ((row, col), &a) in acc.data.indexed_iter() {
            if let Some((rn, cn)) = hydro_watershed::d8::downstream(row, col, dirs.pointer.data[[row, col]], rows, cols) {
                assert!(acc.data[[rn, cn]] > a);
            }
        }
    }

    fn noisy_dem(seed: u64, nodata: f64) -> Raster<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = Array2::from_shape_fn((12, 15), |_| {
            if rng.gen_bool(0.05) { nodata } else { rng.gen_range(0.0..100.0) }
        });
        Raster::new(data, nodata).with_transform(GeoTransform::new(0.0, 120.0, 10.0, -10.0))
    }

    #[test]
    fn test_resolved_noise_routes_without_cycles() {
        for seed in 0..8 {
            let nodata = if seed % 2 == 0 { f64::NAN } else { -9999.0 };
            let dem = noisy_dem(seed, nodata);
            let resolved = resolve_depressions(&dem, &DepressionParams::default()).unwrap();
            let dirs = flow_directions(&resolved.dem).unwrap();
            assert!(dirs.unresolved.is_empty(), "seed {seed}: {:?}", dirs.unresolved);

            let acc = flow_accumulation(&dirs.pointer).unwrap();
            let cells = dem.data.iter().filter(|&&z| !is_nodata(z, nodata)).count();
            let max = acc.data.iter().copied().filter(|&a| a != ACCUM_NODATA).fold(0.0, f64::max);
            assert!(max >= 1.0 && max <= cells as f64, "seed {seed}");
        }
    }
}
