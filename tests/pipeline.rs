#[cfg(test)]
mod tests {
    use anyhow::Result;
    use hydro_watershed::{run_pipeline, GeoTransform, HillshadeParams, HydroError, PipelineConfig, Raster};
    use ndarray::Array2;

    fn valley() -> Raster<f64> {
        // drains south down column 2, with a pit dug into the channel at (2, 2)
        let mut data = Array2::from_shape_fn((5, 5), |(r, c)| 10.0 + (c as f64 - 2.0).abs() * 2.0 - r as f64);
        data[[2, 2]] = 5.0;
        Raster::new(data, -9999.0).with_transform(GeoTransform::new(1000.0, 2050.0, 10.0, -10.0))
    }

    fn config() -> PipelineConfig {
        PipelineConfig::from_json(r#"{
            "stream_threshold": 4,
            "snap_distance": 15.0,
            "pour_points": [[1027.0, 2006.0]]
        }"#)
        .unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = config();
        assert_eq!(config.breach_distance, 100);
        assert!(config.fill);
        assert_eq!(config.max_unresolved, 0);
        assert_eq!(config.hillshade, HillshadeParams::default());
        assert_eq!(config.pour_points, vec![[1027.0, 2006.0]]);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        // the threshold has no default
        assert!(matches!(
            PipelineConfig::from_json(r#"{"snap_distance": 1.0, "pour_points": [[0.0, 0.0]]}"#),
            Err(HydroError::Json(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json(r#"{"stream_threshold": 5, "snap_distance": 1.0, "pour_points": [[0.0, 0.0]], "colour": 1}"#),
            Err(HydroError::Json(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json(r#"{"stream_threshold": 0, "snap_distance": 1.0, "pour_points": [[0.0, 0.0]]}"#),
            Err(HydroError::InvalidParameter { name: "stream_threshold", .. })
        ));
        assert!(matches!(
            PipelineConfig::from_json(r#"{"stream_threshold": 5, "snap_distance": -1.0, "pour_points": [[0.0, 0.0]]}"#),
            Err(HydroError::InvalidParameter { name: "snap_distance", .. })
        ));
        assert!(matches!(
            PipelineConfig::from_json(r#"{"stream_threshold": 5, "snap_distance": 1.0, "pour_points": []}"#),
            Err(HydroError::InvalidParameter { name: "pour_points", .. })
        ));
    }

    #[test]
    fn test_config_from_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{
            "breach_distance": 0,
            "fill": true,
            "stream_threshold": 4,
            "snap_distance": 15.0,
            "pour_points": [[1027.0, 2006.0]],
            "hillshade": {"azimuth": 270.0}
        }"#)?;
        let config = PipelineConfig::from_path(&path)?;
        assert_eq!(config.breach_distance, 0);
        assert_eq!(config.hillshade.azimuth, 270.0);
        assert_eq!(config.hillshade.altitude, 45.0);
        Ok(())
    }

    #[test]
    fn test_end_to_end() -> Result<()> {
        let dem = valley();
        let out = run_pipeline(&dem, &config())?;

        // input untouched, the pit is gone from the conditioned copy
        assert_eq!(dem.data[[2, 2]], 5.0);
        assert!(out.conditioned.data[[2, 2]] > 5.0);

        let p = out.pour_points[0];
        assert_eq!((p.row, p.col), (4, 2));
        assert_eq!(out.accumulation.data[[4, 2]], 25.0);
        assert_eq!(out.streams.data[[4, 2]], 1);
        assert!(out.watershed.data.iter().all(|&m| m == 1));

        for raster in [&out.conditioned, &out.accumulation, &out.hillshade] {
            assert_eq!(raster.transform, dem.transform);
            assert_eq!(raster.shape(), dem.shape());
        }
        assert_eq!(out.flow_direction.transform, dem.transform);
        assert!(!out.stream_links.is_empty());
        Ok(())
    }

    #[test]
    fn test_unresolvable_pit_aborts() {
        let config = PipelineConfig {
            breach_distance: 0,
            fill: false,
            ..config()
        };
        assert!(matches!(
            run_pipeline(&valley(), &config),
            Err(HydroError::UnresolvedDepression { row: 2, col: 2, count: 1 })
        ));
    }

    #[test]
    fn test_pour_point_off_the_network() {
        let config = PipelineConfig {
            pour_points: vec![[1005.0, 2045.0]],
            snap_distance: 5.0,
            ..config()
        };
        assert!(matches!(
            run_pipeline(&valley(), &config),
            Err(HydroError::PourPointSnapFailure { .. })
        ));
    }

    #[test]
    fn test_save_outputs() -> Result<()> {
        let out = run_pipeline(&valley(), &config())?;
        let dir = tempfile::tempdir()?;
        out.save(dir.path())?;

        for name in [
            "conditioned_dem.tif",
            "d8_pointer.tif",
            "flow_accumulation.tif",
            "streams.tif",
            "watershed.tif",
            "hillshade.tif",
            "streams.geojson",
            "pour_points.geojson",
        ] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }

        let d8 = Raster::<u8>::read(&dir.path().join("d8_pointer.tif"))?;
        assert_eq!(d8.data, out.flow_direction.data);
        assert_eq!(d8.nodata, out.flow_direction.nodata);
        assert_eq!(d8.transform, out.flow_direction.transform);

        let points: geojson::GeoJson = std::fs::read_to_string(dir.path().join("pour_points.geojson"))?.parse()?;
        let geojson::GeoJson::FeatureCollection(fc) = points else {
            panic!("expected a feature collection");
        };
        assert_eq!(fc.features.len(), 1);
        Ok(())
    }
}
