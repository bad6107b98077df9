#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use hydro_watershed::{snap_pour_point, GeoTransform, HydroError, Raster};
    use ndarray::Array2;

    /// 5x5 grid of 10 m cells with a stream down the middle column.
    fn channel() -> Raster<u8> {
        let streams = Array2::from_shape_fn((5, 5), |(_, c)| u8::from(c == 2));
        Raster::new(streams, 0).with_transform(GeoTransform::new(0.0, 50.0, 10.0, -10.0))
    }

    #[test]
    fn test_point_on_stream_stays() {
        let p = snap_pour_point((25.0, 25.0), &channel(), 0.0).unwrap();
        assert_eq!((p.row, p.col), (2, 2));
        assert_eq!(p.distance, 0.0);
        assert_eq!((p.x, p.y), (25.0, 25.0));
    }

    #[test]
    fn test_snaps_to_nearest_stream_cell() {
        let p = snap_pour_point((38.0, 24.0), &channel(), 20.0).unwrap();
        assert_eq!((p.row, p.col), (2, 2));
        assert_eq!(p.requested, (38.0, 24.0));
        assert_relative_eq!(p.distance, 13.0f64.hypot(1.0));
    }

    #[test]
    fn test_snapping_is_idempotent() {
        let streams = channel();
        let first = snap_pour_point((7.0, 41.0), &streams, 30.0).unwrap();
        let again = snap_pour_point((first.x, first.y), &streams, 30.0).unwrap();
        assert_eq!((again.row, again.col), (first.row, first.col));
        assert_eq!(again.distance, 0.0);
    }

    #[test]
    fn test_ties_go_to_lowest_row() {
        // halfway between the centres of (1, 2) and (2, 2)
        let p = snap_pour_point((25.0, 30.0), &channel(), 10.0).unwrap();
        assert_eq!((p.row, p.col), (1, 2));
    }

    #[test]
    fn test_sheared_grid_window() {
        // a row step also moves 10 east, so 100 map units span more than 10 columns
        let transform = GeoTransform::from_gdal([0.0, 10.0, 10.0, 0.0, 0.0, -10.0]);
        let mut streams = Array2::<u8>::zeros((10, 20));
        streams[[1, 14]] = 1;
        let streams = Raster::new(streams, 0).with_transform(transform);

        let from = transform.cell_center(8, 0);
        let p = snap_pour_point(from, &streams, 100.0).unwrap();
        assert_eq!((p.row, p.col), (1, 14));
        assert_relative_eq!(p.distance, 70.0f64.hypot(70.0));
    }

    #[test]
    fn test_too_far_fails() {
        match snap_pour_point((45.0, 25.0), &channel(), 10.0) {
            Err(HydroError::PourPointSnapFailure { x, y, max_distance }) => {
                assert_eq!((x, y, max_distance), (45.0, 25.0, 10.0));
            }
            other => panic!("expected a snap failure, got {other:?}"),
        }
        assert!(snap_pour_point((1000.0, -1000.0), &channel(), 20.0).is_err());

        let dry = Raster::new(Array2::<u8>::zeros((5, 5)), 0);
        assert!(matches!(
            snap_pour_point((2.5, -2.5), &dry, 100.0),
            Err(HydroError::PourPointSnapFailure { .. })
        ));
    }
}
