#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use hydro_watershed::{fill_depressions, remaining_pits, small_num};
    use ndarray::{Array2, array};

    fn crater() -> Array2<f64> {
        array![
            [10.0, 12.0, 10.0],
            [12.0,  9.0, 12.0],
            [10.0, 12.0, 10.0],
        ]
    }

    #[test]
    fn test_fill_to_spill_height() {
        let mut dem = crater();
        fill_depressions(&mut dem, -3.0, 8.0, 8.0, false);
        assert_eq!(dem, array![
            [10.0, 12.0, 10.0],
            [12.0, 10.0, 12.0],
            [10.0, 12.0, 10.0],
        ]);
    }

    #[test]
    fn test_fill_and_fix_flats() {
        let mut dem = crater();
        let ep = small_num(&dem, -3.0, 8.0, 8.0);
        assert_abs_diff_eq!(ep, 0.0000012, epsilon = 1e-15);

        fill_depressions(&mut dem, -3.0, 8.0, 8.0, true);
        assert_abs_diff_eq!(dem[[1, 1]], 10.0 + ep, epsilon = 1e-12);
        // the rim is untouched
        assert_eq!(dem[[0, 1]], 12.0);
        assert_eq!(dem[[0, 0]], 10.0);
        assert!(remaining_pits(&dem, -3.0).is_empty());
    }

    #[test]
    fn test_no_pits_no_change() {
        let mut dem: Array2<f64> = array![
            [5.0, 4.0, 3.0],
            [5.0, 4.0, 3.0],
            [5.0, 4.0, 3.0],
        ];
        let orig = dem.clone();
        fill_depressions(&mut dem, -1.0, 8.0, 8.0, true);
        assert_eq!(dem, orig);
    }

    #[test]
    fn test_cell_next_to_nodata_is_an_outlet() {
        let nd = -1.0;
        let mut dem: Array2<f64> = array![
            [9.0, 9.0,  nd, 9.0, 9.0],
            [9.0, 9.0, 3.0, 9.0, 9.0],
            [9.0, 9.0, 1.0, 9.0, 9.0],
            [9.0, 9.0, 9.0, 9.0, 9.0],
            [9.0, 9.0, 9.0, 9.0, 9.0],
        ];
        let ep = small_num(&dem, nd, 8.0, 8.0);
        let mut expected = dem.clone();
        expected[[2, 2]] = 3.0 + ep;

        fill_depressions(&mut dem, nd, 8.0, 8.0, true);
        for (x, y) in dem.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_nested_depressions_fill_to_lowest_rim() {
        let mut dem: Array2<f64> = array![
            [10.0, 10.0, 10.0, 10.0, 10.0, 10.0],
            [10.0,  4.0,  6.0,  3.0,  7.0, 10.0],
            [10.0, 10.0, 10.0, 10.0, 10.0,  8.0],
        ];
        fill_depressions(&mut dem, -1.0, 8.0, 8.0, false);
        // the first pit spills into the second, and both then spill over the 8 on the edge
        assert_eq!(dem, array![
            [10.0, 10.0, 10.0, 10.0, 10.0, 10.0],
            [10.0,  8.0,  8.0,  8.0,  8.0, 10.0],
            [10.0, 10.0, 10.0, 10.0, 10.0,  8.0],
        ]);
    }
}
