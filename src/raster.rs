//! In-memory georeferenced rasters.
//!
//! A [`Raster`] is an `Array2` of cells with its no-data value, the affine transform that
//! places it on the ground and the GeoTIFF projection information it was read with.  Every
//! raster derived from a DEM keeps the DEM's grid, see [`Raster::derive`].

use ndarray::Array2;

use crate::error::{HydroError, Result};

/// True when `value` is the no-data sentinel.  A NaN sentinel matches every NaN cell.
#[allow(clippy::eq_op)]
pub fn is_nodata<T: PartialEq>(value: T, nodata: T) -> bool {
    // only NaN is unequal to itself
    value == nodata || (value != value && nodata != nodata)
}

/// Affine transform in GDAL order `[origin_x, pixel_width, row_rotation, origin_y,
/// col_rotation, pixel_height]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform, `pixel_height` is normally negative.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height,
        }
    }

    pub fn from_gdal(geo: [f64; 6]) -> Self {
        Self {
            origin_x: geo[0],
            pixel_width: geo[1],
            row_rotation: geo[2],
            origin_y: geo[3],
            col_rotation: geo[4],
            pixel_height: geo[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Horizontal resolution.
    pub fn resx(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Vertical resolution.
    pub fn resy(&self) -> f64 {
        self.pixel_height.abs()
    }

    /// Map coordinates of the centre of cell `(row, col)`.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let c = col as f64 + 0.5;
        let r = row as f64 + 0.5;
        (
            self.origin_x + c * self.pixel_width + r * self.row_rotation,
            self.origin_y + c * self.col_rotation + r * self.pixel_height,
        )
    }

    /// Fractional `(row, col)` of a map coordinate, `None` for a degenerate transform.
    pub fn to_cell(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-12 {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;
        Some((row, col))
    }

    /// Largest `(rows, cols)` offset a ground displacement of `distance` can span, rotated or
    /// sheared transforms included.  `None` for a degenerate transform.
    pub fn cell_reach(&self, distance: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-12 {
            return None;
        }
        // norms of the rows of the inverse matrix
        let rows = distance * self.col_rotation.hypot(self.pixel_width) / det.abs();
        let cols = distance * self.pixel_height.hypot(self.row_rotation) / det.abs();
        Some((rows, cols))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

/// Projection information carried through from the GeoTIFF keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Crs {
    /// EPSG code of the projected (or geographic) system, 0 when unknown.
    pub epsg: u16,
    /// Raw GeoKey directory.
    pub geokeys: Vec<u64>,
    /// GeoASCII params, e.g. `"NZGD2000 / New Zealand Transverse Mercator 2000|NZGD2000|"`.
    pub citation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    pub data: Array2<T>,
    pub nodata: T,
    pub transform: GeoTransform,
    pub crs: Crs,
}

impl<T: Copy + PartialEq> Raster<T> {
    /// A raster on the default unit grid with no projection.
    pub fn new(data: Array2<T>, nodata: T) -> Self {
        Self {
            data,
            nodata,
            transform: GeoTransform::default(),
            crs: Crs::default(),
        }
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    /// A new raster on this raster's grid holding `data`.
    pub fn derive<U: Copy + PartialEq>(&self, data: Array2<U>, nodata: U) -> Result<Raster<U>> {
        if data.dim() != self.data.dim() {
            return Err(HydroError::GridMismatch {
                expected: format!("{:?}", self.data.dim()),
                found: format!("{:?}", data.dim()),
            });
        }
        Ok(Raster {
            data,
            nodata,
            transform: self.transform,
            crs: self.crs.clone(),
        })
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn resx(&self) -> f64 {
        self.transform.resx()
    }

    pub fn resy(&self) -> f64 {
        self.transform.resy()
    }

    pub fn is_nodata(&self, row: usize, col: usize) -> bool {
        is_nodata(self.data[[row, col]], self.nodata)
    }

    /// Fails with [`HydroError::GridMismatch`] unless `other` has the same dimensions and
    /// transform.
    pub fn same_grid<U>(&self, other: &Raster<U>) -> Result<()> {
        let transforms_match = self
            .transform
            .to_gdal()
            .iter()
            .zip(other.transform.to_gdal().iter())
            .all(|(a, b)| (a - b).abs() <= 1e-9 * a.abs().max(1.0));
        if self.data.dim() != other.data.dim() || !transforms_match {
            return Err(HydroError::GridMismatch {
                expected: format!("{:?} {:?}", self.data.dim(), self.transform.to_gdal()),
                found: format!("{:?} {:?}", other.data.dim(), other.transform.to_gdal()),
            });
        }
        Ok(())
    }
}
