//! Single band GeoTIFF reading and writing.
//!
//! Only the georeferencing a DEM workflow needs is handled: pixel scale and tie point (so
//! north-up rasters), the GeoKey directory, the GeoASCII citation and GDAL's no-data tag.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use num::{NumCast, ToPrimitive};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

use crate::error::{HydroError, Result};
use crate::raster::{Crs, GeoTransform, Raster};

const PROJECTED_CS_TYPE_KEY: u64 = 3072;
const GEOGRAPHIC_TYPE_KEY: u64 = 2048;

/// Cell types that can be stored in a GeoTIFF.
pub trait RasterElement: Copy + PartialEq + NumCast + ToPrimitive + Send + Sync + 'static {
    type Colour: ColorType<Inner = Self>;
}

impl RasterElement for u8 {
    type Colour = colortype::Gray8;
}

impl RasterElement for u16 {
    type Colour = colortype::Gray16;
}

impl RasterElement for u32 {
    type Colour = colortype::Gray32;
}

impl RasterElement for f32 {
    type Colour = colortype::Gray32Float;
}

impl RasterElement for f64 {
    type Colour = colortype::Gray64Float;
}

fn cast_cells<S: ToPrimitive + Copy, T: NumCast>(cells: Vec<S>) -> Option<Vec<T>> {
    cells.into_iter().map(|v| <T as NumCast>::from(v)).collect()
}

fn decoded_cells<T: RasterElement>(image: DecodingResult) -> Option<Vec<T>> {
    #[allow(unreachable_patterns)]
    match image {
        DecodingResult::U8(v) => cast_cells(v),
        DecodingResult::U16(v) => cast_cells(v),
        DecodingResult::U32(v) => cast_cells(v),
        DecodingResult::U64(v) => cast_cells(v),
        DecodingResult::I8(v) => cast_cells(v),
        DecodingResult::I16(v) => cast_cells(v),
        DecodingResult::I32(v) => cast_cells(v),
        DecodingResult::I64(v) => cast_cells(v),
        DecodingResult::F32(v) => cast_cells(v),
        DecodingResult::F64(v) => cast_cells(v),
        _ => None,
    }
}

/// EPSG code stored under the projected, or failing that the geographic, CS type key.
fn epsg_from_geokeys(gdir: &[u64]) -> u16 {
    let entries: Vec<&[u64]> = gdir.chunks_exact(4).skip(1).collect();
    [PROJECTED_CS_TYPE_KEY, GEOGRAPHIC_TYPE_KEY]
        .iter()
        .find_map(|&key| {
            entries
                .iter()
                .find(|e| e[0] == key && e[1] == 0)
                .and_then(|e| u16::try_from(e[3]).ok())
        })
        .unwrap_or(0)
}

/// Reads a single band GeoTIFF.
///
/// Returns the cells, the no-data value (the type's zero if the file has none), the EPSG
/// code, the GDAL style transform, the GeoKey directory and the GeoASCII params.  Cells stored
/// as another numeric type are cast to `T`; values that do not fit give
/// [`HydroError::UnsupportedDataType`].
pub fn rasterfile_to_array<T: RasterElement>(
    fname: &PathBuf,
) -> Result<(Array2<T>, T, u16, [f64; 6], Vec<u64>, String)> {
    let file = File::open(fname)?;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());
    let (width, height) = decoder.dimensions()?;

    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)?
        .ok_or(HydroError::MissingTag("ModelPixelScale"))?
        .into_f64_vec()?;
    let tie = decoder
        .find_tag(Tag::ModelTiepointTag)?
        .ok_or(HydroError::MissingTag("ModelTiepoint"))?
        .into_f64_vec()?;
    if scale.len() < 2 || tie.len() < 6 {
        return Err(HydroError::MissingTag("ModelPixelScale/ModelTiepoint"));
    }
    let geo = [
        tie[3] - tie[0] * scale[0],
        scale[0],
        0.0,
        tie[4] + tie[1] * scale[1],
        0.0,
        -scale[1],
    ];

    let gdir = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
        Some(v) => v.into_u64_vec()?,
        None => vec![],
    };
    let proj = match decoder.find_tag(Tag::GeoAsciiParamsTag)? {
        Some(v) => v.into_string()?.trim_end_matches('\0').to_string(),
        None => String::new(),
    };
    let nodata = match decoder.find_tag(Tag::GdalNodata)? {
        Some(v) => {
            let text = v.into_string()?;
            let value: f64 = text.trim_end_matches('\0').trim().parse().map_err(|_| {
                HydroError::UnsupportedDataType(format!("no-data value {text:?}"))
            })?;
            <T as NumCast>::from(value).ok_or_else(|| {
                HydroError::UnsupportedDataType(format!("no-data value {value} does not fit the cell type"))
            })?
        }
        None => <T as NumCast>::from(0).ok_or_else(|| HydroError::UnsupportedDataType("zero".into()))?,
    };

    let cells = decoded_cells::<T>(decoder.read_image()?).ok_or_else(|| {
        HydroError::UnsupportedDataType(format!("cells of {fname:?} do not fit the requested type"))
    })?;
    let data = Array2::from_shape_vec((height as usize, width as usize), cells)
        .map_err(|e| HydroError::UnsupportedDataType(e.to_string()))?;

    Ok((data, nodata, epsg_from_geokeys(&gdir), geo, gdir, proj))
}

/// Writes `data` as a single band GeoTIFF with its georeferencing and no-data tag.
///
/// `geo` is a GDAL style, north-up transform; `gdir` the GeoKey directory (stored as SHORTs)
/// and `proj` the GeoASCII params, both usually taken from the DEM that was read.
pub fn array_to_rasterfile<T: RasterElement>(
    data: &Array2<T>,
    nd: T,
    geo: &[f64; 6],
    gdir: &[u64],
    proj: &str,
    outfile: &PathBuf,
) -> Result<()>
where
    [T]: TiffValue,
{
    let (rows, columns) = data.dim();
    let width = u32::try_from(columns).map_err(|_| HydroError::invalid("columns", columns, "too many for a TIFF"))?;
    let height = u32::try_from(rows).map_err(|_| HydroError::invalid("rows", rows, "too many for a TIFF"))?;
    let keys: Vec<u16> = gdir
        .iter()
        .map(|&k| u16::try_from(k).map_err(|_| HydroError::invalid("gdir", k, "GeoKeys are 16 bit")))
        .collect::<Result<_>>()?;
    let nodata_text = nd
        .to_f64()
        .map(|v| v.to_string())
        .ok_or_else(|| HydroError::UnsupportedDataType("no-data value".into()))?;

    let file = BufWriter::new(File::create(outfile)?);
    let mut encoder = TiffEncoder::new(file)?;
    let mut image = encoder.new_image::<T::Colour>(width, height)?;
    {
        let dir = image.encoder();
        dir.write_tag(Tag::ModelPixelScaleTag, &[geo[1], -geo[5], 0.0][..])?;
        dir.write_tag(Tag::ModelTiepointTag, &[0.0, 0.0, 0.0, geo[0], geo[3], 0.0][..])?;
        if !keys.is_empty() {
            dir.write_tag(Tag::GeoKeyDirectoryTag, &keys[..])?;
        }
        if !proj.is_empty() {
            dir.write_tag(Tag::GeoAsciiParamsTag, proj)?;
        }
        dir.write_tag(Tag::GdalNodata, nodata_text.as_str())?;
    }
    let cells: Vec<T> = data.iter().copied().collect();
    image.write_data(&cells)?;
    Ok(())
}

impl<T: RasterElement> Raster<T> {
    /// Reads a GeoTIFF, see [`rasterfile_to_array`].
    pub fn read(path: &Path) -> Result<Self> {
        let (data, nodata, epsg, geo, geokeys, citation) = rasterfile_to_array::<T>(&path.to_path_buf())?;
        Ok(Raster {
            data,
            nodata,
            transform: GeoTransform::from_gdal(geo),
            crs: Crs { epsg, geokeys, citation },
        })
    }

    /// Writes a GeoTIFF, see [`array_to_rasterfile`].
    pub fn write(&self, path: &Path) -> Result<()>
    where
        [T]: TiffValue,
    {
        array_to_rasterfile(
            &self.data,
            self.nodata,
            &self.transform.to_gdal(),
            &self.crs.geokeys,
            &self.crs.citation,
            &path.to_path_buf(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_from_geokeys() {
        let gdir = [1u64, 1, 0, 7, 1024, 0, 1, 1, 1025, 0, 1, 1, 1026, 34737, 48, 0, 2049, 34737, 9, 48, 2054, 0, 1, 9102, 3072, 0, 1, 2193, 3076, 0, 1, 9001];
        assert_eq!(epsg_from_geokeys(&gdir), 2193);

        let geographic = [1u64, 1, 0, 1, 2048, 0, 1, 4326];
        assert_eq!(epsg_from_geokeys(&geographic), 4326);

        assert_eq!(epsg_from_geokeys(&[]), 0);
    }

    #[test]
    fn test_cast_cells() {
        assert_eq!(cast_cells::<f32, f64>(vec![1.5, 2.0]), Some(vec![1.5, 2.0]));
        assert_eq!(cast_cells::<f64, u8>(vec![1.0, 300.0]), None);
    }
}
