use std::path::Path;

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use tracing::info;

use crate::core::grid::RasterGrid;
use crate::error::Result;

/// Write a grid as a single-band Float64 GeoTIFF. Masked cells become NaN,
/// which is also declared as the band nodata value.
pub fn write_index_tiff(output: &Path, grid: &RasterGrid) -> Result<Dataset> {
    let (rows, cols) = grid.shape();
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut ds = driver.create_with_band_type::<f64, _>(output, cols, rows, 1)?;
    ds.set_geo_transform(&grid.transform.coefficients())?;
    if grid.crs.is_defined() {
        let srs = SpatialRef::from_definition(grid.crs.as_str())?;
        ds.set_spatial_ref(&srs)?;
    }

    let data: Vec<f64> = grid
        .data
        .iter()
        .zip(grid.mask.iter())
        .map(|(&v, &m)| if m { f64::NAN } else { v })
        .collect();
    let mut buf = Buffer::new((cols, rows), data);
    let mut band = ds.rasterband(1)?;
    band.set_no_data_value(Some(f64::NAN))?;
    band.write((0, 0), (cols, rows), &mut buf)?;
    info!("Wrote GeoTIFF {:?} ({}x{})", output, cols, rows);
    Ok(ds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::{Affine, Crs};
    use ndarray::array;

    #[test]
    fn test_masked_cells_written_as_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ndvi.tif");
        let grid = RasterGrid::new(
            array![[0.1, 0.2], [0.3, 0.4]],
            array![[false, true], [false, false]],
            Affine::north_up(500_000.0, 4_600_000.0, 10.0, -10.0),
            Crs::from_epsg(32631),
        )
        .unwrap();
        drop(write_index_tiff(&path, &grid).unwrap());

        let ds = Dataset::open(&path).unwrap();
        assert_eq!(ds.raster_size(), (2, 2));
        assert_eq!(ds.geo_transform().unwrap(), grid.transform.coefficients());
        let band = ds.rasterband(1).unwrap();
        let buf = band.read_as::<f64>((0, 0), (2, 2), (2, 2), None).unwrap();
        let values = buf.data();
        assert_eq!(values[0], 0.1);
        assert!(values[1].is_nan());
        assert_eq!(values[3], 0.4);
    }
}
