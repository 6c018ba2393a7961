use gdal::raster::ResampleAlg;
use gdal::{Dataset, errors::GdalError as GdalCrateError};
use ndarray::Array2;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::grid::{Affine, Crs, PixelWindow, RasterGrid};
use crate::error::Result;
use crate::io::band::{BandOpener, BandSource};

/// Errors encountered when using the GDAL band reader
#[derive(Debug, Error)]
pub enum GdalError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Unsupported raster: {0}")]
    Unsupported(String),
    #[error("Dimension mismatch: expected {0}x{1}, got {2} samples")]
    DimensionMismatch(usize, usize, usize),
}

/// Metadata of one raster band
#[derive(Debug, Clone)]
struct GdalBandMetadata {
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: [f64; 6],
    /// `EPSG:xxxx` when the WKT carries an EPSG authority, the raw WKT otherwise
    pub projection: Crs,
    pub nodata: Option<f64>,
}

/// Single-band raster opened through GDAL, read one window at a time
pub struct GdalBandSource {
    dataset: Dataset,
    metadata: GdalBandMetadata,
}

// Helper to extract EPSG code from WKT authority tag
fn parse_epsg(wkt: &str) -> Option<String> {
    const KEY: &str = "AUTHORITY[\"EPSG\",\"";
    let idx = wkt.rfind(KEY)?;
    let start = idx + KEY.len();
    let end = wkt[start..].find('"')?;
    Some(format!("EPSG:{}", &wkt[start..start + end]))
}

/// Map an asset href onto a GDAL virtual file system path.
pub fn vsi_path(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        format!("/vsicurl/{}", href)
    } else if let Some(rest) = href.strip_prefix("s3://") {
        format!("/vsis3/{}", rest)
    } else {
        href.to_string()
    }
}

impl GdalBandSource {
    /// Open band 1 of a GDAL-supported raster (local path or `/vsi*` path)
    pub fn open(path: &str) -> std::result::Result<Self, GdalError> {
        let dataset = Dataset::open(path)?;
        if dataset.raster_count() == 0 {
            return Err(GdalError::Unsupported(format!("{}: no raster bands", path)));
        }
        let (size_x, size_y) = dataset.raster_size();
        let geotransform = dataset
            .geo_transform()
            .map_err(|_| GdalError::Unsupported(format!("{}: no geotransform", path)))?;
        let proj = dataset.projection();
        let projection = if proj.starts_with("EPSG:") {
            Crs::new(proj)
        } else if let Some(code) = parse_epsg(&proj) {
            Crs::new(code)
        } else {
            Crs::new(proj)
        };
        let nodata = dataset.rasterband(1)?.no_data_value();
        debug!(
            "Opened {}: {}x{}, crs {}, nodata {:?}",
            path, size_x, size_y, projection, nodata
        );
        Ok(GdalBandSource {
            dataset,
            metadata: GdalBandMetadata {
                size_x,
                size_y,
                geotransform,
                projection,
                nodata,
            },
        })
    }

    fn read_array(&self, window: PixelWindow) -> std::result::Result<Array2<f64>, GdalError> {
        let band = self.dataset.rasterband(1)?;
        let size = (window.cols, window.rows);
        let buf = band.read_as::<f64>(
            (window.col_off as isize, window.row_off as isize),
            size,
            size,
            Some(ResampleAlg::NearestNeighbour),
        )?;
        let data_vec = buf.data().to_vec();
        let len = data_vec.len();
        Array2::from_shape_vec((window.rows, window.cols), data_vec)
            .map_err(|_| GdalError::DimensionMismatch(window.cols, window.rows, len))
    }
}

impl BandSource for GdalBandSource {
    fn crs(&self) -> &Crs {
        &self.metadata.projection
    }

    fn transform(&self) -> Affine {
        Affine::new(self.metadata.geotransform)
    }

    fn size(&self) -> (usize, usize) {
        (self.metadata.size_x, self.metadata.size_y)
    }

    fn read_window(&self, window: PixelWindow) -> Result<RasterGrid> {
        let data = self.read_array(window)?;
        Ok(RasterGrid::from_samples(
            data,
            self.metadata.nodata,
            self.transform()
                .translated(window.col_off as f64, window.row_off as f64),
            self.metadata.projection.clone(),
        ))
    }
}

/// Opens remote or local band assets through GDAL
#[derive(Debug, Default, Clone, Copy)]
pub struct GdalBandOpener;

impl GdalBandOpener {
    /// Configure GDAL for range reads of remote cloud-optimized GeoTIFFs.
    pub fn new() -> Result<Self> {
        gdal::config::set_config_option("GDAL_DISABLE_READDIR_ON_OPEN", "EMPTY_DIR")?;
        gdal::config::set_config_option("CPL_VSIL_CURL_ALLOWED_EXTENSIONS", ".tif,.tiff")?;
        gdal::config::set_config_option("GDAL_HTTP_MULTIRANGE", "YES")?;
        gdal::config::set_config_option("AWS_NO_SIGN_REQUEST", "YES")?;
        info!("GDAL configured for remote COG access");
        Ok(GdalBandOpener)
    }
}

impl BandOpener for GdalBandOpener {
    fn open(&self, href: &str) -> Result<Box<dyn BandSource>> {
        let source = GdalBandSource::open(&vsi_path(href))?;
        Ok(Box::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::BBox;
    use crate::io::band::read_band_window;
    use crate::io::writers::tiff::write_index_tiff;

    #[test]
    fn test_vsi_path_mapping() {
        assert_eq!(
            vsi_path("https://example.com/B04.tif"),
            "/vsicurl/https://example.com/B04.tif"
        );
        assert_eq!(vsi_path("s3://bucket/key/B08.tif"), "/vsis3/bucket/key/B08.tif");
        assert_eq!(vsi_path("/data/B04.tif"), "/data/B04.tif");
    }

    #[test]
    fn test_parse_epsg_from_wkt() {
        let wkt = r#"PROJCS["WGS 84 / UTM zone 31N",GEOGCS["WGS 84"],AUTHORITY["EPSG","32631"]]"#;
        assert_eq!(parse_epsg(wkt).as_deref(), Some("EPSG:32631"));
        assert_eq!(parse_epsg("LOCAL_CS[\"x\"]"), None);
    }

    #[test]
    fn test_window_read_from_written_geotiff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("band.tif");
        let data = Array2::from_shape_fn((8, 8), |(r, c)| (r * 8 + c) as f64);
        let grid = RasterGrid::from_samples(
            data,
            None,
            Affine::north_up(10.0, 20.0, 0.5, -0.5),
            Crs::wgs84(),
        );
        write_index_tiff(&path, &grid).unwrap();

        let source = GdalBandOpener.open(path.to_str().unwrap()).unwrap();
        assert_eq!(source.size(), (8, 8));
        assert_eq!(source.crs(), &Crs::wgs84());
        let window = read_band_window(source.as_ref(), &BBox::new(11.0, 18.0, 12.0, 19.0)).unwrap();
        assert_eq!(window.shape(), (2, 2));
        assert_eq!(window.data[[0, 0]], 2.0 * 8.0 + 2.0);
    }
}
