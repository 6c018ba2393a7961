//! Windowed band access.
//!
//! `BandSource` is a single-band raster that can read an arbitrary pixel
//! window; `BandOpener` turns an asset href into one. The GDAL-backed pair
//! lives in `io::gdal`; tests supply in-memory implementations.
use tracing::debug;

use crate::core::grid::{Affine, BBox, Crs, PixelWindow, RasterGrid};
use crate::error::Result;
use crate::io::projection::Projector;

pub trait BandSource {
    fn crs(&self) -> &Crs;

    /// Geotransform of the full raster.
    fn transform(&self) -> Affine;

    /// (cols, rows) of the full raster.
    fn size(&self) -> (usize, usize);

    /// Read `window` into a grid whose transform is already translated to the window origin.
    fn read_window(&self, window: PixelWindow) -> Result<RasterGrid>;
}

/// Opens band sources by href. Shared across the parallel band reads of a scene.
pub trait BandOpener: Sync {
    fn open(&self, href: &str) -> Result<Box<dyn BandSource>>;
}

/// Read the part of `source` covering `bbox_wgs84`.
///
/// The bounding box is reprojected into the band CRS (densified edges), the
/// minimal covering pixel window is computed and clipped to the raster extent,
/// and only that window is read. A window that misses the raster yields an
/// empty grid.
pub fn read_band_window(source: &dyn BandSource, bbox_wgs84: &BBox) -> Result<RasterGrid> {
    let projector = Projector::new(&Crs::wgs84(), source.crs())?;
    let native_bbox = projector.transform_bounds(bbox_wgs84)?;
    let (cols, rows) = source.size();
    let window = PixelWindow::covering(&native_bbox, &source.transform(), cols, rows)?;
    debug!(
        "Window {}x{} at ({}, {}) of {}x{} raster",
        window.cols, window.rows, window.col_off, window.row_off, cols, rows
    );
    if window.is_empty() {
        let origin = source
            .transform()
            .translated(window.col_off as f64, window.row_off as f64);
        return Ok(RasterGrid::empty(origin, source.crs().clone()));
    }
    source.read_window(window)
}
