//! Georeferenced raster grids: the affine pixel→CRS mapping, bounding boxes,
//! pixel windows, and `RasterGrid`, a 2D array of samples with its validity mask.
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::SpectralIndex;

/// Coordinate reference system definition (`EPSG:xxxx`, WKT, or PROJ string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs(String);

impl Crs {
    pub fn new(definition: impl Into<String>) -> Self {
        let def: String = definition.into();
        let trimmed = def.trim();
        match (trimmed.get(..5), trimmed.get(5..)) {
            (Some(prefix), Some(code)) if !code.is_empty() && prefix.eq_ignore_ascii_case("epsg:") => {
                Crs(format!("EPSG:{}", code))
            }
            _ => Crs(trimmed.to_string()),
        }
    }

    pub fn from_epsg(code: u32) -> Self {
        Crs(format!("EPSG:{}", code))
    }

    pub fn wgs84() -> Self {
        Crs::from_epsg(4326)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_defined(&self) -> bool {
        !self.0.is_empty()
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned bounding box in some CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Envelope of a set of points; `None` for an empty set.
    pub fn from_points<I: IntoIterator<Item = (f64, f64)>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let mut bbox = BBox::new(x0, y0, x0, y0);
        for (x, y) in iter {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// True when `other` lies inside `self`, allowing `tolerance` on every edge.
    pub fn contains_bbox(&self, other: &BBox, tolerance: f64) -> bool {
        other.min_x >= self.min_x - tolerance
            && other.min_y >= self.min_y - tolerance
            && other.max_x <= self.max_x + tolerance
            && other.max_y <= self.max_y + tolerance
    }

    /// `[min_x, min_y, max_x, max_y]`, the order used for STAC and JSON payloads.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

/// Affine geotransform in GDAL coefficient order:
/// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
///
/// `x = gt[0] + col * gt[1] + row * gt[2]`, `y = gt[3] + col * gt[4] + row * gt[5]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine(pub [f64; 6]);

impl Affine {
    pub fn new(gt: [f64; 6]) -> Self {
        Affine(gt)
    }

    /// North-up transform with square-free pixel sizes (`pixel_height` is usually negative).
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Affine([origin_x, pixel_width, 0.0, origin_y, 0.0, pixel_height])
    }

    pub fn coefficients(&self) -> [f64; 6] {
        self.0
    }

    /// Map a (possibly fractional) pixel position to CRS coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let gt = &self.0;
        (
            gt[0] + col * gt[1] + row * gt[2],
            gt[3] + col * gt[4] + row * gt[5],
        )
    }

    pub fn determinant(&self) -> f64 {
        self.0[1] * self.0[5] - self.0[2] * self.0[4]
    }

    /// Inverse mapping (CRS → pixel); `None` when the transform is singular.
    pub fn inverse(&self) -> Option<Affine> {
        let gt = &self.0;
        let det = self.determinant();
        if !det.is_finite() || det.abs() < 1e-300 {
            return None;
        }
        let i1 = gt[5] / det;
        let i2 = -gt[2] / det;
        let i4 = -gt[4] / det;
        let i5 = gt[1] / det;
        let i0 = -(i1 * gt[0] + i2 * gt[3]);
        let i3 = -(i4 * gt[0] + i5 * gt[3]);
        Some(Affine([i0, i1, i2, i3, i4, i5]))
    }

    /// Transform of a sub-window starting at (`col_off`, `row_off`).
    pub fn translated(&self, col_off: f64, row_off: f64) -> Affine {
        let (x, y) = self.apply(col_off, row_off);
        let gt = &self.0;
        Affine([x, gt[1], gt[2], y, gt[4], gt[5]])
    }

    /// Pixel terms divided by `factor`, origin unchanged.
    pub fn scaled(&self, factor: usize) -> Affine {
        let f = factor as f64;
        let gt = &self.0;
        Affine([gt[0], gt[1] / f, gt[2] / f, gt[3], gt[4] / f, gt[5] / f])
    }

    /// Envelope of a `rows x cols` grid under this transform.
    pub fn bounds(&self, rows: usize, cols: usize) -> BBox {
        let (r, c) = (rows as f64, cols as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(c, 0.0),
            self.apply(0.0, r),
            self.apply(c, r),
        ];
        BBox::from_points(corners).unwrap_or(BBox::new(0.0, 0.0, 0.0, 0.0))
    }
}

/// Integer pixel window: offset and size in the source raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub cols: usize,
    pub rows: usize,
}

impl PixelWindow {
    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }

    /// Minimal window covering `bbox` (already in the raster CRS) under `transform`,
    /// clipped to a `raster_cols x raster_rows` raster.
    pub fn covering(
        bbox: &BBox,
        transform: &Affine,
        raster_cols: usize,
        raster_rows: usize,
    ) -> Result<PixelWindow> {
        let inverse = transform
            .inverse()
            .ok_or_else(|| Error::geometry("singular raster transform"))?;
        let corners = [
            inverse.apply(bbox.min_x, bbox.min_y),
            inverse.apply(bbox.min_x, bbox.max_y),
            inverse.apply(bbox.max_x, bbox.min_y),
            inverse.apply(bbox.max_x, bbox.max_y),
        ];
        let px = BBox::from_points(corners)
            .filter(BBox::is_finite)
            .ok_or_else(|| Error::geometry("bounding box does not map to pixel space"))?;

        let clamp = |v: f64, max: usize| v.max(0.0).min(max as f64) as usize;
        let col_start = clamp(px.min_x.floor(), raster_cols);
        let col_end = clamp(px.max_x.ceil(), raster_cols);
        let row_start = clamp(px.min_y.floor(), raster_rows);
        let row_end = clamp(px.max_y.ceil(), raster_rows);

        Ok(PixelWindow {
            col_off: col_start,
            row_off: row_start,
            cols: col_end.saturating_sub(col_start),
            rows: row_end.saturating_sub(row_start),
        })
    }
}

/// A georeferenced 2D grid of samples. `mask` is true where a sample is invalid.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    pub data: Array2<f64>,
    pub mask: Array2<bool>,
    pub transform: Affine,
    pub crs: Crs,
}

impl RasterGrid {
    pub fn new(data: Array2<f64>, mask: Array2<bool>, transform: Affine, crs: Crs) -> Result<Self> {
        if data.dim() != mask.dim() {
            return Err(Error::GridMismatch(format!(
                "mask shape {:?} does not match data shape {:?}",
                mask.dim(),
                data.dim()
            )));
        }
        Ok(Self {
            data,
            mask,
            transform,
            crs,
        })
    }

    /// Grid whose validity is derived from the samples: `nodata` and non-finite values are invalid.
    pub fn from_samples(data: Array2<f64>, nodata: Option<f64>, transform: Affine, crs: Crs) -> Self {
        let mask = data.mapv(|v| !v.is_finite() || nodata.is_some_and(|nd| v == nd));
        Self {
            data,
            mask,
            transform,
            crs,
        }
    }

    /// Zero-size grid, used when a window misses the raster.
    pub fn empty(transform: Affine, crs: Crs) -> Self {
        Self {
            data: Array2::zeros((0, 0)),
            mask: Array2::from_elem((0, 0), true),
            transform,
            crs,
        }
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| !m).count()
    }

    pub fn bounds(&self) -> BBox {
        self.transform.bounds(self.rows(), self.cols())
    }

    /// New grid whose mask is `self.mask OR extra`; `self` is left untouched.
    pub fn with_mask_union(&self, extra: &Array2<bool>) -> Result<RasterGrid> {
        if extra.dim() != self.mask.dim() {
            return Err(Error::GridMismatch(format!(
                "mask shape {:?} does not match grid shape {:?}",
                extra.dim(),
                self.mask.dim()
            )));
        }
        let mut mask = self.mask.clone();
        Zip::from(&mut mask).and(extra).for_each(|m, &e| *m |= e);
        Ok(RasterGrid {
            data: self.data.clone(),
            mask,
            transform: self.transform,
            crs: self.crs.clone(),
        })
    }

    /// Shape, transform and CRS all equal.
    pub fn is_aligned_with(&self, other: &RasterGrid) -> bool {
        self.shape() == other.shape() && self.transform == other.transform && self.crs == other.crs
    }
}

/// A grid of index values.
#[derive(Debug, Clone)]
pub struct IndexGrid {
    pub index: SpectralIndex,
    pub grid: RasterGrid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_normalizes_epsg_prefix() {
        assert_eq!(Crs::new(" epsg:32630 "), Crs::from_epsg(32630));
        assert_eq!(Crs::wgs84().as_str(), "EPSG:4326");
        assert!(!Crs::new("").is_defined());
    }

    #[test]
    fn test_affine_inverse_roundtrip() {
        let t = Affine::new([500_000.0, 10.0, 0.5, 4_600_000.0, 0.25, -10.0]);
        let inv = t.inverse().unwrap();
        let (x, y) = t.apply(12.5, 7.25);
        let (col, row) = inv.apply(x, y);
        assert!((col - 12.5).abs() < 1e-9);
        assert!((row - 7.25).abs() < 1e-9);
    }

    #[test]
    fn test_singular_affine_has_no_inverse() {
        let t = Affine::new([0.0, 1.0, 2.0, 0.0, 2.0, 4.0]);
        assert!(t.inverse().is_none());
    }

    #[test]
    fn test_window_covers_bbox_with_floor_and_ceil() {
        let t = Affine::north_up(0.0, 100.0, 10.0, -10.0);
        let bbox = BBox::new(15.0, 55.0, 42.0, 81.0);
        let w = PixelWindow::covering(&bbox, &t, 10, 10).unwrap();
        assert_eq!(w, PixelWindow { col_off: 1, row_off: 1, cols: 4, rows: 4 });
    }

    #[test]
    fn test_window_clipped_to_raster_extent() {
        let t = Affine::north_up(0.0, 100.0, 10.0, -10.0);
        let bbox = BBox::new(-50.0, 50.0, 30.0, 150.0);
        let w = PixelWindow::covering(&bbox, &t, 10, 10).unwrap();
        assert_eq!(w, PixelWindow { col_off: 0, row_off: 0, cols: 3, rows: 5 });
    }

    #[test]
    fn test_window_outside_raster_is_empty() {
        let t = Affine::north_up(0.0, 100.0, 10.0, -10.0);
        let bbox = BBox::new(500.0, 500.0, 600.0, 600.0);
        let w = PixelWindow::covering(&bbox, &t, 10, 10).unwrap();
        assert!(w.is_empty());
    }

    #[test]
    fn test_translated_and_scaled_transform() {
        let t = Affine::north_up(100.0, 200.0, 10.0, -10.0);
        let moved = t.translated(3.0, 2.0);
        assert_eq!(moved.coefficients(), [130.0, 10.0, 0.0, 180.0, 0.0, -10.0]);
        let fine = moved.scaled(5);
        assert_eq!(fine.coefficients(), [130.0, 2.0, 0.0, 180.0, 0.0, -2.0]);
    }

    #[test]
    fn test_from_samples_flags_nodata_and_nan() {
        let data = Array2::from_shape_vec((1, 3), vec![0.0, f64::NAN, 5.0]).unwrap();
        let grid = RasterGrid::from_samples(data, Some(0.0), Affine::north_up(0.0, 0.0, 1.0, -1.0), Crs::wgs84());
        assert_eq!(grid.mask.as_slice().unwrap(), &[true, true, false]);
        assert_eq!(grid.valid_count(), 1);
    }

    #[test]
    fn test_mask_union_returns_new_grid() {
        let grid = RasterGrid::from_samples(
            Array2::from_elem((2, 2), 1.0),
            None,
            Affine::north_up(0.0, 0.0, 1.0, -1.0),
            Crs::wgs84(),
        );
        let extra = Array2::from_shape_vec((2, 2), vec![true, false, false, false]).unwrap();
        let masked = grid.with_mask_union(&extra).unwrap();
        assert_eq!(masked.valid_count(), 3);
        assert_eq!(grid.valid_count(), 4);
        assert!(grid.with_mask_union(&Array2::from_elem((3, 3), false)).is_err());
    }
}
