//! Coordinate reprojection between the WGS84 area of interest and raster CRSs.
//!
//! Backed by GDAL/OGR `CoordTransform` with traditional GIS axis order
//! (x = longitude, y = latitude). When source and destination CRS are the
//! same definition, the identity mapping is used and PROJ is never touched.
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use tracing::debug;

use crate::core::aoi::{AreaOfInterest, Polygon};
use crate::core::grid::{BBox, Crs};
use crate::error::{Error, Result};

/// Points sampled along each bounding-box edge before reprojection.
pub const DENSIFY_POINTS: usize = 21;

enum Mapping {
    Identity,
    Gdal(CoordTransform),
}

/// A reusable point transform from one CRS into another.
pub struct Projector {
    from: Crs,
    to: Crs,
    mapping: Mapping,
}

fn spatial_ref(crs: &Crs) -> Result<SpatialRef> {
    if !crs.is_defined() {
        return Err(Error::geometry("undefined coordinate reference system"));
    }
    let mut srs = SpatialRef::from_definition(crs.as_str())
        .map_err(|e| Error::Geometry(format!("cannot interpret CRS '{}': {}", crs, e)))?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

impl Projector {
    pub fn new(from: &Crs, to: &Crs) -> Result<Self> {
        let mapping = if from == to {
            if !from.is_defined() {
                return Err(Error::geometry("undefined coordinate reference system"));
            }
            Mapping::Identity
        } else {
            let src = spatial_ref(from)?;
            let dst = spatial_ref(to)?;
            let transform = CoordTransform::new(&src, &dst).map_err(|e| {
                Error::Geometry(format!("no transform from {} to {}: {}", from, to, e))
            })?;
            Mapping::Gdal(transform)
        };
        debug!("Projector {} -> {} ready", from, to);
        Ok(Self {
            from: from.clone(),
            to: to.clone(),
            mapping,
        })
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.mapping, Mapping::Identity)
    }

    /// Transform coordinates in place. Any non-finite output is an error.
    pub fn transform_points(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<()> {
        if xs.len() != ys.len() {
            return Err(Error::geometry("coordinate arrays differ in length"));
        }
        if let Mapping::Gdal(transform) = &self.mapping {
            let mut zs = vec![0.0_f64; xs.len()];
            transform
                .transform_coords(xs, ys, &mut zs)
                .map_err(|e| Error::Geometry(format!("{} -> {}: {}", self.from, self.to, e)))?;
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(Error::Geometry(format!(
                "{} -> {} produced non-finite coordinates",
                self.from, self.to
            )));
        }
        Ok(())
    }

    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let mut xs = [x];
        let mut ys = [y];
        self.transform_points(&mut xs, &mut ys)?;
        Ok((xs[0], ys[0]))
    }

    /// Envelope of a bounding box after reprojection, sampling every edge
    /// with [`DENSIFY_POINTS`] points so curved edges are covered.
    pub fn transform_bounds(&self, bbox: &BBox) -> Result<BBox> {
        if self.is_identity() {
            return Ok(*bbox);
        }
        let n = DENSIFY_POINTS;
        let mut xs = Vec::with_capacity(4 * n);
        let mut ys = Vec::with_capacity(4 * n);
        for i in 0..n {
            let t = i as f64 / (n - 1) as f64;
            let x = bbox.min_x + t * bbox.width();
            let y = bbox.min_y + t * bbox.height();
            xs.extend_from_slice(&[x, x, bbox.min_x, bbox.max_x]);
            ys.extend_from_slice(&[bbox.min_y, bbox.max_y, y, y]);
        }
        self.transform_points(&mut xs, &mut ys)?;
        BBox::from_points(xs.into_iter().zip(ys))
            .ok_or_else(|| Error::geometry("empty bounds after reprojection"))
    }

    /// Transform every vertex of a polygon.
    pub fn project_polygon(&self, polygon: &Polygon) -> Result<Polygon> {
        if self.is_identity() {
            return Ok(polygon.clone());
        }
        polygon.try_map(|x, y| self.transform_point(x, y))
    }
}

/// The area of interest prepared for one raster CRS.
#[derive(Debug, Clone)]
pub struct ProjectedArea {
    /// Envelope of the AOI in longitude/latitude.
    pub bbox_wgs84: BBox,
    /// The AOI polygon in the raster CRS.
    pub polygon: Polygon,
    pub crs: Crs,
}

pub fn project_area(aoi: &AreaOfInterest, crs: &Crs) -> Result<ProjectedArea> {
    let projector = Projector::new(&Crs::wgs84(), crs)?;
    let polygon = projector.project_polygon(aoi.polygon())?;
    Ok(ProjectedArea {
        bbox_wgs84: aoi.bbox(),
        polygon,
        crs: crs.clone(),
    })
}
