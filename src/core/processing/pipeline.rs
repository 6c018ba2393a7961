//! One scene, end to end: windowed band reads, alignment, index math,
//! upsampling, polygon masking at both resolutions, statistics and overlays.
use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::core::aoi::AreaOfInterest;
use crate::core::grid::{BBox, Crs, IndexGrid, RasterGrid};
use crate::core::params::PipelineConfig;
use crate::core::processing::colormap::{IndexFamily, RenderedOverlay, render_overlay};
use crate::core::processing::mask::outside_polygon_mask;
use crate::core::processing::ops::{BandSet, IndexParams, compute_index};
use crate::core::processing::resize::{align_to_reference, upsample};
use crate::core::processing::stats::{StatsSummary, summarize};
use crate::error::{Error, Result};
use crate::io::band::{BandOpener, read_band_window};
use crate::io::catalog::Scene;
use crate::io::projection::{Projector, project_area};
use crate::types::{Band, SpectralIndex};

/// Everything computed for one index of one scene.
#[derive(Debug, Clone)]
pub struct IndexResult {
    pub index: SpectralIndex,
    pub family: IndexFamily,
    /// Statistics over the native-resolution grid
    pub stats: StatsSummary,
    /// Native-resolution grid, clipped to the polygon
    pub native: IndexGrid,
    /// Upsampled grid, clipped to the polygon; source of the overlay
    pub high_res: IndexGrid,
    /// `None` when the window was empty or nothing inside the polygon was valid
    pub overlay: Option<RenderedOverlay>,
}

#[derive(Debug, Clone)]
pub struct SceneAnalysis {
    pub scene: Scene,
    pub crs: Crs,
    pub results: Vec<IndexResult>,
    /// Longitude/latitude envelope of the high-resolution grid
    pub image_bounds: Option<BBox>,
}

impl SceneAnalysis {
    pub fn result(&self, index: SpectralIndex) -> Option<&IndexResult> {
        self.results.iter().find(|r| r.index == index)
    }
}

/// Bands needed for `indices`, in canonical order.
pub fn required_bands(indices: &[SpectralIndex]) -> Vec<Band> {
    indices
        .iter()
        .flat_map(|i| i.required_bands().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Index of the finest grid (largest pixel count); ties keep the first.
fn finest(grids: &[(Band, RasterGrid)]) -> usize {
    let mut best = 0;
    for (i, (_, g)) in grids.iter().enumerate() {
        if g.data.len() > grids[best].1.data.len() {
            best = i;
        }
    }
    best
}

pub struct ScenePipeline<'a> {
    config: &'a PipelineConfig,
    opener: &'a dyn BandOpener,
}

impl<'a> ScenePipeline<'a> {
    pub fn new(config: &'a PipelineConfig, opener: &'a dyn BandOpener) -> Self {
        Self { config, opener }
    }

    /// Read every band in parallel and align them onto the finest band's grid.
    pub fn read_bands(&self, scene: &Scene, bbox_wgs84: &BBox, bands: &[Band]) -> Result<BandSet> {
        let hrefs = bands
            .iter()
            .map(|&band| {
                scene
                    .band_href(band)
                    .map(|href| (band, href.to_string()))
                    .ok_or_else(|| Error::BandRead {
                        band: band.to_string(),
                        href: String::new(),
                        reason: format!("scene {} has no '{}' asset", scene.id, band.asset_key()),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let grids = hrefs
            .par_iter()
            .map(|(band, href)| {
                let wrap = |e: Error| Error::BandRead {
                    band: band.to_string(),
                    href: href.clone(),
                    reason: e.to_string(),
                };
                let source = self.opener.open(href).map_err(wrap)?;
                let grid = read_band_window(source.as_ref(), bbox_wgs84).map_err(wrap)?;
                debug!("Read {} window {:?} from {}", band, grid.shape(), href);
                Ok((*band, grid))
            })
            .collect::<Result<Vec<_>>>()?;

        let reference = grids[finest(&grids)].1.clone();
        let mut set = BandSet::new();
        for (band, grid) in grids {
            if grid.crs != reference.crs {
                return Err(Error::GridMismatch(format!(
                    "band {} is in {}, reference grid in {}",
                    band, grid.crs, reference.crs
                )));
            }
            set.insert(band, align_to_reference(&grid, &reference)?);
        }
        Ok(set)
    }

    pub fn run(&self, scene: &Scene, aoi: &AreaOfInterest, indices: &[SpectralIndex]) -> Result<SceneAnalysis> {
        if indices.is_empty() {
            return Err(Error::InvalidArgument {
                arg: "indices",
                value: String::new(),
            });
        }
        let bbox_wgs84 = aoi.bbox();
        let bands = required_bands(indices);
        info!(
            "Processing scene {} for {:?} (bands {:?})",
            scene.id, indices, bands
        );
        let band_set = self.read_bands(scene, &bbox_wgs84, &bands)?;
        let reference = band_set.get(bands[0])?;
        let crs = reference.crs.clone();
        let native_transform = reference.transform;
        let native_shape = reference.shape();

        let area = project_area(aoi, &crs)?;
        let factor = self.config.upscale_factor;
        let high_transform = native_transform.scaled(factor);
        let high_shape = (native_shape.0 * factor, native_shape.1 * factor);
        // masks depend only on the grid geometry, so both are shared by every index
        let native_outside = outside_polygon_mask(&area.polygon, native_shape, &native_transform);
        let high_outside = outside_polygon_mask(&area.polygon, high_shape, &high_transform);
        debug!(
            "Polygon covers {} native and {} high-res pixel centres",
            native_outside.iter().filter(|&&m| !m).count(),
            high_outside.iter().filter(|&&m| !m).count()
        );

        let params = IndexParams {
            epsilon: self.config.epsilon,
            savi_l: self.config.savi_l,
        };
        let mut results = Vec::with_capacity(indices.len());
        for &index in indices {
            let computed = compute_index(index, &band_set, params)?;
            let high = upsample(&computed.grid, factor)?;
            let native = computed.grid.with_mask_union(&native_outside)?;
            let high = high.with_mask_union(&high_outside)?;

            let stats = summarize(&native);
            let family = IndexFamily::from(index);
            let overlay = if stats.is_empty() {
                None
            } else {
                render_overlay(&high, family, self.config.overlay_min_size)?
            };
            info!(
                "{}: mean={:.4} std={:.4} min={:.4} max={:.4} valid={}",
                index, stats.mean, stats.std, stats.min, stats.max, stats.count
            );
            results.push(IndexResult {
                index,
                family,
                stats,
                native: IndexGrid { index, grid: native },
                high_res: IndexGrid { index, grid: high },
                overlay,
            });
        }

        let image_bounds = if high_shape.0 == 0 || high_shape.1 == 0 {
            None
        } else {
            let to_wgs84 = Projector::new(&crs, &Crs::wgs84())?;
            Some(to_wgs84.transform_bounds(&high_transform.bounds(high_shape.0, high_shape.1))?)
        };

        Ok(SceneAnalysis {
            scene: scene.clone(),
            crs,
            results,
            image_bounds,
        })
    }
}
