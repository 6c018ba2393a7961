use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::processing::pipeline::{IndexResult, SceneAnalysis};
use crate::error::Result;
use crate::io::writers::metadata::{ProductMetadata, create_metadata_sidecar, embed_tiff_metadata};
use crate::io::writers::png::write_png;
use crate::io::writers::tiff::write_index_tiff;
use crate::io::writers::worldfile::{write_prj_file, write_world_file};
use crate::types::SelectionMode;

/// Files written for one index
#[derive(Debug, Clone, Default)]
pub struct SavedProduct {
    pub png: Option<PathBuf>,
    pub world_file: Option<PathBuf>,
    pub prj: Option<PathBuf>,
    pub sidecar: Option<PathBuf>,
    pub tiff: Option<PathBuf>,
}

fn product_metadata(analysis: &SceneAnalysis, result: &IndexResult, mode: SelectionMode) -> ProductMetadata {
    let (transform, width, height) = match &result.overlay {
        Some(o) => (o.transform, o.width, o.height),
        None => {
            let (rows, cols) = result.high_res.grid.shape();
            (result.high_res.grid.transform, cols, rows)
        }
    };
    ProductMetadata {
        index: result.index,
        scene_id: analysis.scene.id.clone(),
        acquisition_date: analysis.scene.acquired.format("%Y-%m-%d").to_string(),
        cloud_cover: analysis.scene.cloud_cover,
        platform: analysis.scene.platform.clone(),
        selection_mode: mode,
        stats: result.stats,
        bounds_wgs84: None,
        geotransform: transform.coefficients(),
        crs: analysis.crs.to_string(),
        width,
        height,
    }
    .with_bounds(analysis.image_bounds)
}

/// Write `<index>.png` with `.pgw`/`.prj`/`.json` sidecars, plus `<index>.tif`
/// holding the clipped native-resolution values.
pub fn save_index_result(
    output_dir: &Path,
    analysis: &SceneAnalysis,
    result: &IndexResult,
    mode: SelectionMode,
) -> Result<SavedProduct> {
    std::fs::create_dir_all(output_dir)?;
    let meta = product_metadata(analysis, result, mode);
    let mut saved = SavedProduct::default();

    let png_path = output_dir.join(format!("{}.png", result.index));
    match &result.overlay {
        Some(overlay) => {
            write_png(&png_path, &overlay.png)?;
            saved.world_file = Some(write_world_file(&png_path, &overlay.transform)?);
            saved.prj = Some(write_prj_file(&png_path, &overlay.crs)?);
            saved.png = Some(png_path.clone());
        }
        None => warn!("No overlay for {}: nothing valid inside the polygon", result.index),
    }
    saved.sidecar = Some(create_metadata_sidecar(&png_path, &meta)?);

    if !result.native.grid.is_empty() {
        let tiff_path = output_dir.join(format!("{}.tif", result.index));
        let mut ds = write_index_tiff(&tiff_path, &result.native.grid)?;
        embed_tiff_metadata(&mut ds, &meta)?;
        saved.tiff = Some(tiff_path);
    }
    info!("Saved {} products to {:?}", result.index, output_dir);
    Ok(saved)
}

/// Save every index of an analysis.
pub fn save_analysis(output_dir: &Path, analysis: &SceneAnalysis, mode: SelectionMode) -> Result<Vec<SavedProduct>> {
    analysis
        .results
        .iter()
        .map(|r| save_index_result(output_dir, analysis, r, mode))
        .collect()
}
