use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gdal::{Dataset, Metadata};
use serde::Serialize;
use tracing::info;

use crate::core::grid::BBox;
use crate::core::processing::stats::StatsSummary;
use crate::error::Result;
use crate::types::{SelectionMode, SpectralIndex};

/// Descriptive metadata written alongside every exported index product
#[derive(Debug, Clone, Serialize)]
pub struct ProductMetadata {
    pub index: SpectralIndex,
    pub scene_id: String,
    pub acquisition_date: String,
    pub cloud_cover: f64,
    pub platform: String,
    pub selection_mode: SelectionMode,
    pub stats: StatsSummary,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds_wgs84: Option<[f64; 4]>,
    pub geotransform: [f64; 6],
    pub crs: String,
    pub width: usize,
    pub height: usize,
}

impl ProductMetadata {
    pub fn with_bounds(mut self, bounds: Option<BBox>) -> Self {
        self.bounds_wgs84 = bounds.map(|b| b.to_array());
        self
    }

    /// Flat `KEY=value` pairs, the form GDAL metadata domains use
    pub fn fields(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert("INDEX".to_string(), self.index.to_string());
        metadata.insert("SCENE_ID".to_string(), self.scene_id.clone());
        metadata.insert("ACQUISITION_DATE".to_string(), self.acquisition_date.clone());
        metadata.insert("CLOUD_COVER".to_string(), self.cloud_cover.to_string());
        metadata.insert("PLATFORM".to_string(), self.platform.clone());
        metadata.insert("SELECTION_MODE".to_string(), self.selection_mode.to_string());
        metadata.insert("MEAN".to_string(), self.stats.mean.to_string());
        metadata.insert("STD".to_string(), self.stats.std.to_string());
        metadata.insert("MIN".to_string(), self.stats.min.to_string());
        metadata.insert("MAX".to_string(), self.stats.max.to_string());
        metadata.insert("VALID_PIXELS".to_string(), self.stats.count.to_string());
        metadata
    }
}

/// Embed metadata items into a GeoTIFF dataset (default domain)
pub fn embed_tiff_metadata(ds: &mut Dataset, meta: &ProductMetadata) -> Result<()> {
    for (key, value) in meta.fields() {
        ds.set_metadata_item(&key, &value, "")?;
    }
    Ok(())
}

/// Write `<output>.json` next to an exported file
pub fn create_metadata_sidecar(output_path: &Path, meta: &ProductMetadata) -> Result<PathBuf> {
    let sidecar_path = output_path.with_extension("json");
    let json_string = serde_json::to_string_pretty(meta)?;
    std::fs::write(&sidecar_path, json_string)?;
    info!("Created metadata sidecar: {:?}", sidecar_path);
    Ok(sidecar_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ProductMetadata {
        ProductMetadata {
            index: SpectralIndex::Ndvi,
            scene_id: "S2B_31TDF_20240620_0_L2A".to_string(),
            acquisition_date: "2024-06-20".to_string(),
            cloud_cover: 3.5,
            platform: "sentinel-2b".to_string(),
            selection_mode: SelectionMode::LeastCloud,
            stats: StatsSummary {
                mean: 0.5,
                std: 0.1,
                min: 0.2,
                max: 0.8,
                count: 42,
            },
            bounds_wgs84: None,
            geotransform: [0.0, 1.0, 0.0, 0.0, 0.0, -1.0],
            crs: "EPSG:32631".to_string(),
            width: 120,
            height: 90,
        }
    }

    #[test]
    fn test_sidecar_json_contents() {
        let dir = tempfile::tempdir().unwrap();
        let meta = meta().with_bounds(Some(BBox::new(2.0, 41.0, 2.1, 41.1)));
        let path = create_metadata_sidecar(&dir.path().join("ndvi.png"), &meta).unwrap();
        assert_eq!(path, dir.path().join("ndvi.json"));
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["index"], "ndvi");
        assert_eq!(value["selection_mode"], "least_cloud");
        assert_eq!(value["stats"]["count"], 42);
        assert_eq!(value["bounds_wgs84"][2], 2.1);
    }

    #[test]
    fn test_fields_are_flat_strings() {
        let fields = meta().fields();
        assert_eq!(fields["INDEX"], "ndvi");
        assert_eq!(fields["VALID_PIXELS"], "42");
        assert_eq!(fields["SELECTION_MODE"], "least_cloud");
    }
}
