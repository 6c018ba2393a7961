use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::SelectionMode;

/// Longest default search window accepted, in days
pub const MAX_SEARCH_DAYS: i64 = 36_500;

/// Weights of the `balanced` selection score:
/// `cloud_weight * cloud_cover_pct + recency_weight * age_seconds / day_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancedWeights {
    pub cloud_weight: f64,
    pub recency_weight: f64,
    pub day_seconds: f64,
}

impl Default for BalancedWeights {
    fn default() -> Self {
        Self {
            cloud_weight: 0.6,
            recency_weight: 0.4,
            day_seconds: 86_400.0,
        }
    }
}

/// Pipeline configuration, suitable for config files and CLI overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Integer block factor used for the high-resolution display grid
    pub upscale_factor: usize,
    /// Length of the default search window ending now, in days
    pub search_days: i64,
    pub selection_mode: SelectionMode,
    pub balanced: BalancedWeights,
    /// Scenes with cloud cover at or above this percentage are not requested
    pub max_cloud_cover: f64,
    /// Soil brightness correction factor for SAVI
    pub savi_l: f64,
    /// Added to every index denominator
    pub epsilon: f64,
    /// Overlays smaller than this on either side are upscaled
    pub overlay_min_size: usize,
    pub stac_url: String,
    pub collection: String,
    /// Upper bound on items fetched across search pages
    pub max_items: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upscale_factor: 3,
            search_days: 30,
            selection_mode: SelectionMode::LeastCloud,
            balanced: BalancedWeights::default(),
            max_cloud_cover: 30.0,
            savi_l: 0.5,
            epsilon: 1e-8,
            overlay_min_size: 100,
            stac_url: "https://earth-search.aws.element84.com/v1".to_string(),
            collection: "sentinel-2-l2a".to_string(),
            max_items: 100,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upscale_factor == 0 {
            return Err(Error::InvalidArgument {
                arg: "upscale_factor",
                value: self.upscale_factor.to_string(),
            });
        }
        if !(0..=MAX_SEARCH_DAYS).contains(&self.search_days) {
            return Err(Error::InvalidArgument {
                arg: "search_days",
                value: self.search_days.to_string(),
            });
        }
        if !(0.0..=100.0).contains(&self.max_cloud_cover) {
            return Err(Error::InvalidArgument {
                arg: "max_cloud_cover",
                value: self.max_cloud_cover.to_string(),
            });
        }
        if self.balanced.day_seconds <= 0.0 {
            return Err(Error::InvalidArgument {
                arg: "balanced.day_seconds",
                value: self.balanced.day_seconds.to_string(),
            });
        }
        Ok(())
    }
}
