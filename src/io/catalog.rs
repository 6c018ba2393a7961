//! Scene records and the catalog search seam.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::grid::BBox;
use crate::error::Result;
use crate::types::Band;

/// Cloud cover assumed when a catalog item does not report one.
pub const DEFAULT_CLOUD_COVER: f64 = 100.0;

/// Platform reported when a catalog item does not name one.
pub const DEFAULT_PLATFORM: &str = "Sentinel-2";

/// One acquisition returned by a catalog search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub acquired: DateTime<Utc>,
    /// Percentage in [0, 100]
    pub cloud_cover: f64,
    pub platform: String,
    /// STAC asset key → href
    pub assets: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epsg: Option<u32>,
}

impl Scene {
    pub fn new(id: impl Into<String>, acquired: DateTime<Utc>, cloud_cover: f64) -> Self {
        Self {
            id: id.into(),
            acquired,
            cloud_cover,
            platform: DEFAULT_PLATFORM.to_string(),
            assets: HashMap::new(),
            thumbnail_href: None,
            epsg: None,
        }
    }

    pub fn with_asset(mut self, key: impl Into<String>, href: impl Into<String>) -> Self {
        self.assets.insert(key.into(), href.into());
        self
    }

    pub fn band_href(&self, band: Band) -> Option<&str> {
        self.assets.get(band.asset_key()).map(String::as_str)
    }
}

/// Parameters of one catalog search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Longitude/latitude envelope
    pub bbox: BBox,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Only scenes with cloud cover strictly below this percentage
    pub max_cloud_cover: f64,
}

impl SearchQuery {
    /// RFC 3339 `start/end` interval as used by STAC item search.
    pub fn datetime_interval(&self) -> String {
        format!(
            "{}/{}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

/// A searchable scene catalog.
pub trait CatalogSearch {
    fn search(&self, query: &SearchQuery) -> Result<Vec<Scene>>;
}
