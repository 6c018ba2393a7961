//! Blocking STAC Item Search client.
//!
//! Posts to `{endpoint}/search` with collection, bbox, datetime interval and
//! an `eo:cloud_cover` upper bound, follows `next` links until `max_items`
//! items are collected, and converts items into [`Scene`]s.
use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::io::catalog::{
    CatalogSearch, DEFAULT_CLOUD_COVER, DEFAULT_PLATFORM, Scene, SearchQuery,
};

#[derive(Debug, Error)]
pub enum StacError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("STAC search returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid STAC response: {0}")]
    Response(String),
}

// ---------------------------------------------------------------------------
// Wire models
// ---------------------------------------------------------------------------

/// Body for `POST /search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StacSearchParams {
    pub collections: Vec<String>,
    pub bbox: Vec<f64>,
    pub datetime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<serde_json::Value>,
    pub limit: u32,
    /// Pagination token carried by some catalogs' `next` links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StacItemCollection {
    #[serde(default)]
    pub features: Vec<StacItem>,
    #[serde(default)]
    pub links: Vec<StacLink>,
}

impl StacItemCollection {
    pub fn next_link(&self) -> Option<&StacLink> {
        self.links.iter().find(|l| l.rel == "next")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StacItem {
    pub id: String,
    pub properties: StacItemProperties,
    #[serde(default)]
    pub assets: HashMap<String, StacAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StacItemProperties {
    pub datetime: Option<String>,
    #[serde(rename = "eo:cloud_cover")]
    pub eo_cloud_cover: Option<f64>,
    pub platform: Option<String>,
    #[serde(rename = "proj:epsg")]
    pub proj_epsg: Option<u32>,
    /// Newer projection extension form, e.g. `"EPSG:32631"`
    #[serde(rename = "proj:code")]
    pub proj_code: Option<String>,
}

impl StacItemProperties {
    pub fn epsg(&self) -> Option<u32> {
        self.proj_epsg.or_else(|| {
            self.proj_code
                .as_deref()
                .and_then(|c| c.strip_prefix("EPSG:"))
                .and_then(|c| c.parse().ok())
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StacAsset {
    pub href: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StacLink {
    pub rel: String,
    pub href: String,
    pub method: Option<String>,
    pub body: Option<serde_json::Value>,
    pub merge: Option<bool>,
}

impl StacItem {
    /// `None` when the item has no parseable datetime.
    pub fn into_scene(self) -> Option<Scene> {
        let acquired = self
            .properties
            .datetime
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())?
            .with_timezone(&Utc);
        let thumbnail_href = self.assets.get("thumbnail").map(|a| a.href.clone());
        let epsg = self.properties.epsg();
        Some(Scene {
            id: self.id,
            acquired,
            cloud_cover: self.properties.eo_cloud_cover.unwrap_or(DEFAULT_CLOUD_COVER),
            platform: self
                .properties
                .platform
                .unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
            assets: self
                .assets
                .into_iter()
                .map(|(key, asset)| (key, asset.href))
                .collect(),
            thumbnail_href,
            epsg,
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct StacClientOptions {
    /// Per-request timeout (default 30 s)
    pub request_timeout: Duration,
    /// Retries on transport errors and 5xx responses (default 2)
    pub max_retries: u32,
    /// Items per page (default 50)
    pub page_size: u32,
    /// Maximum total items across pages (default 100)
    pub max_items: usize,
}

impl Default for StacClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 2,
            page_size: 50,
            max_items: 100,
        }
    }
}

pub struct StacClient {
    search_url: String,
    collection: String,
    client: reqwest::blocking::Client,
    options: StacClientOptions,
}

/// `{endpoint}/search`, tolerating a trailing slash or an explicit `/search`.
pub fn search_url(endpoint: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    if base.ends_with("/search") {
        base.to_string()
    } else {
        format!("{}/search", base)
    }
}

impl StacClient {
    pub fn new(endpoint: &str, collection: &str, options: StacClientOptions) -> Result<Self, StacError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.request_timeout)
            .build()?;
        Ok(Self {
            search_url: search_url(endpoint),
            collection: collection.to_string(),
            client,
            options,
        })
    }

    pub fn search_params(&self, query: &SearchQuery) -> StacSearchParams {
        StacSearchParams {
            collections: vec![self.collection.clone()],
            bbox: query.bbox.to_array().to_vec(),
            datetime: query.datetime_interval(),
            query: Some(serde_json::json!({
                "eo:cloud_cover": { "lt": query.max_cloud_cover }
            })),
            limit: self.options.page_size,
            next: None,
        }
    }

    /// All items matching `params`, following pagination up to `max_items`.
    pub fn search_all(&self, params: &StacSearchParams) -> Result<Vec<StacItem>, StacError> {
        let max = self.options.max_items;
        let mut all_items = Vec::new();
        let mut page = self.post_search(&self.search_url, params)?;
        loop {
            let next = page.next_link().cloned();
            all_items.extend(page.features.drain(..));
            if all_items.len() >= max {
                break;
            }
            match next {
                Some(link) => {
                    page = self.follow_next(&link, params)?;
                    if page.features.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }
        all_items.truncate(max);
        Ok(all_items)
    }

    fn post_search(&self, url: &str, params: &StacSearchParams) -> Result<StacItemCollection, StacError> {
        let mut last_err = None;
        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                std::thread::sleep(Duration::from_millis(500 * (1 << (attempt - 1))));
                debug!("Retrying STAC search (attempt {})", attempt + 1);
            }
            match self.client.post(url).json(params).send() {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<StacItemCollection>()
                        .map_err(|e| StacError::Response(e.to_string()));
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().unwrap_or_default();
                    last_err = Some(StacError::Status {
                        status: status.as_u16(),
                        body: body.chars().take(500).collect(),
                    });
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) => last_err = Some(StacError::Http(e)),
            }
        }
        Err(last_err.unwrap_or_else(|| StacError::Response("STAC search failed".into())))
    }

    /// Follow a `next` link, either POST (with optional body merge) or GET.
    fn follow_next(&self, link: &StacLink, params: &StacSearchParams) -> Result<StacItemCollection, StacError> {
        let method = link.method.as_deref().unwrap_or("GET").to_uppercase();
        if method == "POST" {
            let mut body = serde_json::to_value(params).map_err(|e| StacError::Response(e.to_string()))?;
            if let Some(link_body) = &link.body {
                if link.merge.unwrap_or(false) {
                    if let (Some(base), Some(extra)) = (body.as_object_mut(), link_body.as_object()) {
                        for (k, v) in extra {
                            base.insert(k.clone(), v.clone());
                        }
                    }
                } else {
                    body = link_body.clone();
                }
            }
            let next: StacSearchParams =
                serde_json::from_value(body).map_err(|e| StacError::Response(e.to_string()))?;
            self.post_search(&link.href, &next)
        } else {
            let resp = self.client.get(&link.href).send()?;
            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let body = resp.text().unwrap_or_default();
                return Err(StacError::Status {
                    status,
                    body: body.chars().take(500).collect(),
                });
            }
            resp.json().map_err(|e| StacError::Response(e.to_string()))
        }
    }
}

/// Convert items into scenes, skipping (and logging) items without a datetime.
pub fn items_to_scenes(items: Vec<StacItem>) -> Vec<Scene> {
    items
        .into_iter()
        .filter_map(|item| {
            let id = item.id.clone();
            let scene = item.into_scene();
            if scene.is_none() {
                warn!("Skipping STAC item {} without a valid datetime", id);
            }
            scene
        })
        .collect()
}

impl CatalogSearch for StacClient {
    fn search(&self, query: &SearchQuery) -> crate::error::Result<Vec<Scene>> {
        let params = self.search_params(query);
        info!(
            "STAC search {} collection={} bbox={:?} datetime={} cloud<{}",
            self.search_url, self.collection, params.bbox, params.datetime, query.max_cloud_cover
        );
        let items = self.search_all(&params)?;
        let scenes = items_to_scenes(items);
        info!("STAC search returned {} scenes", scenes.len());
        Ok(scenes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::BBox;
    use chrono::TimeZone;

    const FIXTURE: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "id": "S2A_31TDF_20240615_0_L2A",
          "properties": {
            "datetime": "2024-06-15T10:56:21.024000Z",
            "eo:cloud_cover": 5.2,
            "platform": "sentinel-2a",
            "proj:epsg": 32631
          },
          "assets": {
            "red": {"href": "https://example.com/B04.tif", "roles": ["data"]},
            "nir": {"href": "https://example.com/B08.tif"},
            "thumbnail": {"href": "https://example.com/thumb.jpg"}
          }
        },
        {
          "type": "Feature",
          "id": "no-cloud-field",
          "properties": {"datetime": "2024-06-20T10:00:00Z", "proj:code": "EPSG:32630"},
          "assets": {}
        },
        {
          "type": "Feature",
          "id": "no-date",
          "properties": {"datetime": null},
          "assets": {}
        }
      ],
      "links": [
        {"rel": "next", "href": "https://example.com/search", "method": "POST",
         "body": {"next": "token-2"}, "merge": true}
      ]
    }"#;

    #[test]
    fn test_parse_items_into_scenes() {
        let page: StacItemCollection = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(page.next_link().map(|l| l.href.as_str()), Some("https://example.com/search"));
        let scenes = items_to_scenes(page.features);
        assert_eq!(scenes.len(), 2);

        let first = &scenes[0];
        assert_eq!(first.cloud_cover, 5.2);
        assert_eq!(first.platform, "sentinel-2a");
        assert_eq!(first.epsg, Some(32631));
        assert_eq!(first.assets["nir"], "https://example.com/B08.tif");
        assert_eq!(first.thumbnail_href.as_deref(), Some("https://example.com/thumb.jpg"));

        assert_eq!(scenes[1].cloud_cover, DEFAULT_CLOUD_COVER);
        assert_eq!(scenes[1].epsg, Some(32630));
        assert_eq!(scenes[1].platform, DEFAULT_PLATFORM);
    }

    #[test]
    fn test_search_params_body() {
        let client = StacClient::new(
            "https://earth-search.aws.element84.com/v1/",
            "sentinel-2-l2a",
            StacClientOptions::default(),
        )
        .unwrap();
        assert_eq!(client.search_url, "https://earth-search.aws.element84.com/v1/search");
        let query = SearchQuery {
            bbox: BBox::new(2.0, 41.0, 2.1, 41.1),
            start: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap(),
            max_cloud_cover: 30.0,
        };
        let body = serde_json::to_value(client.search_params(&query)).unwrap();
        assert_eq!(body["collections"][0], "sentinel-2-l2a");
        assert_eq!(body["bbox"][3], 41.1);
        assert_eq!(body["datetime"], "2024-06-01T00:00:00Z/2024-06-30T23:59:59Z");
        assert_eq!(body["query"]["eo:cloud_cover"]["lt"], 30.0);
        assert!(body.get("next").is_none());
    }

    #[test]
    fn test_search_url_normalization() {
        assert_eq!(search_url("https://x.com/stac"), "https://x.com/stac/search");
        assert_eq!(search_url("https://x.com/stac/search/"), "https://x.com/stac/search");
    }
}
