//! High-level library API: turn an area of interest and an optional date range
//! into per-index statistics and overlays for the best matching scene.
//!
//! Every outcome is an [`AnalysisResponse`]; internal errors become its
//! `Error` variant rather than propagating to the caller. Prefer these
//! entrypoints over the low-level processing modules when embedding parcelsat.
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::core::aoi::AreaOfInterest;
use crate::core::params::PipelineConfig;
use crate::core::processing::pipeline::{IndexResult, SceneAnalysis, ScenePipeline};
use crate::core::processing::select::select_scene;
use crate::core::processing::stats::StatsSummary;
use crate::error::{Error, Result};
use crate::io::band::BandOpener;
use crate::io::catalog::{CatalogSearch, Scene, SearchQuery};
use crate::types::{SelectionMode, SpectralIndex};

/// Candidate scenes echoed back in a report
pub const MAX_LISTED_CANDIDATES: usize = 10;

pub const NO_IMAGERY_MESSAGE: &str = "No Sentinel-2 imagery found for this location and date range";
pub const NO_IMAGERY_INFO: &str =
    "Try expanding your date range or check if the area is over water/polar regions";

/// Resolved search interval
#[derive(Debug, Clone, PartialEq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Set when the caller's date range was rejected and the default window used instead
    pub warning: Option<String>,
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn start_of_day(d: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN))
}

fn end_of_day(d: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_hms_opt(23, 59, 59).unwrap_or_else(|| d.and_time(NaiveTime::MIN)))
}

/// Resolve `YYYY-MM-DD` or `YYYY-MM-DD,YYYY-MM-DD` into a search window.
///
/// Absent → the last `search_days` days up to `now`. A single date runs until
/// `now`; an explicit end date covers that whole day. Unparseable or reversed
/// ranges fall back to the default window and carry a warning. A `search_days`
/// that cannot be subtracted from `now` is an `InvalidArgument` error.
pub fn resolve_date_window(input: Option<&str>, search_days: i64, now: DateTime<Utc>) -> Result<DateWindow> {
    let default_start = TimeDelta::try_days(search_days)
        .filter(|_| search_days >= 0)
        .and_then(|days| now.checked_sub_signed(days))
        .ok_or_else(|| Error::InvalidArgument {
            arg: "search_days",
            value: search_days.to_string(),
        })?;
    let default = |warning: Option<String>| DateWindow {
        start: default_start,
        end: now,
        warning,
    };
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default(None));
    };

    let parts: Vec<&str> = raw.split(',').collect();
    let parsed = match parts.as_slice() {
        [single] => parse_day(single).map(|d| (start_of_day(d), now)),
        [first, last] => parse_day(first)
            .zip(parse_day(last))
            .map(|(s, e)| (start_of_day(s), end_of_day(e))),
        _ => None,
    };
    match parsed {
        Some((start, end)) if start <= end => Ok(DateWindow {
            start,
            end,
            warning: None,
        }),
        Some(_) => {
            let msg = format!(
                "date range '{}' ends before it starts; searched the last {} days instead",
                raw, search_days
            );
            warn!("{}", msg);
            Ok(default(Some(msg)))
        }
        None => {
            let msg = format!(
                "could not parse date range '{}' (expected YYYY-MM-DD or YYYY-MM-DD,YYYY-MM-DD); searched the last {} days instead",
                raw, search_days
            );
            warn!("{}", msg);
            Ok(default(Some(msg)))
        }
    }
}

/// One analysis request
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub aoi: AreaOfInterest,
    pub date_range: Option<String>,
    pub indices: Vec<SpectralIndex>,
}

impl AnalysisRequest {
    /// Request for all five indices over the default window.
    pub fn new(aoi: AreaOfInterest) -> Self {
        Self {
            aoi,
            date_range: None,
            indices: SpectralIndex::ALL.to_vec(),
        }
    }

    pub fn with_date_range(mut self, date_range: impl Into<String>) -> Self {
        self.date_range = Some(date_range.into());
        self
    }

    pub fn with_indices(mut self, indices: Vec<SpectralIndex>) -> Self {
        self.indices = indices;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateScene {
    /// 1-based position in the search results
    pub index: usize,
    pub scene_id: String,
    pub date: String,
    pub cloud_cover: f64,
    pub platform: String,
}

impl CandidateScene {
    pub fn from_scene(index: usize, scene: &Scene) -> Self {
        Self {
            index,
            scene_id: scene.id.clone(),
            date: scene.acquired.format("%Y-%m-%d").to_string(),
            cloud_cover: (scene.cloud_cover * 10.0).round() / 10.0,
            platform: scene.platform.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexPayload {
    #[serde(flatten)]
    pub stats: StatsSummary,
    /// `data:image/png;base64,...`
    pub image: Option<String>,
    /// High-resolution grid size
    pub image_dimensions: String,
    /// PNG size after the minimum-size upscale
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_dimensions: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchWindow {
    pub start: String,
    pub end: String,
}

/// Successful analysis payload
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub message: String,
    pub scene_id: String,
    pub product_date: String,
    pub cloud_cover: f64,
    pub satellite: String,
    pub selection_mode: SelectionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    pub search_window: SearchWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range_warning: Option<String>,
    /// `[min_lon, min_lat, max_lon, max_lat]` of the overlay images
    pub image_bounds: Option<[f64; 4]>,
    pub image_dimensions: String,
    pub indices: BTreeMap<SpectralIndex, IndexPayload>,
    pub total_candidates: usize,
    pub candidates: Vec<CandidateScene>,
    /// Grids and overlays behind the payload
    #[serde(skip)]
    pub analysis: Option<SceneAnalysis>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisResponse {
    Success(Box<AnalysisReport>),
    NoImagery { message: String, info: String },
    Error { message: String },
}

impl AnalysisResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResponse::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AnalysisResponse::Error { .. })
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            AnalysisResponse::Success(report) => Some(report),
            _ => None,
        }
    }
}

/// Catalog search, scene selection and per-scene processing behind one call
pub struct Analyzer<'a> {
    config: &'a PipelineConfig,
    catalog: &'a dyn CatalogSearch,
    opener: &'a dyn BandOpener,
}

impl<'a> Analyzer<'a> {
    pub fn new(config: &'a PipelineConfig, catalog: &'a dyn CatalogSearch, opener: &'a dyn BandOpener) -> Self {
        Self {
            config,
            catalog,
            opener,
        }
    }

    /// Resolve the window and run the catalog search.
    pub fn candidates(&self, request: &AnalysisRequest, now: DateTime<Utc>) -> Result<(DateWindow, Vec<Scene>)> {
        let window = resolve_date_window(request.date_range.as_deref(), self.config.search_days, now)?;
        let query = SearchQuery {
            bbox: request.aoi.bbox(),
            start: window.start,
            end: window.end,
            max_cloud_cover: self.config.max_cloud_cover,
        };
        info!(
            "Searching scenes {} .. {} (cloud < {}%)",
            window.start.format("%Y-%m-%d"),
            window.end.format("%Y-%m-%d"),
            query.max_cloud_cover
        );
        let scenes = self.catalog.search(&query)?;
        for (i, scene) in scenes.iter().take(MAX_LISTED_CANDIDATES).enumerate() {
            info!(
                "{}. {} | Cloud: {:5.1}% | {} | {}",
                i + 1,
                scene.acquired.format("%Y-%m-%d"),
                scene.cloud_cover,
                scene.platform,
                scene.id
            );
        }
        if scenes.len() > MAX_LISTED_CANDIDATES {
            info!("... and {} more scenes", scenes.len() - MAX_LISTED_CANDIDATES);
        }
        Ok((window, scenes))
    }

    pub fn analyze(&self, request: &AnalysisRequest) -> AnalysisResponse {
        self.analyze_at(request, Utc::now())
    }

    /// Like [`Analyzer::analyze`] with an explicit "now", used for the default window and scene age.
    pub fn analyze_at(&self, request: &AnalysisRequest, now: DateTime<Utc>) -> AnalysisResponse {
        match self.try_analyze(request, now) {
            Ok(response) => response,
            Err(Error::NoImageryFound) => no_imagery(),
            Err(e) => {
                warn!("Analysis failed: {}", e);
                AnalysisResponse::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    fn try_analyze(&self, request: &AnalysisRequest, now: DateTime<Utc>) -> Result<AnalysisResponse> {
        self.config.validate()?;
        let (window, scenes) = self.candidates(request, now)?;
        if scenes.is_empty() {
            return Ok(no_imagery());
        }
        let mode = self.config.selection_mode;
        let scene = select_scene(&scenes, mode, now, &self.config.balanced)?;
        let analysis = ScenePipeline::new(self.config, self.opener).run(scene, &request.aoi, &request.indices)?;
        Ok(AnalysisResponse::Success(Box::new(build_report(
            analysis, &scenes, &window, mode,
        ))))
    }
}

fn no_imagery() -> AnalysisResponse {
    AnalysisResponse::NoImagery {
        message: NO_IMAGERY_MESSAGE.to_string(),
        info: NO_IMAGERY_INFO.to_string(),
    }
}

/// `WxHpx` of the high-resolution grid the overlay was rendered from.
fn grid_dimensions(result: &IndexResult) -> String {
    let (rows, cols) = result.high_res.grid.shape();
    format!("{}x{}px", cols, rows)
}

fn build_report(analysis: SceneAnalysis, scenes: &[Scene], window: &DateWindow, mode: SelectionMode) -> AnalysisReport {
    let indices: BTreeMap<SpectralIndex, IndexPayload> = analysis
        .results
        .iter()
        .map(|r| {
            let payload = IndexPayload {
                stats: r.stats,
                image: r.overlay.as_ref().map(|o| o.data_uri()),
                image_dimensions: grid_dimensions(r),
                overlay_dimensions: r.overlay.as_ref().map(|o| o.dimensions_label()),
            };
            (r.index, payload)
        })
        .collect();
    let image_dimensions = analysis
        .results
        .first()
        .map(grid_dimensions)
        .unwrap_or_else(|| "0x0px".to_string());
    let scene = &analysis.scene;
    let names: Vec<&str> = analysis.results.iter().map(|r| r.index.name()).collect();

    AnalysisReport {
        message: format!("{} calculated from Sentinel-2 L2A", names.join(", ").to_uppercase()),
        scene_id: scene.id.clone(),
        product_date: scene.acquired.format("%Y-%m-%d").to_string(),
        cloud_cover: scene.cloud_cover,
        satellite: scene.platform.clone(),
        selection_mode: mode,
        preview_url: scene.thumbnail_href.clone(),
        search_window: SearchWindow {
            start: window.start.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            end: window.end.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        },
        date_range_warning: window.warning.clone(),
        image_bounds: analysis.image_bounds.map(|b| b.to_array()),
        image_dimensions,
        indices,
        total_candidates: scenes.len(),
        candidates: scenes
            .iter()
            .take(MAX_LISTED_CANDIDATES)
            .enumerate()
            .map(|(i, s)| CandidateScene::from_scene(i + 1, s))
            .collect(),
        analysis: Some(analysis),
    }
}

/// One-shot analysis with explicit collaborators.
pub fn analyze(
    request: &AnalysisRequest,
    catalog: &dyn CatalogSearch,
    opener: &dyn BandOpener,
    config: &PipelineConfig,
) -> AnalysisResponse {
    Analyzer::new(config, catalog, opener).analyze(request)
}
