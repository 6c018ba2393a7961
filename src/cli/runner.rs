use std::fs;
use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use parcelsat::api::CandidateScene;
use parcelsat::core::processing::save::save_analysis;
use parcelsat::core::processing::select::select_scene;
use parcelsat::io::{GdalBandOpener, StacClient, StacClientOptions};
use parcelsat::{AnalysisRequest, AnalysisResponse, Analyzer, AreaOfInterest, PipelineConfig, SpectralIndex};

use super::args::CliArgs;
use super::errors::AppError;

fn init_logging(enabled: bool) {
    let default_level = if enabled { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // stdout is reserved for the JSON response
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Config file first, then flags and their environment variables.
fn build_config(args: &CliArgs) -> Result<PipelineConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(factor) = args.upscale_factor {
        config.upscale_factor = factor;
    }
    if let Some(days) = args.search_days {
        config.search_days = days;
    }
    if let Some(mode) = args.selection {
        config.selection_mode = mode;
    }
    if let Some(max_cloud) = args.max_cloud {
        config.max_cloud_cover = max_cloud;
    }
    if let Some(url) = &args.stac_url {
        config.stac_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn load_aoi(path: &Path) -> Result<AreaOfInterest, AppError> {
    let text = fs::read_to_string(path).map_err(|source| AppError::AoiFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(AreaOfInterest::from_geojson_str(&text)?)
}

fn list_scenes(analyzer: &Analyzer<'_>, request: &AnalysisRequest, config: &PipelineConfig) -> Result<(), AppError> {
    let now = Utc::now();
    let (window, scenes) = analyzer.candidates(request, now)?;
    let selected = if scenes.is_empty() {
        None
    } else {
        Some(select_scene(&scenes, config.selection_mode, now, &config.balanced)?.id.clone())
    };
    let candidates: Vec<CandidateScene> = scenes
        .iter()
        .enumerate()
        .map(|(i, s)| CandidateScene::from_scene(i + 1, s))
        .collect();
    let listing = serde_json::json!({
        "start": window.start.to_rfc3339(),
        "end": window.end.to_rfc3339(),
        "date_range_warning": window.warning,
        "selection_mode": config.selection_mode,
        "selected": selected,
        "candidates": candidates,
    });
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log);

    let config = build_config(&args)?;
    let aoi = load_aoi(&args.aoi)?;
    let indices = if args.indices.is_empty() {
        SpectralIndex::ALL.to_vec()
    } else {
        args.indices.clone()
    };
    let mut request = AnalysisRequest::new(aoi).with_indices(indices);
    request.date_range = args.date_range.clone();

    let options = StacClientOptions {
        max_items: config.max_items,
        ..StacClientOptions::default()
    };
    let catalog = StacClient::new(&config.stac_url, &config.collection, options)?;
    let opener = GdalBandOpener::new()?;
    let analyzer = Analyzer::new(&config, &catalog, &opener);

    if args.list_scenes {
        list_scenes(&analyzer, &request, &config)?;
        return Ok(());
    }

    let response = analyzer.analyze(&request);
    println!("{}", serde_json::to_string_pretty(&response)?);

    match &response {
        AnalysisResponse::Success(report) => {
            if let (Some(dir), Some(analysis)) = (&args.output_dir, &report.analysis) {
                let saved = save_analysis(dir, analysis, config.selection_mode)?;
                info!("Wrote {} index products to {:?}", saved.len(), dir);
            }
            Ok(())
        }
        AnalysisResponse::NoImagery { message, .. } => {
            warn!("{}", message);
            Ok(())
        }
        AnalysisResponse::Error { message } => Err(AppError::Analysis {
            message: message.clone(),
        }
        .into()),
    }
}
