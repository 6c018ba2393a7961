use clap::Parser;
use std::path::PathBuf;

use parcelsat::{SelectionMode, SpectralIndex};

#[derive(Parser)]
#[command(
    name = "parcelsat",
    version,
    about = "Vegetation, water and moisture indices for a field polygon from Sentinel-2 L2A"
)]
pub struct CliArgs {
    /// GeoJSON file with the area of interest (Polygon, Feature or FeatureCollection)
    #[arg(long)]
    pub aoi: PathBuf,

    /// Search window: YYYY-MM-DD (until now) or YYYY-MM-DD,YYYY-MM-DD
    #[arg(long)]
    pub date_range: Option<String>,

    /// Indices to compute, comma separated (default: all)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub indices: Vec<SpectralIndex>,

    /// Scene selection strategy
    #[arg(long, value_enum, env = "SCENE_SELECTION_MODE")]
    pub selection: Option<SelectionMode>,

    /// Nearest-neighbour upscale factor applied before masking and rendering
    #[arg(long, env = "NDVI_UPSCALE_FACTOR")]
    pub upscale_factor: Option<usize>,

    /// Days searched back from now when no date range is given
    #[arg(long, env = "SCENE_SEARCH_DAYS")]
    pub search_days: Option<i64>,

    /// Maximum scene cloud cover in percent
    #[arg(long)]
    pub max_cloud: Option<f64>,

    /// STAC API endpoint
    #[arg(long)]
    pub stac_url: Option<String>,

    /// JSON file with pipeline settings; flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write <index>.png/.pgw/.prj/.json/.tif products into this directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Only list candidate scenes and the one that would be selected
    #[arg(long, default_value_t = false)]
    pub list_scenes: bool,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,
}
