#![doc = r##"
parcelsat: parcel-level Sentinel-2 spectral indices.

Given a field polygon and an optional date range, this crate searches a STAC catalog for
Sentinel-2 L2A scenes, picks the best one, reads only the bands and pixels covering the
polygon, and computes NDVI, NDWI, NDMI, EVI and SAVI. Each index comes back with statistics
over the polygon and a colour-mapped PNG overlay georeferenced in longitude/latitude. It powers
the parcelsat CLI and can be embedded in your own Rust applications.

Requirements
------------
- GDAL development headers and runtime available on your system (network band reads go
  through `/vsicurl/`).
- Rust 2024 edition toolchain.

Quick start
-----------
```rust,no_run
use parcelsat::io::{GdalBandOpener, StacClient, StacClientOptions};
use parcelsat::{AnalysisRequest, AnalysisResponse, Analyzer, AreaOfInterest, PipelineConfig};

fn main() -> parcelsat::Result<()> {
    let aoi = AreaOfInterest::from_geojson_str(
        r#"{"type":"Polygon","coordinates":[[[5.10,52.00],[5.12,52.00],[5.12,52.01],[5.10,52.00]]]}"#,
    )?;
    let config = PipelineConfig::default();
    let catalog = StacClient::new(&config.stac_url, &config.collection, StacClientOptions::default())?;
    let opener = GdalBandOpener::new()?;

    let request = AnalysisRequest::new(aoi).with_date_range("2024-06-01,2024-06-30");
    match Analyzer::new(&config, &catalog, &opener).analyze(&request) {
        AnalysisResponse::Success(report) => println!("{} on {}", report.scene_id, report.product_date),
        AnalysisResponse::NoImagery { message, .. } => eprintln!("{message}"),
        AnalysisResponse::Error { message } => eprintln!("failed: {message}"),
    }
    Ok(())
}
```

Custom data sources
-------------------
The catalog and the raster reader sit behind the [`io::CatalogSearch`] and [`io::BandOpener`]
traits, so a pipeline can run against local files or in-memory fixtures.

Error handling
--------------
Library functions return `parcelsat::Result<T>`. The request boundary ([`api::Analyzer`])
never returns an error; failures become [`AnalysisResponse::Error`].

Useful modules
--------------
- [`api`]: request/response boundary and date-range handling.
- [`core`]: geometry, grids, configuration and the processing pipeline.
- [`io`]: STAC search, GDAL band reads, reprojection and output writers.
- [`types`]: bands, indices and selection modes.
- [`error`]: crate-level `Error` and `Result`.
"##]

pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Types
pub use core::aoi::{AreaOfInterest, Polygon};
pub use core::grid::{Affine, BBox, Crs, IndexGrid, RasterGrid};
pub use core::params::{BalancedWeights, PipelineConfig};
pub use core::processing::stats::StatsSummary;
pub use error::{Error, Result};
pub use types::{Band, SelectionMode, SpectralIndex};

// High-level API re-exports
pub use api::{
    AnalysisReport, AnalysisRequest, AnalysisResponse, Analyzer, DateWindow, analyze,
    resolve_date_window,
};
