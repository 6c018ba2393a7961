//! I/O layer: catalog search (STAC), windowed band reads (GDAL), coordinate
//! reprojection, and `writers` for PNG/GeoTIFF outputs and metadata sidecars.
pub mod band;
pub use band::{BandOpener, BandSource, read_band_window};

pub mod catalog;
pub use catalog::{CatalogSearch, Scene, SearchQuery};

pub mod gdal;
pub use gdal::{GdalBandOpener, GdalBandSource, GdalError};

pub mod projection;
pub use projection::{ProjectedArea, Projector, project_area};

pub mod stac;
pub use stac::{StacClient, StacClientOptions, StacError};

pub mod writers;
