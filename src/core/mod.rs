//! Core building blocks: the georeferenced grid and AOI models, pipeline
//! parameters, and the processing primitives consumed by the `api` module.
pub mod aoi;
pub mod grid;
pub mod params;
pub mod processing;
