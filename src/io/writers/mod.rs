//! Output writers: PNG overlays, GeoTIFF index grids, world/.prj files and
//! JSON metadata sidecars.
pub mod metadata;
pub mod png;
pub mod tiff;
pub mod worldfile;
