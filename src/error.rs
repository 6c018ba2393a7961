//! Crate-level error type and `Result` alias for structured error handling.
//! Converts underlying I/O, GDAL, catalog and JSON errors, and provides semantic
//! variants for geometry, band-read and grid-contract failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] crate::io::GdalError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] crate::io::StacError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No imagery found for this location and date range")]
    NoImageryFound,

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Failed to read band '{band}' from {href}: {reason}")]
    BandRead {
        band: String,
        href: String,
        reason: String,
    },

    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Encoding error: {0}")]
    Encode(String),
}

impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(crate::io::GdalError::from(e))
    }
}

impl Error {
    pub fn geometry<E: std::fmt::Display>(e: E) -> Self {
        Error::Geometry(e.to_string())
    }

    pub fn encode<E: std::fmt::Display>(e: E) -> Self {
        Error::Encode(e.to_string())
    }
}
