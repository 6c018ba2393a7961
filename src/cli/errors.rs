use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Cannot read area of interest {path}: {source}")]
    AoiFile {
        path: String,
        source: std::io::Error,
    },

    #[error("Analysis failed: {message}")]
    Analysis { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Library(#[from] parcelsat::Error),
}
