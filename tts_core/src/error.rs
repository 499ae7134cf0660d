use thiserror::Error;

/// Failures of the synthesis pipeline, one variant per stage.
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Model initialization failed: {0}")]
    ModelUnavailable(String),

    #[error("{0}")]
    Synthesis(String),

    #[error("WAV encoding error: {0}")]
    Encoding(String),

    #[error("Cache I/O error: {0}")]
    Cache(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TtsError>;
