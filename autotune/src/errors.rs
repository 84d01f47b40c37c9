use nightscout_ingestor::{models::window::WindowError, providers::ProviderError};
use thiserror::Error;

/// Why an autotune run could not produce recommendations.
#[derive(Debug, Error)]
pub enum AutotuneError {
    /// Fetching from or uploading to the remote failed.
    #[error(transparent)]
    Source(#[from] ProviderError),

    /// The requested calendar window is unusable.
    #[error("Invalid date range: {0}")]
    InvalidDateRange(#[from] WindowError),

    /// Too few glucose readings to say anything about the window.
    #[error("Insufficient BG readings for autotune analysis: found {found}, need at least {required}")]
    InsufficientReadings { found: usize, required: usize },

    /// The therapy profile cannot drive the deviation model.
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// The adjusted profile could not be encoded for upload.
    #[error("Failed to encode profile: {0}")]
    Encode(#[from] serde_json::Error),
}
