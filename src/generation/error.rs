use thiserror::Error;

/// Errors returned by a [`GenerationService`](super::GenerationService).
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Generation service is not configured")]
    NotConfigured,
}

impl GenerationError {
    /// Rate limiting is the only condition the retry policy waits out.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}
