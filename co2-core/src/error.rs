use thiserror::Error;

/// Failures while determining where the user is.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("geolocation request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("geolocation request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("geolocation provider rejected the request: {reason}")]
    Rejected { reason: String },

    #[error("failed to parse location data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("location provider is not configured: {0}")]
    NotConfigured(String),
}

impl LocationError {
    /// True for errors caused by the transport or the remote service rather
    /// than by the shape of its answer.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            LocationError::Network(_) | LocationError::Status { .. } | LocationError::Rejected { .. }
        )
    }
}

/// Failures inside the emissions model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimateError {
    #[error("grid intensity must be a finite, non-negative number (got {0})")]
    InvalidIntensity(f64),

    #[error("emissions model produced a non-finite result")]
    NonFinite,
}

/// Reason the command fell back to the global average.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Location(#[from] LocationError),

    #[error("emissions estimate failed: {0}")]
    Estimation(#[from] EstimateError),
}

/// The global-average fallback itself failed. Nothing is left to try.
#[derive(Debug, Error)]
#[error("critical error: {0}")]
pub struct CriticalError(#[source] pub EstimateError);
