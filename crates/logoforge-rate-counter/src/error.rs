//! Error vocabulary for RateCounter (C1) operations.

#[derive(Debug, thiserror::Error)]
pub enum RateCounterError {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RateCounterError {
    fn from(err: serde_json::Error) -> Self {
        RateCounterError::Serialization(err.to_string())
    }
}
