use thiserror::Error;

/// Why a flow did not produce its payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Caught before any request was sent (no file chosen).
    #[error("{0}")]
    Validation(String),
    /// The backend answered with `success: false`.
    #[error("{0}")]
    Application(String),
    /// The request failed on the wire or the body could not be decoded.
    #[error("{0}")]
    Transport(String),
    /// The action was a no-op: empty query, upload already running,
    /// declined confirmation, or a stale response.
    #[error("ignored: {0}")]
    Ignored(&'static str),
}

pub type FlowResult<T> = Result<T, FlowError>;

impl FlowError {
    /// Whether this outcome should be surfaced to the user at all.
    pub fn is_silent(&self) -> bool {
        matches!(self, FlowError::Ignored(_))
    }
}
