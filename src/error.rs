use thiserror::Error;

/// Failures that cross the gateway boundary. Everything else degrades to the
/// fallback result inside the analyzer.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed caller input (400)
    #[error("{0}")]
    InvalidRequest(String),

    /// Anything not anticipated (500)
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn invalid(message: impl Into<String>) -> Self {
        GatewayError::InvalidRequest(message.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::InvalidRequest(_) => 400,
            GatewayError::Internal(_) => 500,
        }
    }
}
