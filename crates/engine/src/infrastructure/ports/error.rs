//! Error types for port operations.

/// Failure talking to one of the community site's services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The request could not be sent or returned a failure status.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The service answered with a body the engine cannot interpret.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Service unavailable")]
    Unavailable,
}

impl ServiceError {
    pub fn request(message: impl ToString) -> Self {
        Self::RequestFailed(message.to_string())
    }

    pub fn invalid_response(message: impl ToString) -> Self {
        Self::InvalidResponse(message.to_string())
    }
}
