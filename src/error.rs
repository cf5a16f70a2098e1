use thiserror::Error;

use crate::api::ApiError;

/// Ways a generation pass can end without applying anything.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation cancelled")]
    Cancelled,

    #[error("Received an empty response from the AI.")]
    EmptyResponse,

    /// Request, relay status or stream read failure
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl GenerationError {
    /// The relay's structured error, when the failure was a non-2xx response.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            GenerationError::Transport(err) => err.downcast_ref::<ApiError>(),
            _ => None,
        }
    }
}
