use crate::store::StoreError;
use crate::transport::TransportError;

/// Result type for contest operations
pub type ContestResult<T> = Result<T, ContestError>;

/// Errors surfaced by the lifecycle, tally and moderation operations
#[derive(Debug, thiserror::Error)]
pub enum ContestError {
    /// Rejected input; nothing was mutated
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistence failed; chat side effects already performed are left as-is
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("Chat transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl ContestError {
    /// Short machine-readable code used in HTTP error bodies and logs
    pub fn code(&self) -> &'static str {
        match self {
            ContestError::Validation(_) => "VALIDATION",
            ContestError::NotFound(_) => "NOT_FOUND",
            ContestError::Storage(_) => "STORAGE",
            ContestError::Transport(_) => "TRANSPORT",
        }
    }
}
