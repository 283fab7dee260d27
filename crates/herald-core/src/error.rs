use thiserror::Error;

use crate::types::ParseIdentifierError;

/// Errors surfaced to the operator for one intent.
///
/// Per-destination delivery failures are never represented here; they are
/// data inside a [`BroadcastReport`](crate::report::BroadcastReport).
#[derive(Debug, Error)]
pub enum HeraldError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid destination identifier: {0}")]
    InvalidIdentifier(#[from] ParseIdentifierError),

    #[error("Destination already registered: {id}")]
    DuplicateDestination { id: String },

    #[error("Destination not found: {selector}")]
    NotFound { selector: String },

    #[error("Invalid broadcast input: {0}")]
    InvalidInput(String),
}

impl HeraldError {
    /// Short stable code for logs and machine-readable replies.
    pub fn code(&self) -> &'static str {
        match self {
            HeraldError::Config(_) => "CONFIG_ERROR",
            HeraldError::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            HeraldError::DuplicateDestination { .. } => "DUPLICATE_DESTINATION",
            HeraldError::NotFound { .. } => "NOT_FOUND",
            HeraldError::InvalidInput(_) => "INVALID_INPUT",
        }
    }

    /// Validation errors are the operator's to fix; retrying the same intent
    /// will fail the same way.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            HeraldError::InvalidIdentifier(_)
                | HeraldError::DuplicateDestination { .. }
                | HeraldError::NotFound { .. }
                | HeraldError::InvalidInput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HeraldError>;
