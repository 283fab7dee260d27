use thiserror::Error;

use herald_core::{HeraldError, ParseIdentifierError};

/// Input-validation errors from registry operations. Never retried.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A destination with the same normalized identifier is already registered.
    #[error("Destination already registered: {id}")]
    DuplicateDestination { id: String },

    /// No destination matches the selector.
    #[error("Destination not found: {selector}")]
    NotFound { selector: String },

    /// Operator text could not be parsed as an identifier or selector.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ParseIdentifierError),
}

impl From<RegistryError> for HeraldError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::DuplicateDestination { id } => HeraldError::DuplicateDestination { id },
            RegistryError::NotFound { selector } => HeraldError::NotFound { selector },
            RegistryError::InvalidIdentifier(inner) => HeraldError::InvalidIdentifier(inner),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
