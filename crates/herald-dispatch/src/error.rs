use thiserror::Error;

use herald_core::HeraldError;

/// Call-level dispatch failures. Individual delivery failures are not errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The snapshot or message is structurally unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<DispatchError> for HeraldError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::InvalidInput(msg) => HeraldError::InvalidInput(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
