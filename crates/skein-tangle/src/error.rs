//! Error types for tangle operations

use thiserror::Error;

use skein_core::{MessageId, SkeinError};

/// Result type alias for tangle operations
pub type Result<T> = std::result::Result<T, TangleError>;

/// Errors that can occur in tangle storage, tip selection and the walker
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TangleError {
    /// Message not present in the store
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),

    /// Metadata entry not present in the store
    #[error("message metadata not found: {0}")]
    MetadataNotFound(MessageId),

    /// Tip selection could not cover all referenced transactions
    #[error("not able to make sure that all inputs are in the past cone of selected tips after {tries} tries")]
    SelectionExhausted { tries: usize },

    /// Walker interval boundaries are not strictly increasing inside the range
    #[error("invalid measurement boundaries: {0}")]
    InvalidBoundaries(String),

    /// Core entity validation failed
    #[error(transparent)]
    Invalid(#[from] SkeinError),
}
