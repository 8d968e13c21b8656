//! Error types for skein core operations

use thiserror::Error;

use crate::types::MessageId;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, SkeinError>;

/// Errors that can occur while constructing or validating core entities
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkeinError {
    // === Identifier parsing ===
    /// Not a Base58-encoded string
    #[error("failed to decode base58 encoded string: {0}")]
    InvalidBase58(String),

    /// Decoded id has the wrong length
    #[error("length of base58 formatted id is wrong: expected {expected} bytes, got {actual}")]
    InvalidIdLength { expected: usize, actual: usize },

    // === Parent block validation ===
    /// No strong parents block present
    #[error("message must declare a strong parents block")]
    MissingStrongParents,

    /// A parents block carries no references
    #[error("parents block of type {0} carries no references")]
    NoReferences(&'static str),

    /// Too many references in one block
    #[error("parents block of type {block_type} has {actual} references, maximum is {max}")]
    TooManyReferences {
        block_type: &'static str,
        actual: usize,
        max: usize,
    },

    /// References within a block are not sorted lexicographically
    #[error("references in parents block of type {0} are not sorted")]
    ReferencesNotSorted(&'static str),

    /// Duplicate reference within one block
    #[error("duplicate reference {0} in parents block")]
    DuplicateReference(MessageId),

    /// The same id appears across the strong/weak/dislike union
    #[error("reference {0} repeats across strong/weak/dislike blocks")]
    CrossBlockDuplicate(MessageId),

    /// Parents blocks are not in canonical type order
    #[error("parents blocks are not in strong < weak < like < dislike order")]
    BlocksOutOfOrder,

    /// The same block type appears twice
    #[error("parents block type {0} appears more than once")]
    DuplicateBlockType(&'static str),

    // === Builder ===
    /// A required builder field was not set
    #[error("message builder is missing field: {0}")]
    MissingField(&'static str),
}
