//! # Skein Core
//!
//! Shared building blocks for the skein tangle research workspace.
//!
//! This crate provides the fundamental types the rest of the workspace is
//! built on:
//! - `MessageId` / `TransactionId` / `NodeId` - 32-byte identifiers
//! - `Message` - the DAG message entity with typed parent blocks
//! - `Clock` - the wall-clock seam (system and manual implementations)
//! - `SkeinError` - typed validation errors
//!
//! ## Architecture
//!
//! A tangle is a DAG of messages where each message names one or more parent
//! messages across typed parent blocks (strong, weak, like, dislike). The
//! message entity here is deliberately codec-free: construction goes through
//! `MessageBuilder`, which enforces the structural invariants a wire codec
//! would normally guarantee.

pub mod clock;
pub mod error;
pub mod message;
pub mod types;

pub use clock::*;
pub use error::*;
pub use message::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::error::{Result, SkeinError};
    pub use crate::message::{Message, ParentType, ParentsBlock, Payload, TransactionEssence};
    pub use crate::types::{MessageId, NodeId, NodeIdentity, PublicKey, TransactionId};
}
