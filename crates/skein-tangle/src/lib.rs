//! # Skein Tangle
//!
//! The tangle-side machinery of the orphanage experiment framework:
//!
//! - `Tangle` - in-memory message store with approver and attachment indexes
//! - `TimedTaskExecutor` - keyed timer service backing aged tip eviction
//! - `TipManager` - the fair tip pool with uniform random selection
//! - `AdversaryTipManager` - the dual-pool attack variant that segregates
//!   adversary tips from honest tips and selects the oldest first
//! - `orphanage_walk` - breadth-first past-cone traversal bucketing issued
//!   and orphaned message counts per issuer across time intervals
//! - `MessageFactory` / `Spammer` - message issuance on top of either pool
//!
//! ## Tip lifecycle
//!
//! A message becomes a tip only while `now - issuing_time` stays within the
//! grace period (`max_parents_time_difference - tip_life_grace_period_diff`).
//! Admission schedules an aged eviction through the executor; in the fair
//! pool a tip additionally loses its status when a newly admitted message
//! strongly references it.

pub mod adversary;
pub mod config;
pub mod error;
pub mod executor;
pub mod factory;
pub mod random_map;
pub mod spammer;
pub mod tangle;
pub mod tipmanager;
pub mod walker;

pub use adversary::AdversaryTipManager;
pub use config::{AdversaryConfig, SolidifierConfig, TipManagerConfig};
pub use error::{Result, TangleError};
pub use executor::{ShutdownMode, TimedTaskExecutor};
pub use factory::{MessageFactory, TipSelector};
pub use random_map::RandomMap;
pub use spammer::{Imif, Spammer};
pub use tangle::{GradeOfFinality, MessageMetadata, Tangle};
pub use tipmanager::{TipEvent, TipManager};
pub use walker::{orphanage_walk, OrphanageReport, Walker};
