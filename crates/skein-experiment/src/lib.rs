//! # Skein Experiment
//!
//! The outer loop of the orphanage study: drives synchronized spam phases
//! across honest and adversarial node clients, queries each honest node's
//! orphanage diagnostic after a trial and reduces the per-node responses
//! into a CSV result table.
//!
//! A trial runs idle -> attack -> idle, records the attack window, slices it
//! into measurement intervals and collects the first orphanage response that
//! arrives within the timeout. Dead clients are evicted between trials; the
//! run aborts only when an entire pool has died.

pub mod clients;
pub mod config;
pub mod controller;
pub mod error;
pub mod paths;
pub mod reducer;

pub use clients::{is_network_alive, ClientPool};
pub use config::ExperimentConfig;
pub use controller::{Controller, ExperimentParams};
pub use error::ExperimentError;
pub use reducer::{reduce, CSV_HEADER};
