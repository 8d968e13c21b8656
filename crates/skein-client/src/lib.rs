//! # Skein Client
//!
//! HTTP client for the node APIs the experiment controller consumes: node
//! info, the spammer toggle and the orphanage / tips diagnostics. The
//! `NodeApi` trait is the seam the controller is written against, so tests
//! can exercise it with in-process fakes instead of live nodes.

pub mod client;
pub mod models;

pub use client::{ClientError, NodeApi, NodeClient};
pub use models::{
    Imif, InfoResponse, OrphanageRequest, OrphanageResponse, RateUnit, SpamRequest, SpamResponse,
    TangleTime,
};
