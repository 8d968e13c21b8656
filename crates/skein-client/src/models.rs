//! JSON models of the node APIs
//!
//! Instants travel as microseconds since the Unix epoch, message ids as
//! Base58 strings. Field names follow the node's camelCase JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

use skein_core::{unix_micros, MessageId};

/// Rate unit of the spammer toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateUnit {
    /// Messages per second.
    Mps,
    /// Messages per minute.
    Mpm,
}

impl RateUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateUnit::Mps => "mps",
            RateUnit::Mpm => "mpm",
        }
    }
}

/// Inter-message issuing function of the spammer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Imif {
    Unit,
    Poisson,
}

impl Imif {
    pub fn as_str(&self) -> &'static str {
        match self {
            Imif::Unit => "unit",
            Imif::Poisson => "poisson",
        }
    }
}

/// Request body of the spammer toggle.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpamRequest {
    pub cmd: String,
    pub rate: u64,
    pub unit: RateUnit,
    pub imif: Imif,
}

/// Response of the spammer toggle.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpamResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tangle time section of the node info response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TangleTime {
    pub synced: bool,
}

/// Node info response; only the fields the controller consumes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    #[serde(rename = "identityID", default)]
    pub identity_id: String,
    #[serde(rename = "identityIDShort", default)]
    pub identity_id_short: String,
    #[serde(default)]
    pub tangle_time: TangleTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request of the orphanage diagnostic.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanageRequest {
    #[serde(rename = "startMsgID", default, skip_serializing_if = "String::is_empty")]
    pub start_msg_id: String,
    pub start_time: i64,
    pub stop_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_points: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_start: Option<i64>,
}

impl OrphanageRequest {
    pub fn new(
        start_msg_id: MessageId,
        start_time: SystemTime,
        stop_time: SystemTime,
        measure_points: &[SystemTime],
    ) -> Self {
        Self {
            start_msg_id: start_msg_id.to_base58(),
            start_time: unix_micros(start_time),
            stop_time: unix_micros(stop_time),
            measure_points: if measure_points.is_empty() {
                None
            } else {
                Some(measure_points.iter().map(|t| unix_micros(*t)).collect())
            },
            cutoff_start: None,
        }
    }
}

/// Response of the orphanage diagnostic. The per-node lists have one entry
/// per measurement interval.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanageResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub creator_node_id: String,
    /// Max parent age of the answering node, in microseconds.
    pub max_parent_age: i64,
    pub orphans_by_node: HashMap<String, Vec<u64>>,
    pub issued_by_node: HashMap<String, Vec<u64>>,
    #[serde(rename = "lastMessageID")]
    pub last_message_id: String,
}
