//! Tip pool and solidifier parameters
//!
//! Modeled as plain configuration structs threaded through constructors; no
//! process-wide mutable globals.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters of the tip manager.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TipManagerConfig {
    /// Minimum number of parents each message must reference.
    pub min_parents_count: usize,
    /// Maximum number of parents each message may reference.
    pub max_parents_count: usize,
    /// Subtracted from the max parent age to form the admission horizon,
    /// so tips leave the pool before they become unreferencable.
    pub tip_life_grace_period_diff: Duration,
    /// Number of tips the pool tries to maintain; 0 disables the width
    /// check and keeps passive eviction always on.
    pub tangle_width: usize,
}

impl Default for TipManagerConfig {
    fn default() -> Self {
        Self {
            min_parents_count: 1,
            max_parents_count: 8,
            tip_life_grace_period_diff: Duration::from_secs(60),
            tangle_width: 0,
        }
    }
}

/// Parameters of the solidifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SolidifierConfig {
    /// The biggest allowed time difference between a message and its parents.
    pub max_parents_time_difference: Duration,
}

impl Default for SolidifierConfig {
    fn default() -> Self {
        Self {
            max_parents_time_difference: Duration::from_secs(30 * 60),
        }
    }
}

impl TipManagerConfig {
    /// Admission horizon: a message older than this is never admitted as tip.
    pub fn grace_period(&self, solidifier: &SolidifierConfig) -> Duration {
        solidifier
            .max_parents_time_difference
            .saturating_sub(self.tip_life_grace_period_diff)
    }
}

/// Parameters of the adversarial tip manager.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AdversaryConfig {
    /// Whether the orphanage attack variant is active.
    pub orphanage_enabled: bool,
    /// Capacity of the adversary-issued tip list.
    pub max_adversary_tip_pool_size: usize,
    /// Capacity of the honest-issued tip list.
    pub max_honest_tip_pool_size: usize,
}

impl Default for AdversaryConfig {
    fn default() -> Self {
        Self {
            orphanage_enabled: false,
            max_adversary_tip_pool_size: 2000,
            max_honest_tip_pool_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grace_period() {
        let tip = TipManagerConfig::default();
        let solidifier = SolidifierConfig::default();

        assert_eq!(
            tip.grace_period(&solidifier),
            Duration::from_secs(29 * 60)
        );
    }

    #[test]
    fn test_defaults_match_node_parameters() {
        let tip = TipManagerConfig::default();
        assert_eq!(tip.min_parents_count, 1);
        assert_eq!(tip.max_parents_count, 8);
        assert_eq!(tip.tangle_width, 0);

        let adversary = AdversaryConfig::default();
        assert!(!adversary.orphanage_enabled);
        assert_eq!(adversary.max_adversary_tip_pool_size, 2000);
        assert_eq!(adversary.max_honest_tip_pool_size, 100);
    }
}
