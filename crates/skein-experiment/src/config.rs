//! Experiment configuration
//!
//! Loaded from a JSON file; every field has a default mirroring the
//! reference experiment setup, so a partial config is enough.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ExperimentError;

/// Parameters of a full experiment run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Max parent age the measured network runs with, in seconds.
    pub max_parent_age_secs: u64,
    /// Number of parents each spam message references.
    pub k: u32,
    /// Total message rates to sweep, in messages per second.
    pub mps_list: Vec<u64>,
    /// Attack phase length as a multiple of the max parent age.
    pub attack_duration_multiplier: u32,
    /// Width of one measurement interval, in seconds.
    pub measurement_interval_secs: u64,
    /// Honest-only spam length before and after each attack, in seconds.
    pub idle_spam_secs: u64,
    /// Per-node honest rate during the idle phases, messages per second.
    pub idle_honest_rate: u64,
    /// Adversary share of the total rate, one trial per entry.
    pub q_list: Vec<f64>,
    /// Honest node API base urls.
    pub honest_urls: Vec<String>,
    /// Adversary node API base url.
    pub adversary_url: String,
    /// Root directory for results and logs.
    pub results_dir: PathBuf,
    /// Label of this experiment series, part of the results path.
    pub label: String,
    /// How long to wait for an orphanage response, in seconds.
    pub response_timeout_secs: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            max_parent_age_secs: 60,
            k: 2,
            mps_list: vec![30, 40, 50, 60, 70, 80],
            attack_duration_multiplier: 10,
            measurement_interval_secs: 10,
            idle_spam_secs: 60,
            idle_honest_rate: 1,
            q_list: vec![0.48, 0.50, 0.55],
            honest_urls: vec![
                "http://localhost:8080".into(),
                "http://localhost:8090".into(),
                "http://localhost:8060".into(),
                "http://localhost:8050".into(),
                "http://localhost:8040".into(),
                "http://localhost:8030".into(),
                "http://localhost:8020".into(),
            ],
            adversary_url: "http://localhost:8070".into(),
            results_dir: PathBuf::from("./results"),
            label: "orphanage".into(),
            response_timeout_secs: 120,
        }
    }
}

impl ExperimentConfig {
    pub fn from_file(path: &Path) -> Result<Self, ExperimentError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn max_parent_age(&self) -> Duration {
        Duration::from_secs(self.max_parent_age_secs)
    }

    /// Attack phase length: multiplier times the max parent age.
    pub fn attack_duration(&self) -> Duration {
        self.max_parent_age() * self.attack_duration_multiplier
    }

    pub fn measurement_interval(&self) -> Duration {
        Duration::from_secs(self.measurement_interval_secs)
    }

    pub fn idle_spam_duration(&self) -> Duration {
        Duration::from_secs(self.idle_spam_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}
