//! Error types of the experiment pipeline

use thiserror::Error;

use skein_client::ClientError;

/// Errors that can occur while driving an experiment run
#[derive(Error, Debug)]
pub enum ExperimentError {
    /// Node client failure
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Filesystem failure (results directory, CSV file)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writing failure
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration file could not be parsed
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// A client pool has no live members left
    #[error("the network is down: a client pool is empty")]
    NetworkDown,

    /// A trial produced no usable result
    #[error("no results for this trial: {0}")]
    NoResults(String),
}
