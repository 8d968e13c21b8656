//! HTTP node client
//!
//! Thin reqwest wrapper over the node routes the experiment consumes. The
//! `NodeApi` trait narrows the surface to the calls the controller needs,
//! letting tests substitute in-process fakes for live nodes.

use async_trait::async_trait;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::{
    Imif, InfoResponse, OrphanageRequest, OrphanageResponse, RateUnit, SpamRequest, SpamResponse,
};

const ROUTE_INFO: &str = "info";
const ROUTE_SPAMMER: &str = "spammer";
const ROUTE_DIAGNOSTIC_TIPS: &str = "tools/diagnostic/tips";
const ROUTE_DIAGNOSTIC_ORPHANAGE: &str = "tools/diagnostic/orphanage";

/// Default per-request timeout; orphanage walks over a large tangle are slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Errors of the node client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The node answered with an error field
    #[error("node returned an error: {0}")]
    Api(String),

    /// Malformed CSV in a diagnostic response
    #[error("failed to parse diagnostic csv: {0}")]
    Csv(#[from] csv::Error),
}

/// The node calls the experiment controller is written against.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Node info; `tangle_time.synced` doubles as a liveness signal.
    async fn info(&self) -> Result<InfoResponse, ClientError>;

    /// Toggle the node's spammer. The rate is interpreted in `unit`; the
    /// wire value is whatever the caller computed, exactly once.
    async fn toggle_spammer(
        &self,
        on: bool,
        rate: u64,
        unit: RateUnit,
        imif: Imif,
    ) -> Result<SpamResponse, ClientError>;

    /// Run the orphanage diagnostic walk on the node's local tangle.
    async fn diagnostics_orphanage(
        &self,
        request: OrphanageRequest,
    ) -> Result<OrphanageResponse, ClientError>;

    /// Number of rows in the tips diagnostic; zero means a starved pool.
    async fn diagnostics_tips_row_count(&self) -> Result<usize, ClientError>;
}

/// reqwest-backed implementation of `NodeApi`.
pub struct NodeClient {
    base_url: String,
    http: reqwest::Client,
}

impl NodeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route)
    }

    /// Raw tips diagnostic as a CSV reader.
    pub async fn diagnostics_tips(
        &self,
    ) -> Result<csv::Reader<Cursor<Vec<u8>>>, ClientError> {
        let body = self
            .http
            .get(self.url(ROUTE_DIAGNOSTIC_TIPS))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(csv::Reader::from_reader(Cursor::new(body.to_vec())))
    }
}

#[async_trait]
impl NodeApi for NodeClient {
    async fn info(&self) -> Result<InfoResponse, ClientError> {
        let response: InfoResponse = self
            .http
            .get(self.url(ROUTE_INFO))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(error) = response.error {
            return Err(ClientError::Api(error));
        }
        Ok(response)
    }

    async fn toggle_spammer(
        &self,
        on: bool,
        rate: u64,
        unit: RateUnit,
        imif: Imif,
    ) -> Result<SpamResponse, ClientError> {
        let request = SpamRequest {
            cmd: if on { "start".into() } else { "stop".into() },
            rate,
            unit,
            imif,
        };
        debug!(
            cmd = %request.cmd,
            rate,
            unit = unit.as_str(),
            url = %self.base_url,
            "toggling spammer"
        );
        let response: SpamResponse = self
            .http
            .post(self.url(ROUTE_SPAMMER))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(error) = response.error {
            return Err(ClientError::Api(error));
        }
        Ok(response)
    }

    async fn diagnostics_orphanage(
        &self,
        request: OrphanageRequest,
    ) -> Result<OrphanageResponse, ClientError> {
        debug!(url = %self.base_url, route = ROUTE_DIAGNOSTIC_ORPHANAGE, "requesting orphanage diagnostic");
        let response: OrphanageResponse = self
            .http
            .get(self.url(ROUTE_DIAGNOSTIC_ORPHANAGE))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(error) = response.error {
            return Err(ClientError::Api(error));
        }
        Ok(response)
    }

    async fn diagnostics_tips_row_count(&self) -> Result<usize, ClientError> {
        let mut reader = self.diagnostics_tips().await?;
        let mut rows = 0usize;
        for record in reader.records() {
            record?;
            rows += 1;
        }
        Ok(rows)
    }
}
