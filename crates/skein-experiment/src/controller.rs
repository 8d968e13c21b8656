//! Experiment controller
//!
//! Runs the orphanage experiment matrix: for every total message rate and
//! every adversary share q, drive an idle / attack / idle spam cycle,
//! collect the orphanage diagnostic from the honest nodes and append the
//! reduced rows to the per-rate CSV.

use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use skein_client::{Imif, NodeApi, OrphanageRequest};
use skein_core::MessageId;

use crate::clients::{is_network_alive, ClientPool};
use crate::config::ExperimentConfig;
use crate::error::ExperimentError;
use crate::paths::create_results_dir;
use crate::reducer::{reduce, CSV_HEADER};

/// Parameters and recorded times of a single trial.
#[derive(Clone, Debug)]
pub struct ExperimentParams {
    pub exp_id: usize,
    pub q: f64,
    pub mps: u64,
    pub k: u32,
    pub max_parent_age: Duration,
    pub attack_duration: Duration,
    pub adversary_id: String,
    pub start_time: SystemTime,
    pub stop_time: SystemTime,
    pub measure_points: Vec<SystemTime>,
}

impl ExperimentParams {
    fn new(config: &ExperimentConfig, exp_id: usize, q: f64, mps: u64) -> Self {
        Self {
            exp_id,
            q,
            mps,
            k: config.k,
            max_parent_age: config.max_parent_age(),
            attack_duration: config.attack_duration(),
            adversary_id: String::new(),
            start_time: SystemTime::UNIX_EPOCH,
            stop_time: SystemTime::UNIX_EPOCH,
            measure_points: Vec::new(),
        }
    }
}

/// Per-node honest rate and total adversary rate for a trial, in messages
/// per second. Both are floored.
pub fn calculate_rates(mps: u64, q: f64, honest_count: usize) -> (u64, u64) {
    let honest = (mps as f64 * (1.0 - q) / honest_count.max(1) as f64) as u64;
    let adversary = (mps as f64 * q) as u64;
    (honest, adversary)
}

/// Interval boundaries: every `interval` step strictly inside the window.
pub fn measure_points(
    start: SystemTime,
    stop: SystemTime,
    interval: Duration,
) -> Vec<SystemTime> {
    let mut points = Vec::new();
    let mut current = start + interval;
    while current < stop {
        points.push(current);
        current += interval;
    }
    points
}

/// Drives experiment runs over a pool of honest clients and an adversary.
pub struct Controller<A: NodeApi + 'static> {
    config: ExperimentConfig,
    honest: ClientPool<A>,
    adversary: ClientPool<A>,
}

impl<A: NodeApi + 'static> Controller<A> {
    pub fn new(config: ExperimentConfig, honest: ClientPool<A>, adversary: ClientPool<A>) -> Self {
        Self {
            config,
            honest,
            adversary,
        }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Run the full matrix: one results directory and CSV per total rate,
    /// one trial per q value. Aborts when a whole client pool dies.
    pub async fn run(&self) -> Result<(), ExperimentError> {
        for mps in self.config.mps_list.clone() {
            let results_dir = create_results_dir(
                &self.config.results_dir,
                self.config.k,
                &self.config.label,
            )?;
            info!(path = %results_dir.display(), "created results folder");
            info!(
                max_parent_age = ?self.config.max_parent_age(),
                k = self.config.k,
                mps,
                attack_duration = ?self.config.attack_duration(),
                measurement_interval = ?self.config.measurement_interval(),
                idle_spam = ?self.config.idle_spam_duration(),
                qs = ?self.config.q_list,
                "experiment parameters"
            );

            let file_name = format!(
                "orphanage-age_{}s-k_{}-mps_{}-ad_{}-{}.csv",
                self.config.max_parent_age_secs,
                self.config.k,
                mps,
                self.config.attack_duration_multiplier,
                chrono::Local::now().format("%d%m%y_%I%M%S%p"),
            );
            let mut writer = csv::Writer::from_path(results_dir.join(file_name))?;
            writer.write_record(CSV_HEADER)?;

            self.run_trials(mps, &mut writer).await?;
        }
        Ok(())
    }

    async fn run_trials<W: std::io::Write>(
        &self,
        mps: u64,
        writer: &mut csv::Writer<W>,
    ) -> Result<(), ExperimentError> {
        let experiment_start = SystemTime::now();
        for (exp_id, q) in self.config.q_list.clone().into_iter().enumerate() {
            info!(exp_id, q, mps, "experiment trial started");

            if !is_network_alive(&self.honest, &self.adversary).await {
                error!(
                    elapsed = ?experiment_start.elapsed().unwrap_or_default(),
                    "the network is down, aborting the run"
                );
                return Err(ExperimentError::NetworkDown);
            }

            let mut params = ExperimentParams::new(&self.config, exp_id, q, mps);
            match self.run_trial(&mut params).await {
                Ok(rows) => {
                    info!(exp_id, rows = rows.len(), "writing trial results");
                    for row in rows {
                        writer.write_record(&row)?;
                    }
                    writer.flush()?;
                }
                // a lost trial never kills the run; the next q still gets
                // its chance
                Err(e) => warn!(exp_id, "trial result dropped: {e}"),
            }
            info!(exp_id, "experiment trial finished");
        }
        Ok(())
    }

    /// One trial: idle spam, the attack itself, idle tail, then collection.
    async fn run_trial(
        &self,
        params: &mut ExperimentParams,
    ) -> Result<Vec<Vec<String>>, ExperimentError> {
        let (_, adversary_client) = self
            .adversary
            .alive_clients()
            .into_iter()
            .next()
            .ok_or(ExperimentError::NetworkDown)?;
        params.adversary_id = adversary_client.info().await?.identity_id_short;

        let (honest_rate, adversary_rate) =
            calculate_rates(params.mps, params.q, self.honest.alive_count());

        self.idle_spam().await;

        info!(
            q = params.q,
            mps = params.mps,
            adversary = %params.adversary_id,
            honest_rate,
            adversary_rate,
            "starting the orphanage attack"
        );
        let start_time = SystemTime::now();
        tokio::join!(
            self.honest
                .spam(honest_rate, params.attack_duration, Imif::Unit),
            self.adversary
                .spam(adversary_rate, params.attack_duration, Imif::Unit),
        );
        let stop_time = SystemTime::now();
        info!("attack finished");

        params.start_time = start_time;
        params.stop_time = stop_time;
        params.measure_points =
            measure_points(start_time, stop_time, self.config.measurement_interval());

        self.idle_spam().await;

        self.collect_results(params).await
    }

    /// Honest-only activity before and after an attack, letting the tangle
    /// settle.
    async fn idle_spam(&self) {
        info!(
            duration = ?self.config.idle_spam_duration(),
            rate = self.config.idle_honest_rate,
            "idle period, honest activity messages only"
        );
        self.honest
            .spam(
                self.config.idle_honest_rate,
                self.config.idle_spam_duration(),
                Imif::Poisson,
            )
            .await;
    }

    /// Query every honest client in parallel; the first successful response
    /// within the timeout wins, everything else is discarded.
    async fn collect_results(
        &self,
        params: &ExperimentParams,
    ) -> Result<Vec<Vec<String>>, ExperimentError> {
        info!("requesting orphanage data from honest nodes");
        let request = OrphanageRequest::new(
            MessageId::EMPTY,
            params.start_time,
            params.stop_time,
            &params.measure_points,
        );

        let clients = self.honest.alive_clients();
        let (tx, mut rx) = mpsc::channel(clients.len().max(1));
        for (idx, client) in clients {
            let tx = tx.clone();
            let request = request.clone();
            tokio::spawn(async move {
                let query_start = SystemTime::now();
                match client.diagnostics_orphanage(request).await {
                    Ok(response) => {
                        info!(
                            client = idx,
                            elapsed = ?query_start.elapsed().unwrap_or_default(),
                            "orphanage response received"
                        );
                        let _ = tx.send(response).await;
                    }
                    Err(e) => warn!(client = idx, "orphanage query failed: {e}"),
                }
            });
        }
        drop(tx);

        match tokio::time::timeout(self.config.response_timeout(), rx.recv()).await {
            Ok(Some(response)) => reduce(params, &response),
            Ok(None) => Err(ExperimentError::NoResults(
                "every orphanage query failed".into(),
            )),
            Err(_) => Err(ExperimentError::NoResults(
                "response not received in time".into(),
            )),
        }
    }
}
