//! Client pools
//!
//! Groups the node clients of one role (honest or adversary), drives their
//! spammers fork-join style and tracks which members have died. A client
//! failure never aborts the other members; it marks the client dead and the
//! next liveness sweep evicts it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use skein_client::{Imif, NodeApi, RateUnit};

/// A named set of node clients with dead-member tracking.
pub struct ClientPool<A: NodeApi + 'static> {
    name: String,
    clients: Vec<Arc<A>>,
    dead: Arc<Vec<AtomicBool>>,
}

impl<A: NodeApi + 'static> ClientPool<A> {
    pub fn new(name: impl Into<String>, clients: Vec<A>) -> Self {
        let clients: Vec<Arc<A>> = clients.into_iter().map(Arc::new).collect();
        let dead = Arc::new((0..clients.len()).map(|_| AtomicBool::new(false)).collect());
        Self {
            name: name.into(),
            clients,
            dead,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The live clients with their pool indexes.
    pub fn alive_clients(&self) -> Vec<(usize, Arc<A>)> {
        self.clients
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.dead[*idx].load(Ordering::SeqCst))
            .map(|(idx, client)| (idx, Arc::clone(client)))
            .collect()
    }

    pub fn alive_count(&self) -> usize {
        self.dead
            .iter()
            .filter(|dead| !dead.load(Ordering::SeqCst))
            .count()
    }

    /// Spam with every live client at `rate_per_second` for `duration`.
    /// Fork-join: one task per client toggles the spammer on, waits out the
    /// duration and toggles it off again; this call returns once all tasks
    /// finished. Failing clients are logged and marked dead.
    pub async fn spam(&self, rate_per_second: u64, duration: Duration, imif: Imif) {
        let clients = self.alive_clients();
        info!(
            pool = %self.name,
            clients = clients.len(),
            rate = rate_per_second,
            ?duration,
            "spamming started"
        );

        let mut tasks = JoinSet::new();
        for (idx, client) in clients {
            let dead = Arc::clone(&self.dead);
            let name = self.name.clone();
            tasks.spawn(async move {
                if let Err(e) = client
                    .toggle_spammer(true, rate_per_second, RateUnit::Mps, imif)
                    .await
                {
                    warn!(pool = %name, client = idx, "failed to start spammer: {e}");
                    dead[idx].store(true, Ordering::SeqCst);
                    return;
                }
                tokio::time::sleep(duration).await;
                if let Err(e) = client
                    .toggle_spammer(false, rate_per_second, RateUnit::Mps, imif)
                    .await
                {
                    warn!(pool = %name, client = idx, "failed to stop spammer: {e}");
                    dead[idx].store(true, Ordering::SeqCst);
                }
            });
        }
        while tasks.join_next().await.is_some() {}

        info!(pool = %self.name, "spamming finished");
    }

    /// Probe every live client's sync state and tip pool; mark the failing
    /// ones dead.
    pub async fn remove_dead_clients(&self) {
        for (idx, client) in self.alive_clients() {
            let alive_by_sync = match client.info().await {
                Ok(info) => {
                    debug!(pool = %self.name, client = idx, synced = info.tangle_time.synced, "sync probe");
                    info.tangle_time.synced
                }
                Err(e) => {
                    warn!(pool = %self.name, client = idx, "info probe failed: {e}");
                    false
                }
            };
            let alive_by_tips = match client.diagnostics_tips_row_count().await {
                Ok(rows) => {
                    debug!(pool = %self.name, client = idx, tips = rows, "tip pool probe");
                    rows > 0
                }
                Err(e) => {
                    warn!(pool = %self.name, client = idx, "tips probe failed: {e}");
                    false
                }
            };
            if !alive_by_sync || !alive_by_tips {
                warn!(pool = %self.name, client = idx, "client is dead, removing it from the pool");
                self.dead[idx].store(true, Ordering::SeqCst);
            }
        }
    }

    /// Sweep dead clients, then report whether anyone is left.
    pub async fn is_alive(&self) -> bool {
        self.remove_dead_clients().await;
        self.alive_count() > 0
    }
}

/// True iff both pools still have live members.
pub async fn is_network_alive<A: NodeApi + 'static>(
    honest: &ClientPool<A>,
    adversary: &ClientPool<A>,
) -> bool {
    info!("checking the network status");
    let mut alive = true;
    if !honest.is_alive().await {
        warn!("honest part of the network is dead");
        alive = false;
    }
    if !adversary.is_alive().await {
        warn!("adversary is dead");
        alive = false;
    }
    alive
}
