//! In-process spammer
//!
//! Issues empty data messages at a configured rate through a message
//! factory, with either fixed or poisson inter-message intervals. This is
//! the local counterpart of the spammer the experiment controller toggles
//! on remote nodes; integration tests use it to close the loop in-process.

use rand::{thread_rng, Rng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

use crate::factory::MessageFactory;

/// Inter-message interval shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Imif {
    /// Fixed interval of `1 / rate`.
    Unit,
    /// Exponentially distributed intervals with mean `1 / rate`.
    Poisson,
}

impl Imif {
    fn next_interval(&self, rate_per_second: u64) -> Duration {
        let mean = 1.0 / rate_per_second as f64;
        match self {
            Imif::Unit => Duration::from_secs_f64(mean),
            Imif::Poisson => {
                let uniform: f64 = thread_rng().gen_range(f64::EPSILON..1.0);
                Duration::from_secs_f64(-uniform.ln() * mean)
            }
        }
    }
}

/// Spams empty data messages until stopped.
pub struct Spammer {
    factory: Arc<MessageFactory>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<u64>>,
}

impl Spammer {
    pub fn new(factory: Arc<MessageFactory>) -> Self {
        Self {
            factory,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Start issuing at `rate_per_second`. No-op if already running.
    pub fn start(&mut self, rate_per_second: u64, imif: Imif) {
        if rate_per_second == 0 || self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let factory = Arc::clone(&self.factory);
        let running = Arc::clone(&self.running);

        self.worker = Some(thread::spawn(move || {
            let mut issued = 0u64;
            while running.load(Ordering::SeqCst) {
                match factory.issue_data() {
                    Ok(_) => issued += 1,
                    Err(e) => warn!("spammer failed to issue message: {e}"),
                }
                thread::sleep(imif.next_interval(rate_per_second));
            }
            debug!(issued, "spammer stopped");
            issued
        }));
    }

    /// Stop issuing and return how many messages were issued.
    pub fn stop(&mut self) -> u64 {
        self.running.store(false, Ordering::SeqCst);
        self.worker
            .take()
            .and_then(|worker| worker.join().ok())
            .unwrap_or(0)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for Spammer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SolidifierConfig, TipManagerConfig};
    use crate::executor::TimedTaskExecutor;
    use crate::factory::TipSelector;
    use crate::tangle::Tangle;
    use crate::tipmanager::TipManager;
    use skein_core::{NodeIdentity, PublicKey, SystemClock};

    fn spammer() -> (Spammer, Arc<Tangle>) {
        let tangle = Arc::new(Tangle::new());
        let clock = Arc::new(SystemClock);
        let manager = Arc::new(TipManager::new(
            Arc::clone(&tangle),
            Arc::new(TimedTaskExecutor::new(1)),
            TipManagerConfig::default(),
            SolidifierConfig::default(),
            clock.clone(),
        ));
        let factory = Arc::new(MessageFactory::new(
            NodeIdentity::from_public_key(PublicKey::new([3u8; 32])),
            Arc::clone(&tangle),
            manager as Arc<dyn TipSelector>,
            clock,
            2,
        ));
        (Spammer::new(factory), tangle)
    }

    #[test]
    fn test_spammer_issues_messages_until_stopped() {
        let (mut spammer, tangle) = spammer();

        spammer.start(200, Imif::Unit);
        assert!(spammer.is_running());
        std::thread::sleep(Duration::from_millis(300));
        let issued = spammer.stop();

        assert!(!spammer.is_running());
        assert!(issued > 0);
        assert_eq!(tangle.message_count() as u64, issued);

        let after = tangle.message_count();
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(tangle.message_count(), after);
    }

    #[test]
    fn test_poisson_intervals_have_the_right_scale() {
        let total: Duration = (0..2000)
            .map(|_| Imif::Poisson.next_interval(100))
            .sum();
        let mean_ms = total.as_secs_f64() * 1000.0 / 2000.0;

        // mean of Exp(rate=100/s) is 10ms
        assert!((5.0..20.0).contains(&mean_ms), "mean interval {mean_ms}ms");
    }

    #[test]
    fn test_zero_rate_does_not_start() {
        let (mut spammer, _) = spammer();
        spammer.start(0, Imif::Unit);
        assert!(!spammer.is_running());
    }
}
