//! Fair tip pool
//!
//! Maintains the set of messages currently eligible as parents and selects
//! parents uniformly at random. A tip enters the pool only while its age is
//! within the grace period, leaves it when its aged-eviction timer fires,
//! and (unless a tangle width is configured) loses tip status as soon as a
//! newly admitted message strongly references it.

use parking_lot::{Mutex, RwLock};
use rand::thread_rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use skein_core::{Clock, Message, MessageId, Payload};

use crate::config::{SolidifierConfig, TipManagerConfig};
use crate::error::{Result, TangleError};
use crate::executor::{ShutdownMode, TimedTaskExecutor};
use crate::factory::TipSelector;
use crate::random_map::RandomMap;
use crate::tangle::Tangle;

/// Payloads referencing more transactions than this skip the
/// direct-reference phase entirely.
const MAX_DIRECTLY_REFERENCED_TRANSACTIONS: usize = 8;

/// Number of widened selection retries for transaction payloads.
const SELECTION_RETRIES: usize = 5;

/// Event emitted when a message gains or loses tip status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TipEvent {
    Added(MessageId),
    Removed(MessageId),
}

type TipObserver = Box<dyn Fn(&TipEvent) + Send + Sync>;

/// Manages the fair tip pool and emits events for admission and eviction.
pub struct TipManager {
    tangle: Arc<Tangle>,
    tips: Arc<Mutex<RandomMap<MessageId>>>,
    tips_cleaner: Arc<TimedTaskExecutor<MessageId>>,
    config: TipManagerConfig,
    solidifier: SolidifierConfig,
    clock: Arc<dyn Clock>,
    observers: RwLock<Vec<TipObserver>>,
}

impl TipManager {
    pub fn new(
        tangle: Arc<Tangle>,
        tips_cleaner: Arc<TimedTaskExecutor<MessageId>>,
        config: TipManagerConfig,
        solidifier: SolidifierConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tangle,
            tips: Arc::new(Mutex::new(RandomMap::new())),
            tips_cleaner,
            config,
            solidifier,
            clock,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer for tip events. Observers run after the pool
    /// lock has been released and must not re-enter the manager.
    pub fn on_tip_event(&self, observer: impl Fn(&TipEvent) + Send + Sync + 'static) {
        self.observers.write().push(Box::new(observer));
    }

    /// Seed the pool with the given ids, bypassing admission checks.
    pub fn set(&self, tips: &[MessageId]) {
        let mut pool = self.tips.lock();
        for id in tips {
            pool.insert(*id);
        }
    }

    /// Admit a message to the tip pool if its issuing time is within the
    /// grace period. Strong parents of an admitted message lose tip status
    /// unless a tangle width is configured and not yet reached.
    pub fn add_tip(&self, message: &Message) {
        let grace_period = self.config.grace_period(&self.solidifier);
        let id = message.id();

        if self.clock.since(message.issuing_time()) > grace_period {
            debug!(message = %id, "message aged past the grace period, not a tip");
            return;
        }

        let mut events = Vec::new();
        let newly_added = self.tips.lock().insert(id);

        if newly_added {
            events.push(TipEvent::Added(id));
            // evict at issuing_time + grace_period, measured on our clock
            let remaining = grace_period.saturating_sub(self.clock.since(message.issuing_time()));
            let tips = Arc::clone(&self.tips);
            self.tips_cleaner.execute_after(id, remaining, move || {
                tips.lock().remove(&id);
            });
        }

        // skip removing tips while the tangle is kept wide
        if self.tip_count() <= self.config.tangle_width {
            self.dispatch(&events);
            return;
        }

        // a tip loses its status when another message strongly references it
        let mut removed = Vec::new();
        {
            let mut pool = self.tips.lock();
            for parent in message.strong_parents() {
                if pool.remove(parent) {
                    removed.push(*parent);
                }
            }
        }
        for parent in removed {
            self.tips_cleaner.cancel(&parent);
            events.push(TipEvent::Removed(parent));
        }

        self.dispatch(&events);
    }

    /// Select up to `count` parents. For transaction payloads, young enough
    /// attachments of the referenced transactions are referenced directly
    /// first; the rest is sampled uniformly from the pool. Pure query: pool
    /// state is untouched and no events fire.
    pub fn select_tips(&self, payload: Option<&Payload>, count: usize) -> Vec<MessageId> {
        let max_parents = self.config.max_parents_count;
        let mut count = count;
        let mut parents: Vec<MessageId> = Vec::with_capacity(max_parents);
        let mut seen: HashSet<MessageId> = HashSet::new();

        if let Some(essence) = payload.and_then(|p| p.as_transaction()) {
            let referenced = &essence.referenced_transactions;
            if referenced.len() <= MAX_DIRECTLY_REFERENCED_TRANSACTIONS {
                for tx in referenced {
                    // only one attachment per transaction needs referencing
                    for attachment in self.tangle.attachments_of_tx(tx) {
                        let Some(message) = self.tangle.message(&attachment) else {
                            continue;
                        };
                        if self.clock.since(message.issuing_time())
                            <= self.solidifier.max_parents_time_difference
                        {
                            if seen.insert(attachment) {
                                parents.push(attachment);
                            }
                            break;
                        }
                    }
                }
            } else {
                // too many inputs to reference directly; select as many
                // parents as possible and let the validation loop sort it out
                count = max_parents;
            }
        }

        if parents.len() == max_parents {
            return parents;
        }
        if count + parents.len() > max_parents {
            count = max_parents - parents.len();
        }

        let tips = self.tips.lock().random_unique_entries(count, &mut thread_rng());
        if tips.is_empty() {
            // attach to the genesis when the pool is empty and nothing was
            // referenced directly
            if parents.is_empty() {
                parents.push(MessageId::EMPTY);
            }
            return parents;
        }
        for tip in tips {
            if seen.insert(tip) {
                parents.push(tip);
            }
        }
        parents
    }

    /// Select parents with the count clamped to the configured bounds. For
    /// transaction payloads the selection is retried with a widened count
    /// until every referenced transaction lies in the past cone of the
    /// selected parents.
    pub fn tips(&self, payload: Option<&Payload>, count: usize) -> Result<Vec<MessageId>> {
        let count = count.clamp(self.config.min_parents_count, self.config.max_parents_count);
        let mut parents = self.select_tips(payload, count);

        if let Some(essence) = payload.and_then(|p| p.as_transaction()) {
            let mut tries = SELECTION_RETRIES;
            while !self
                .tangle
                .all_tx_approved_by(&essence.referenced_transactions, &parents)
            {
                if tries == 0 {
                    return Err(TangleError::SelectionExhausted {
                        tries: SELECTION_RETRIES,
                    });
                }
                tries -= 1;
                parents = self.select_tips(payload, self.config.max_parents_count);
            }
        }

        Ok(parents)
    }

    pub fn all_tips(&self) -> Vec<MessageId> {
        self.tips.lock().keys()
    }

    pub fn tip_count(&self) -> usize {
        self.tips.lock().len()
    }

    /// Stop the eviction timer service. Pending aged evictions are dropped.
    pub fn shutdown(&self) {
        self.tips_cleaner.shutdown(ShutdownMode::CancelPending);
    }

    fn dispatch(&self, events: &[TipEvent]) {
        if events.is_empty() {
            return;
        }
        let observers = self.observers.read();
        for event in events {
            for observer in observers.iter() {
                observer(event);
            }
        }
    }
}

impl TipSelector for TipManager {
    fn add_tip(&self, message: &Message) {
        TipManager::add_tip(self, message)
    }

    fn tips(&self, payload: Option<&Payload>, count: usize) -> Result<Vec<MessageId>> {
        TipManager::tips(self, payload, count)
    }

    fn tip_count(&self) -> usize {
        TipManager::tip_count(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tangle::testutil::*;
    use skein_core::{ManualClock, SystemClock, TransactionId};
    use std::time::Duration;

    fn manager_at(now_secs: u64) -> (TipManager, Arc<Tangle>, Arc<ManualClock>) {
        let tangle = Arc::new(Tangle::new());
        let clock = Arc::new(ManualClock::new(at_secs(now_secs)));
        let manager = TipManager::new(
            Arc::clone(&tangle),
            Arc::new(TimedTaskExecutor::new(1)),
            TipManagerConfig::default(),
            SolidifierConfig::default(),
            clock.clone(),
        );
        (manager, tangle, clock)
    }

    #[test]
    fn test_admission_within_grace_period() {
        let (manager, tangle, _) = manager_at(10_000);
        let message = data_message(issuer(1), at_secs(10_000), 0, &[MessageId::EMPTY]);
        tangle.attach(message.clone());

        manager.add_tip(&message);

        assert_eq!(manager.tip_count(), 1);
        assert!(manager.all_tips().contains(&message.id()));
    }

    #[test]
    fn test_grace_period_drop_leaves_pool_unchanged() {
        let (manager, tangle, _) = manager_at(10_000);
        // grace period is 29m; this message is 30m old
        let message = data_message(issuer(1), at_secs(10_000 - 1800), 0, &[MessageId::EMPTY]);
        tangle.attach(message.clone());

        manager.add_tip(&message);

        assert_eq!(manager.tip_count(), 0);
        assert_eq!(manager.tips_cleaner.pending_count(), 0);
    }

    #[test]
    fn test_readmission_is_idempotent() {
        let (manager, tangle, _) = manager_at(10_000);
        let message = data_message(issuer(1), at_secs(10_000), 0, &[MessageId::EMPTY]);
        tangle.attach(message.clone());

        manager.add_tip(&message);
        manager.add_tip(&message);

        assert_eq!(manager.tip_count(), 1);
    }

    #[test]
    fn test_passive_eviction_of_strong_parents() {
        let (manager, tangle, _) = manager_at(10_000);
        let parent = data_message(issuer(1), at_secs(10_000), 0, &[MessageId::EMPTY]);
        tangle.attach(parent.clone());
        manager.add_tip(&parent);

        let child = data_message(issuer(2), at_secs(10_001), 0, &[parent.id()]);
        tangle.attach(child.clone());
        manager.add_tip(&child);

        assert_eq!(manager.tip_count(), 1);
        assert!(!manager.all_tips().contains(&parent.id()));
        assert!(manager.all_tips().contains(&child.id()));
    }

    #[test]
    fn test_tangle_width_suppresses_passive_eviction() {
        let tangle = Arc::new(Tangle::new());
        let clock = Arc::new(ManualClock::new(at_secs(10_000)));
        let manager = TipManager::new(
            Arc::clone(&tangle),
            Arc::new(TimedTaskExecutor::new(1)),
            TipManagerConfig {
                tangle_width: 10,
                ..TipManagerConfig::default()
            },
            SolidifierConfig::default(),
            clock,
        );

        let parent = data_message(issuer(1), at_secs(10_000), 0, &[MessageId::EMPTY]);
        tangle.attach(parent.clone());
        manager.add_tip(&parent);
        let child = data_message(issuer(2), at_secs(10_001), 0, &[parent.id()]);
        tangle.attach(child.clone());
        manager.add_tip(&child);

        // both stay tips while the pool is narrower than the target width
        assert_eq!(manager.tip_count(), 2);
        assert!(manager.all_tips().contains(&parent.id()));
    }

    #[test]
    fn test_events_fire_in_admission_order() {
        let (manager, tangle, _) = manager_at(10_000);
        let events: Arc<Mutex<Vec<TipEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        manager.on_tip_event(move |event| sink.lock().push(*event));

        let parent = data_message(issuer(1), at_secs(10_000), 0, &[MessageId::EMPTY]);
        tangle.attach(parent.clone());
        manager.add_tip(&parent);
        let child = data_message(issuer(2), at_secs(10_001), 0, &[parent.id()]);
        tangle.attach(child.clone());
        manager.add_tip(&child);

        assert_eq!(
            *events.lock(),
            vec![
                TipEvent::Added(parent.id()),
                TipEvent::Added(child.id()),
                TipEvent::Removed(parent.id()),
            ]
        );
    }

    #[test]
    fn test_aged_eviction_fires() {
        // short real-time grace period: 300ms - 100ms = 200ms
        let tangle = Arc::new(Tangle::new());
        let manager = TipManager::new(
            Arc::clone(&tangle),
            Arc::new(TimedTaskExecutor::new(1)),
            TipManagerConfig {
                tip_life_grace_period_diff: Duration::from_millis(100),
                ..TipManagerConfig::default()
            },
            SolidifierConfig {
                max_parents_time_difference: Duration::from_millis(300),
            },
            Arc::new(SystemClock),
        );

        let message = data_message(issuer(1), std::time::SystemTime::now(), 0, &[MessageId::EMPTY]);
        tangle.attach(message.clone());
        manager.add_tip(&message);
        assert_eq!(manager.tip_count(), 1);

        std::thread::sleep(Duration::from_millis(900));
        assert_eq!(manager.tip_count(), 0);
    }

    #[test]
    fn test_empty_pool_selects_genesis() {
        let (manager, _, _) = manager_at(10_000);

        let parents = manager.select_tips(None, 2);
        assert_eq!(parents, vec![MessageId::EMPTY]);

        let parents = manager.tips(None, 2).unwrap();
        assert_eq!(parents, vec![MessageId::EMPTY]);
    }

    #[test]
    fn test_selection_is_clamped_and_unique() {
        let (manager, tangle, _) = manager_at(10_000);
        for seq in 0..20 {
            let message = data_message(issuer(1), at_secs(10_000), seq, &[MessageId::EMPTY]);
            tangle.attach(message.clone());
            manager.add_tip(&message);
        }

        // more than max_parents_count is clamped down
        let parents = manager.tips(None, 50).unwrap();
        assert_eq!(parents.len(), 8);
        let unique: HashSet<_> = parents.iter().collect();
        assert_eq!(unique.len(), 8);

        // below min_parents_count is widened up
        let parents = manager.tips(None, 0).unwrap();
        assert_eq!(parents.len(), 1);
    }

    #[test]
    fn test_selection_is_a_pure_query() {
        let (manager, tangle, _) = manager_at(10_000);
        for seq in 0..5 {
            let message = data_message(issuer(1), at_secs(10_000), seq, &[MessageId::EMPTY]);
            tangle.attach(message.clone());
            manager.add_tip(&message);
        }

        let before = manager.tip_count();
        for _ in 0..10 {
            manager.select_tips(None, 4);
        }
        assert_eq!(manager.tip_count(), before);
    }

    #[test]
    fn test_transaction_payload_references_attachment_directly() {
        let (manager, tangle, _) = manager_at(10_000);
        let consumed = TransactionId::from_content(b"consumed");
        let attachment = tx_message(
            issuer(1),
            at_secs(10_000 - 60),
            0,
            &[MessageId::EMPTY],
            consumed,
            vec![],
        );
        let attachment_id = attachment.id();
        tangle.attach(attachment);

        let tip = data_message(issuer(2), at_secs(10_000), 1, &[attachment_id]);
        tangle.attach(tip.clone());
        manager.add_tip(&tip);

        let payload = Payload::Transaction(skein_core::TransactionEssence {
            id: TransactionId::from_content(b"spender"),
            referenced_transactions: vec![consumed],
        });
        let parents = manager.tips(Some(&payload), 2).unwrap();

        assert!(parents.contains(&attachment_id));
    }

    #[test]
    fn test_many_referenced_transactions_bypass_direct_phase() {
        let (manager, tangle, _) = manager_at(10_000);

        // 9 consumed transactions, each with a young attachment
        let mut referenced = Vec::new();
        let mut attachment_ids = Vec::new();
        for i in 0..9u8 {
            let tx = TransactionId::from_content(&[i]);
            let attachment = tx_message(
                issuer(1),
                at_secs(10_000 - 60),
                i as u64,
                &[MessageId::EMPTY],
                tx,
                vec![],
            );
            attachment_ids.push(attachment.id());
            tangle.attach(attachment);
            referenced.push(tx);
        }

        // one tip covering all attachments transitively
        let mut tip_parents = attachment_ids.clone();
        tip_parents.truncate(8);
        let tip = data_message(issuer(2), at_secs(10_000), 100, &tip_parents);
        tangle.attach(tip.clone());
        manager.add_tip(&tip);

        let payload = Payload::Transaction(skein_core::TransactionEssence {
            id: TransactionId::from_content(b"spender"),
            referenced_transactions: referenced,
        });
        let parents = manager.select_tips(Some(&payload), 2);

        // the direct-reference phase was skipped: nothing but pool tips
        assert!(parents.iter().all(|p| !attachment_ids.contains(p)));
    }

    #[test]
    fn test_selection_exhaustion_after_retries() {
        let (manager, tangle, _) = manager_at(10_000);
        // the only tip does not cover the referenced transaction
        let tip = data_message(issuer(1), at_secs(10_000), 0, &[MessageId::EMPTY]);
        tangle.attach(tip.clone());
        manager.add_tip(&tip);

        let payload = Payload::Transaction(skein_core::TransactionEssence {
            id: TransactionId::from_content(b"spender"),
            referenced_transactions: vec![TransactionId::from_content(b"missing")],
        });
        let result = manager.tips(Some(&payload), 2);

        assert_eq!(
            result.unwrap_err(),
            TangleError::SelectionExhausted { tries: 5 }
        );
    }
}
