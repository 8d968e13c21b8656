//! Adversarial tip pool
//!
//! The orphanage-attack variant of tip management. Instead of one uniformly
//! sampled pool it keeps two time-ordered lists, adversary-issued and
//! honest-issued tips, and always selects from the old end of the adversary
//! list. Selecting the oldest own tips raises the chance that the chosen
//! parents age out before any honest message references them, orphaning
//! them together with their descendants.

use parking_lot::{Mutex, RwLock};
use rand::{thread_rng, Rng};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

use hashbrown::HashMap;
use skein_core::{Clock, Message, MessageId, Payload, PublicKey};

use crate::config::{AdversaryConfig, SolidifierConfig, TipManagerConfig};
use crate::error::Result;
use crate::executor::{ShutdownMode, TimedTaskExecutor};
use crate::factory::TipSelector;
use crate::tangle::Tangle;
use crate::tipmanager::TipEvent;

type TipObserver = Box<dyn Fn(&TipEvent) + Send + Sync>;

/// Tip list ordered by issuing time descending: newest at the head, oldest
/// at the tail. Owns the timestamps of its entries.
struct OrderedTipList {
    ids: Vec<MessageId>,
    timestamps: HashMap<MessageId, SystemTime>,
    capacity: usize,
}

impl OrderedTipList {
    fn new(capacity: usize) -> Self {
        Self {
            ids: Vec::new(),
            timestamps: HashMap::new(),
            capacity,
        }
    }

    /// Insert keeping descending order. When the list overflows its
    /// capacity, one entry at a biased index is dropped.
    fn insert(&mut self, id: MessageId, timestamp: SystemTime) {
        self.timestamps.insert(id, timestamp);
        let idx = self
            .ids
            .partition_point(|existing| self.timestamps[existing] > timestamp);
        self.ids.insert(idx, id);

        if self.ids.len() > self.capacity {
            let index_to_remove = biased_removal_index(self.capacity);
            let removed = self.ids.remove(index_to_remove);
            self.timestamps.remove(&removed);
        }
    }

    /// Drop the oldest entry (the tail).
    fn remove_oldest(&mut self) {
        if let Some(id) = self.ids.pop() {
            self.timestamps.remove(&id);
        }
    }

    /// The `count` oldest entries, preserving list order (oldest last).
    fn tail(&self, count: usize) -> Vec<MessageId> {
        if self.ids.len() > count {
            self.ids[self.ids.len() - count..].to_vec()
        } else {
            self.ids.clone()
        }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn ids(&self) -> Vec<MessageId> {
        self.ids.clone()
    }
}

/// Removal index for an overflowing list, biased towards the newer end.
///
/// A uniform draw over the triangular numbers below `length - 1` is inverted
/// through the cumulative sum, giving index `i` a weight proportional to
/// `length - i`. Index 0 is out of range of the inversion and the caller
/// passes the capacity (one less than the momentary list length), so both
/// the newest entry and the oldest entry survive every overflow.
fn biased_removal_index(length: usize) -> usize {
    let last_index = (length - 1) as u64;
    let cdf = last_index * (last_index + 1) / 2;
    if cdf == 0 {
        return 0;
    }
    let x = thread_rng().gen_range(0..cdf) as f64;
    let inv_x = ((1.0 + 8.0 * x).sqrt() - 1.0) / 2.0;
    length - 1 - inv_x as usize
}

/// Tip manager variant mounting the orphanage attack.
///
/// Composes the shared tangle handle and eviction executor instead of
/// wrapping the fair manager; each of its two lists is a separate owning
/// value behind its own mutex.
pub struct AdversaryTipManager {
    tangle: Arc<Tangle>,
    tips_cleaner: Arc<TimedTaskExecutor<MessageId>>,
    local_key: PublicKey,
    adv_tips: Arc<Mutex<OrderedTipList>>,
    hon_tips: Arc<Mutex<OrderedTipList>>,
    config: TipManagerConfig,
    solidifier: SolidifierConfig,
    clock: Arc<dyn Clock>,
    observers: RwLock<Vec<TipObserver>>,
}

impl AdversaryTipManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tangle: Arc<Tangle>,
        tips_cleaner: Arc<TimedTaskExecutor<MessageId>>,
        local_key: PublicKey,
        config: TipManagerConfig,
        solidifier: SolidifierConfig,
        adversary: AdversaryConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tangle,
            tips_cleaner,
            local_key,
            adv_tips: Arc::new(Mutex::new(OrderedTipList::new(
                adversary.max_adversary_tip_pool_size,
            ))),
            hon_tips: Arc::new(Mutex::new(OrderedTipList::new(
                adversary.max_honest_tip_pool_size,
            ))),
            config,
            solidifier,
            clock,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer for tip events. Runs outside the list mutexes.
    pub fn on_tip_event(&self, observer: impl Fn(&TipEvent) + Send + Sync + 'static) {
        self.observers.write().push(Box::new(observer));
    }

    /// Admit a message into the adversary or honest list depending on its
    /// issuer. There is no reference-based eviction in either list; the
    /// aged-eviction timer drops the oldest entry of the list the tip went
    /// into.
    pub fn add_tip(&self, message: &Message) {
        let grace_period = self.config.grace_period(&self.solidifier);
        let id = message.id();
        let age = self.clock.since(message.issuing_time());

        if age > grace_period {
            debug!(message = %id, "message aged past the grace period, not a tip");
            return;
        }
        let remaining = grace_period.saturating_sub(age);

        let list = if message.issuer_public_key() == self.local_key {
            &self.adv_tips
        } else {
            &self.hon_tips
        };
        list.lock().insert(id, message.issuing_time());
        let list = Arc::clone(list);
        self.tips_cleaner.execute_after(id, remaining, move || {
            list.lock().remove_oldest();
        });

        self.dispatch(&TipEvent::Added(id));
    }

    /// Take up to `count` of the oldest adversary tips; when that leaves
    /// the result short of the minimum parent count, pad with the oldest
    /// honest tips. Honest tips are never referenced beyond that minimum.
    pub fn select_tips(&self, count: usize) -> Vec<MessageId> {
        let mut parents = Vec::with_capacity(self.config.max_parents_count);
        parents.extend(self.adv_tips.lock().tail(count));
        if parents.len() >= self.config.min_parents_count {
            return parents;
        }
        let tips_left = self.config.min_parents_count - parents.len();
        parents.extend(self.hon_tips.lock().tail(tips_left));
        parents
    }

    /// The attack always issues with the minimum number of parents; the
    /// payload plays no role in adversarial selection.
    pub fn tips(&self, _payload: Option<&Payload>, _count: usize) -> Result<Vec<MessageId>> {
        Ok(self.select_tips(self.config.min_parents_count))
    }

    pub fn all_tips(&self) -> Vec<MessageId> {
        let mut tips = self.hon_tips.lock().ids();
        tips.extend(self.adv_tips.lock().ids());
        tips
    }

    pub fn tip_count(&self) -> usize {
        self.adv_tips.lock().len() + self.hon_tips.lock().len()
    }

    pub fn adversary_tip_count(&self) -> usize {
        self.adv_tips.lock().len()
    }

    pub fn honest_tip_count(&self) -> usize {
        self.hon_tips.lock().len()
    }

    pub fn tangle(&self) -> &Arc<Tangle> {
        &self.tangle
    }

    /// Stop the eviction timer service. Pending aged evictions are dropped.
    pub fn shutdown(&self) {
        self.tips_cleaner.shutdown(ShutdownMode::CancelPending);
    }

    fn dispatch(&self, event: &TipEvent) {
        for observer in self.observers.read().iter() {
            observer(event);
        }
    }
}

impl TipSelector for AdversaryTipManager {
    fn add_tip(&self, message: &Message) {
        AdversaryTipManager::add_tip(self, message)
    }

    fn tips(&self, payload: Option<&Payload>, count: usize) -> Result<Vec<MessageId>> {
        AdversaryTipManager::tips(self, payload, count)
    }

    fn tip_count(&self) -> usize {
        AdversaryTipManager::tip_count(self)
    }
}
