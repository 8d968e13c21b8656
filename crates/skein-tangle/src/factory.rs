//! Message factory
//!
//! Issues well-formed messages on top of a tip selection policy: parents are
//! selected through the `TipSelector` seam, sorted and deduplicated into a
//! strong parents block, the message is attached to the tangle and handed
//! back to the selector for admission.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

use skein_core::{Clock, Message, NodeIdentity, ParentType, Payload};

use crate::error::Result;
use crate::tangle::Tangle;

/// The seam between message issuance and a tip pool policy. Implemented by
/// both the fair and the adversarial tip manager.
pub trait TipSelector: Send + Sync {
    /// Admit a message to the pool.
    fn add_tip(&self, message: &Message);

    /// Select parents for a new message carrying `payload`.
    fn tips(&self, payload: Option<&Payload>, count: usize) -> Result<Vec<skein_core::MessageId>>;

    /// Number of messages currently holding tip status.
    fn tip_count(&self) -> usize;
}

/// Issues messages for one node identity.
pub struct MessageFactory {
    identity: NodeIdentity,
    tangle: Arc<Tangle>,
    selector: Arc<dyn TipSelector>,
    clock: Arc<dyn Clock>,
    parents_count: usize,
    sequence: AtomicU64,
}

impl MessageFactory {
    pub fn new(
        identity: NodeIdentity,
        tangle: Arc<Tangle>,
        selector: Arc<dyn TipSelector>,
        clock: Arc<dyn Clock>,
        parents_count: usize,
    ) -> Self {
        Self {
            identity,
            tangle,
            selector,
            clock,
            parents_count,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Issue a message carrying `payload`: select parents, build, attach,
    /// and admit it to the local tip pool.
    pub fn issue_payload(&self, payload: Payload) -> Result<Message> {
        let mut parents = self.selector.tips(Some(&payload), self.parents_count)?;
        parents.sort();
        parents.dedup();

        let message = Message::builder()
            .issuer(self.identity.public_key)
            .issuing_time(self.clock.now())
            .sequence_number(self.sequence.fetch_add(1, Ordering::Relaxed))
            .parents_block(ParentType::Strong, parents)
            .payload(payload)
            .build()?;

        trace!(message = %message.id(), issuer = %self.identity.node_id.short(), "issued message");
        self.tangle.attach(message.clone());
        self.selector.add_tip(&message);
        Ok(message)
    }

    /// Issue an empty data message, the shape spam traffic takes.
    pub fn issue_data(&self) -> Result<Message> {
        self.issue_payload(Payload::Data(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SolidifierConfig, TipManagerConfig};
    use crate::executor::TimedTaskExecutor;
    use crate::tangle::testutil::at_secs;
    use crate::tipmanager::TipManager;
    use skein_core::{ManualClock, MessageId, PublicKey};

    fn world() -> (MessageFactory, Arc<Tangle>, Arc<TipManager>) {
        let tangle = Arc::new(Tangle::new());
        let clock = Arc::new(ManualClock::new(at_secs(10_000)));
        let manager = Arc::new(TipManager::new(
            Arc::clone(&tangle),
            Arc::new(TimedTaskExecutor::new(1)),
            TipManagerConfig::default(),
            SolidifierConfig::default(),
            clock.clone(),
        ));
        let identity = NodeIdentity::from_public_key(PublicKey::new([9u8; 32]));
        let factory = MessageFactory::new(
            identity,
            Arc::clone(&tangle),
            manager.clone() as Arc<dyn TipSelector>,
            clock,
            2,
        );
        (factory, tangle, manager)
    }

    #[test]
    fn test_first_message_attaches_to_genesis() {
        let (factory, tangle, manager) = world();

        let message = factory.issue_data().unwrap();

        assert_eq!(message.strong_parents(), &[MessageId::EMPTY]);
        assert!(tangle.contains(&message.id()));
        assert_eq!(manager.tip_count(), 1);
    }

    #[test]
    fn test_issuance_chains_onto_previous_tips() {
        let (factory, tangle, _) = world();

        let first = factory.issue_data().unwrap();
        let second = factory.issue_data().unwrap();

        assert_eq!(second.strong_parents(), &[first.id()]);
        assert_eq!(tangle.approvers(&first.id()), vec![second.id()]);
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let (factory, _, _) = world();

        let first = factory.issue_data().unwrap();
        let second = factory.issue_data().unwrap();

        assert_eq!(first.sequence_number(), 0);
        assert_eq!(second.sequence_number(), 1);
    }
}
