//! In-memory tangle storage
//!
//! Holds messages together with the two indexes the rest of the framework
//! consumes: approvers (forward edges, any parent type) and transaction
//! attachments. Solidification and signature checks are out of scope, so a
//! message may reference parents the store has never seen; `MessageId::EMPTY`
//! in particular acts as the genesis anchor every walk starts from.

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;

use skein_core::{Message, MessageId, Payload, TransactionId};

/// Confirmation grade attached to a message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum GradeOfFinality {
    #[default]
    None,
    Low,
    Medium,
    High,
}

/// Mutable per-message bookkeeping kept next to the immutable message.
#[derive(Clone, Copy, Debug, Default)]
pub struct MessageMetadata {
    pub grade_of_finality: GradeOfFinality,
}

/// In-memory message store with approver and attachment indexes.
#[derive(Default)]
pub struct Tangle {
    messages: RwLock<HashMap<MessageId, Message>>,
    metadata: RwLock<HashMap<MessageId, MessageMetadata>>,
    approvers: RwLock<HashMap<MessageId, Vec<MessageId>>>,
    attachments: RwLock<HashMap<TransactionId, Vec<MessageId>>>,
}

impl Tangle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a message and index its parent and attachment references.
    /// Re-attaching a known id is a no-op.
    pub fn attach(&self, message: Message) {
        let id = message.id();
        {
            let mut messages = self.messages.write();
            if messages.contains_key(&id) {
                return;
            }
            messages.insert(id, message.clone());
        }

        self.metadata.write().insert(id, MessageMetadata::default());

        {
            let mut approvers = self.approvers.write();
            for parent in message.parents() {
                approvers.entry(parent).or_default().push(id);
            }
        }

        if let Payload::Transaction(essence) = message.payload() {
            self.attachments
                .write()
                .entry(essence.id)
                .or_default()
                .push(id);
        }
    }

    pub fn message(&self, id: &MessageId) -> Option<Message> {
        self.messages.read().get(id).cloned()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.read().contains_key(id)
    }

    pub fn message_count(&self) -> usize {
        self.messages.read().len()
    }

    pub fn metadata(&self, id: &MessageId) -> Option<MessageMetadata> {
        self.metadata.read().get(id).copied()
    }

    /// Set the confirmation grade of a stored message. Returns false when
    /// the id is unknown.
    pub fn set_grade_of_finality(&self, id: &MessageId, grade: GradeOfFinality) -> bool {
        match self.metadata.write().get_mut(id) {
            Some(metadata) => {
                metadata.grade_of_finality = grade;
                true
            }
            None => false,
        }
    }

    /// Messages directly referencing `id` through any parent type.
    pub fn approvers(&self, id: &MessageId) -> Vec<MessageId> {
        self.approvers.read().get(id).cloned().unwrap_or_default()
    }

    /// Message ids carrying an attachment of the given transaction.
    pub fn attachments_of_tx(&self, tx: &TransactionId) -> Vec<MessageId> {
        self.attachments.read().get(tx).cloned().unwrap_or_default()
    }

    /// True iff every referenced transaction has at least one attachment in
    /// the combined past cone of the candidate parents.
    pub fn all_tx_approved_by(&self, referenced: &[TransactionId], parents: &[MessageId]) -> bool {
        if referenced.is_empty() {
            return true;
        }
        let cone = self.past_cone(parents);
        let attachments = self.attachments.read();
        referenced.iter().all(|tx| {
            attachments
                .get(tx)
                .map(|ids| ids.iter().any(|id| cone.contains(id)))
                .unwrap_or(false)
        })
    }

    /// Transitive ancestors of the given messages (inclusive), via any
    /// parent type.
    fn past_cone(&self, start: &[MessageId]) -> HashSet<MessageId> {
        let messages = self.messages.read();
        let mut visited: HashSet<MessageId> = HashSet::new();
        let mut queue: Vec<MessageId> = start.to_vec();

        while let Some(id) = queue.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(message) = messages.get(&id) {
                queue.extend(message.parents());
            }
        }
        visited
    }
}
