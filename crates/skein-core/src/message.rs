//! The message entity and its typed parent blocks
//!
//! A message references earlier messages through up to four typed parent
//! blocks. The wire codec normally guarantees the structural invariants of
//! those blocks; since this workspace never touches the binary format, the
//! same invariants are enforced here at construction time instead:
//!
//! - a strong block with at least one reference is mandatory
//! - each block holds 1..=MAX_REFERENCES_PER_BLOCK references, sorted
//!   lexicographically and pairwise distinct
//! - block types appear at most once, in strong < weak < like < dislike order
//! - an id never repeats across the strong/weak/dislike union (strong+like
//!   duplicates are permitted)

use std::collections::HashSet;
use std::time::SystemTime;

use crate::clock::unix_micros;
use crate::error::{Result, SkeinError};
use crate::types::{MessageId, PublicKey, TransactionId};

/// Maximum number of references a single parents block may carry.
pub const MAX_REFERENCES_PER_BLOCK: usize = 8;

/// The four typed parent sets a message may declare, in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParentType {
    Strong,
    Weak,
    Like,
    Dislike,
}

impl ParentType {
    pub fn name(&self) -> &'static str {
        match self {
            ParentType::Strong => "strong",
            ParentType::Weak => "weak",
            ParentType::Like => "like",
            ParentType::Dislike => "dislike",
        }
    }
}

/// One typed block of parent references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentsBlock {
    pub parent_type: ParentType,
    pub references: Vec<MessageId>,
}

impl ParentsBlock {
    pub fn new(parent_type: ParentType, references: Vec<MessageId>) -> Self {
        Self {
            parent_type,
            references,
        }
    }
}

/// Message payload. Only the transaction variant influences tip selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Data(Vec<u8>),
    Transaction(TransactionEssence),
}

impl Payload {
    pub fn is_transaction(&self) -> bool {
        matches!(self, Payload::Transaction(_))
    }

    pub fn as_transaction(&self) -> Option<&TransactionEssence> {
        match self {
            Payload::Transaction(essence) => Some(essence),
            Payload::Data(_) => None,
        }
    }
}

/// The ledger-facing part of a transaction payload: its own id and the
/// transactions consumed by its inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionEssence {
    pub id: TransactionId,
    pub referenced_transactions: Vec<TransactionId>,
}

/// A message in the tangle. Immutable after construction.
#[derive(Clone, Debug)]
pub struct Message {
    id: MessageId,
    issuer_public_key: PublicKey,
    issuing_time: SystemTime,
    sequence_number: u64,
    parents_blocks: Vec<ParentsBlock>,
    payload: Payload,
}

impl Message {
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn issuer_public_key(&self) -> PublicKey {
        self.issuer_public_key
    }

    pub fn issuing_time(&self) -> SystemTime {
        self.issuing_time
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn parents_blocks(&self) -> &[ParentsBlock] {
        &self.parents_blocks
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// References of the block with the given type, empty if absent.
    pub fn parents_by_type(&self, parent_type: ParentType) -> &[MessageId] {
        self.parents_blocks
            .iter()
            .find(|b| b.parent_type == parent_type)
            .map(|b| b.references.as_slice())
            .unwrap_or(&[])
    }

    pub fn strong_parents(&self) -> &[MessageId] {
        self.parents_by_type(ParentType::Strong)
    }

    /// Union of references across all blocks, deduplicated.
    pub fn parents(&self) -> Vec<MessageId> {
        let mut seen = HashSet::new();
        let mut parents = Vec::new();
        for block in &self.parents_blocks {
            for id in &block.references {
                if seen.insert(*id) {
                    parents.push(*id);
                }
            }
        }
        parents
    }
}

/// Builder that validates the parent-block invariants on `build`.
#[derive(Default)]
pub struct MessageBuilder {
    issuer_public_key: Option<PublicKey>,
    issuing_time: Option<SystemTime>,
    sequence_number: u64,
    parents_blocks: Vec<ParentsBlock>,
    payload: Option<Payload>,
}

impl MessageBuilder {
    pub fn issuer(mut self, public_key: PublicKey) -> Self {
        self.issuer_public_key = Some(public_key);
        self
    }

    pub fn issuing_time(mut self, issuing_time: SystemTime) -> Self {
        self.issuing_time = Some(issuing_time);
        self
    }

    pub fn sequence_number(mut self, sequence_number: u64) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    /// Append a parents block. Blocks must be appended in canonical order;
    /// `build` rejects out-of-order or duplicate block types.
    pub fn parents_block(mut self, parent_type: ParentType, references: Vec<MessageId>) -> Self {
        self.parents_blocks
            .push(ParentsBlock::new(parent_type, references));
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn build(self) -> Result<Message> {
        let issuer_public_key = self
            .issuer_public_key
            .ok_or(SkeinError::MissingField("issuer"))?;
        let issuing_time = self
            .issuing_time
            .ok_or(SkeinError::MissingField("issuing_time"))?;
        let payload = self.payload.ok_or(SkeinError::MissingField("payload"))?;

        validate_parents_blocks(&self.parents_blocks)?;

        let id = compute_message_id(
            &issuer_public_key,
            issuing_time,
            self.sequence_number,
            &self.parents_blocks,
            &payload,
        );

        Ok(Message {
            id,
            issuer_public_key,
            issuing_time,
            sequence_number: self.sequence_number,
            parents_blocks: self.parents_blocks,
            payload,
        })
    }
}

fn validate_parents_blocks(blocks: &[ParentsBlock]) -> Result<()> {
    if blocks.is_empty() || blocks[0].parent_type != ParentType::Strong {
        return Err(SkeinError::MissingStrongParents);
    }

    let mut previous: Option<ParentType> = None;
    for block in blocks {
        if let Some(prev) = previous {
            if block.parent_type == prev {
                return Err(SkeinError::DuplicateBlockType(block.parent_type.name()));
            }
            if block.parent_type < prev {
                return Err(SkeinError::BlocksOutOfOrder);
            }
        }
        previous = Some(block.parent_type);

        if block.references.is_empty() {
            return Err(SkeinError::NoReferences(block.parent_type.name()));
        }
        if block.references.len() > MAX_REFERENCES_PER_BLOCK {
            return Err(SkeinError::TooManyReferences {
                block_type: block.parent_type.name(),
                actual: block.references.len(),
                max: MAX_REFERENCES_PER_BLOCK,
            });
        }
        for pair in block.references.windows(2) {
            match pair[0].cmp(&pair[1]) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => {
                    return Err(SkeinError::DuplicateReference(pair[0]));
                }
                std::cmp::Ordering::Greater => {
                    return Err(SkeinError::ReferencesNotSorted(block.parent_type.name()));
                }
            }
        }
    }

    // an id may repeat across strong+like, but never across strong/weak/dislike
    let mut seen = HashSet::new();
    for block in blocks {
        if block.parent_type == ParentType::Like {
            continue;
        }
        for id in &block.references {
            if !seen.insert(*id) {
                return Err(SkeinError::CrossBlockDuplicate(*id));
            }
        }
    }

    Ok(())
}

fn compute_message_id(
    issuer: &PublicKey,
    issuing_time: SystemTime,
    sequence_number: u64,
    blocks: &[ParentsBlock],
    payload: &Payload,
) -> MessageId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(issuer.as_bytes());
    hasher.update(&unix_micros(issuing_time).to_le_bytes());
    hasher.update(&sequence_number.to_le_bytes());
    for block in blocks {
        hasher.update(&[block.parent_type as u8]);
        for reference in &block.references {
            hasher.update(reference.as_bytes());
        }
    }
    match payload {
        Payload::Data(data) => {
            hasher.update(&[0u8]);
            hasher.update(data);
        }
        Payload::Transaction(essence) => {
            hasher.update(&[1u8]);
            hasher.update(essence.id.as_bytes());
            for tx in &essence.referenced_transactions {
                hasher.update(tx.as_bytes());
            }
        }
    }
    MessageId::new(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn sorted_ids(count: usize) -> Vec<MessageId> {
        let mut ids: Vec<MessageId> = (0..count)
            .map(|i| MessageId::from_content(&(i as u64).to_le_bytes()))
            .collect();
        ids.sort();
        ids
    }

    fn base_builder() -> MessageBuilder {
        Message::builder()
            .issuer(PublicKey::new([1u8; 32]))
            .issuing_time(UNIX_EPOCH)
            .payload(Payload::Data(Vec::new()))
    }

    #[test]
    fn test_build_with_strong_parents() {
        let parents = sorted_ids(2);
        let message = base_builder()
            .parents_block(ParentType::Strong, parents.clone())
            .build()
            .unwrap();

        assert_eq!(message.strong_parents(), parents.as_slice());
        assert_ne!(message.id(), MessageId::EMPTY);
    }

    #[test]
    fn test_missing_strong_block_rejected() {
        let result = base_builder()
            .parents_block(ParentType::Weak, sorted_ids(1))
            .build();

        assert_eq!(result.unwrap_err(), SkeinError::MissingStrongParents);
    }

    #[test]
    fn test_too_many_references_rejected() {
        let result = base_builder()
            .parents_block(ParentType::Strong, sorted_ids(MAX_REFERENCES_PER_BLOCK + 1))
            .build();

        assert!(matches!(
            result,
            Err(SkeinError::TooManyReferences { actual: 9, .. })
        ));
    }

    #[test]
    fn test_unsorted_references_rejected() {
        let mut parents = sorted_ids(3);
        parents.reverse();
        let result = base_builder()
            .parents_block(ParentType::Strong, parents)
            .build();

        assert_eq!(result.unwrap_err(), SkeinError::ReferencesNotSorted("strong"));
    }

    #[test]
    fn test_duplicate_reference_rejected() {
        let id = sorted_ids(1)[0];
        let result = base_builder()
            .parents_block(ParentType::Strong, vec![id, id])
            .build();

        assert_eq!(result.unwrap_err(), SkeinError::DuplicateReference(id));
    }

    #[test]
    fn test_blocks_out_of_order_rejected() {
        let parents = sorted_ids(1);
        let result = base_builder()
            .parents_block(ParentType::Strong, parents.clone())
            .parents_block(ParentType::Dislike, parents.clone())
            .parents_block(ParentType::Weak, parents)
            .build();

        assert_eq!(result.unwrap_err(), SkeinError::BlocksOutOfOrder);
    }

    #[test]
    fn test_duplicate_block_type_rejected() {
        let parents = sorted_ids(1);
        let result = base_builder()
            .parents_block(ParentType::Strong, parents.clone())
            .parents_block(ParentType::Strong, parents)
            .build();

        assert_eq!(result.unwrap_err(), SkeinError::DuplicateBlockType("strong"));
    }

    #[test]
    fn test_strong_like_duplicates_permitted() {
        let parents = sorted_ids(2);
        let result = base_builder()
            .parents_block(ParentType::Strong, parents.clone())
            .parents_block(ParentType::Like, parents)
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_strong_weak_duplicates_rejected() {
        let parents = sorted_ids(2);
        let result = base_builder()
            .parents_block(ParentType::Strong, parents.clone())
            .parents_block(ParentType::Weak, parents.clone())
            .build();

        assert_eq!(
            result.unwrap_err(),
            SkeinError::CrossBlockDuplicate(parents[0])
        );
    }

    #[test]
    fn test_parents_union_deduplicates() {
        let parents = sorted_ids(2);
        let message = base_builder()
            .parents_block(ParentType::Strong, parents.clone())
            .parents_block(ParentType::Like, parents.clone())
            .build()
            .unwrap();

        assert_eq!(message.parents(), parents);
    }

    #[test]
    fn test_id_depends_on_content() {
        let parents = sorted_ids(1);
        let a = base_builder()
            .parents_block(ParentType::Strong, parents.clone())
            .build()
            .unwrap();
        let b = base_builder()
            .sequence_number(1)
            .parents_block(ParentType::Strong, parents)
            .build()
            .unwrap();

        assert_ne!(a.id(), b.id());
    }
}
