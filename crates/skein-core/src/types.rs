//! Core identifier types for the skein workspace
//!
//! Identifiers are 32-byte values. Message and transaction ids travel over
//! the diagnostic APIs Base58-encoded, so their serde representation is a
//! Base58 string rather than a byte array.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{Result, SkeinError};

/// Length of a raw identifier in bytes.
pub const ID_LENGTH: usize = 32;

/// MessageId - Unique identifier of a message, computed from its content.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MessageId {
    bytes: [u8; ID_LENGTH],
}

impl MessageId {
    /// The all-zero id. Doubles as the genesis reference: a message naming
    /// `EMPTY` as a parent attaches to the genesis.
    pub const EMPTY: Self = Self {
        bytes: [0u8; ID_LENGTH],
    };

    /// Create a MessageId from raw bytes.
    pub fn new(bytes: [u8; ID_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Derive a MessageId from content using BLAKE3.
    pub fn from_content(content: &[u8]) -> Self {
        let hash = blake3::hash(content);
        Self {
            bytes: *hash.as_bytes(),
        }
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ID_LENGTH] {
        &self.bytes
    }

    /// Base58 rendering used on the wire.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.bytes).into_string()
    }

    /// Parse a Base58-encoded id, checking the decoded length.
    pub fn from_base58(encoded: &str) -> Result<Self> {
        let decoded = bs58::decode(encoded)
            .into_vec()
            .map_err(|_| SkeinError::InvalidBase58(encoded.to_string()))?;
        if decoded.len() != ID_LENGTH {
            return Err(SkeinError::InvalidIdLength {
                expected: ID_LENGTH,
                actual: decoded.len(),
            });
        }
        let mut bytes = [0u8; ID_LENGTH];
        bytes.copy_from_slice(&decoded);
        Ok(Self { bytes })
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", &self.to_base58()[..8])
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        MessageId::from_base58(&encoded).map_err(serde::de::Error::custom)
    }
}

/// TransactionId - Unique identifier of a ledger transaction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TransactionId {
    bytes: [u8; ID_LENGTH],
}

impl TransactionId {
    /// Create a TransactionId from raw bytes.
    pub fn new(bytes: [u8; ID_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Derive a TransactionId from content using BLAKE3.
    pub fn from_content(content: &[u8]) -> Self {
        let hash = blake3::hash(content);
        Self {
            bytes: *hash.as_bytes(),
        }
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ID_LENGTH] {
        &self.bytes
    }

    /// Base58 rendering used on the wire.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.bytes).into_string()
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", &self.to_base58()[..8])
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl Serialize for TransactionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

/// PublicKey - Issuer public key carried by every message.
///
/// Signature verification is out of scope here; the key is an opaque value
/// whose only role is issuer attribution.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PublicKey {
    bytes: [u8; ID_LENGTH],
}

impl PublicKey {
    pub fn new(bytes: [u8; ID_LENGTH]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; ID_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..12])
    }
}

/// NodeId - Unique identifier for network nodes, derived from the public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    id: [u8; ID_LENGTH],
}

impl NodeId {
    pub fn new(id: [u8; ID_LENGTH]) -> Self {
        Self { id }
    }

    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let hash = blake3::hash(public_key.as_bytes());
        Self {
            id: *hash.as_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; ID_LENGTH] {
        &self.id
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// Short rendering used in reports and log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.short())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Local node identity: the issuing key pair's public half and the node id
/// derived from it.
#[derive(Clone, Copy, Debug)]
pub struct NodeIdentity {
    pub public_key: PublicKey,
    pub node_id: NodeId,
}

impl NodeIdentity {
    pub fn from_public_key(public_key: PublicKey) -> Self {
        Self {
            public_key,
            node_id: NodeId::from_public_key(&public_key),
        }
    }
}
