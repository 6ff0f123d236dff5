use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::height::BlockHeight;
use crate::label::Label;

/// Material used to derive a [`ParticipantId`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityMaterial {
    /// An ed25519-style public key (32 bytes).
    PublicKey([u8; 32]),
    /// A human-readable alias, used by scenario files and local demos.
    Alias(String),
}

/// Persistent identity of a participant (depositor or topic owner).
///
/// A `ParticipantId` is derived deterministically from [`IdentityMaterial`]
/// using BLAKE3. The same material always produces the same identity.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId {
    hash: [u8; 32],
}

impl ParticipantId {
    /// Derive a `ParticipantId` from identity material.
    pub fn derive(material: &IdentityMaterial) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"topic-participant-v1:");
        match material {
            IdentityMaterial::PublicKey(pk) => {
                hasher.update(b"pubkey:");
                hasher.update(pk);
            }
            IdentityMaterial::Alias(alias) => {
                hasher.update(b"alias:");
                hasher.update(alias.as_bytes());
            }
        }
        Self {
            hash: *hasher.finalize().as_bytes(),
        }
    }

    /// Shorthand for `derive(&IdentityMaterial::Alias(..))`.
    pub fn from_alias(alias: &str) -> Self {
        Self::derive(&IdentityMaterial::Alias(alias.to_string()))
    }

    /// Create an ephemeral (random) identity for tests and demos.
    pub fn ephemeral() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self::derive(&IdentityMaterial::PublicKey(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_id(&self) -> String {
        format!("pt:{}", hex::encode(&self.hash[..4]))
    }

    /// Parse from a hex string (64 hex characters, optional `pt:` prefix).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("pt:").unwrap_or(s);
        Ok(Self {
            hash: decode_32(s)?,
        })
    }

    /// Create from a raw 32-byte hash. Use `derive()` for production code.
    pub fn from_raw(hash: [u8; 32]) -> Self {
        Self { hash }
    }
}

impl fmt::Debug for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParticipantId({})", self.short_id())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}

/// Identity of a topic, derived from its immutable construction parameters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicId {
    hash: [u8; 32],
}

impl TopicId {
    /// Derive a `TopicId` from the four immutable topic fields.
    ///
    /// Lengths are hashed ahead of each variable-length field so distinct
    /// parameter sets never collide by concatenation.
    pub fn derive(
        owner: &ParticipantId,
        name: &Label,
        outcomes: &[Label],
        deadline_block: BlockHeight,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"topic-id-v1:");
        hasher.update(owner.as_bytes());
        hasher.update(&(name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update(&(outcomes.len() as u64).to_le_bytes());
        for outcome in outcomes {
            hasher.update(&(outcome.len() as u64).to_le_bytes());
            hasher.update(outcome.as_bytes());
        }
        hasher.update(&deadline_block.get().to_le_bytes());
        Self {
            hash: *hasher.finalize().as_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn short_id(&self) -> String {
        format!("tp:{}", hex::encode(&self.hash[..4]))
    }

    /// Parse from a hex string (64 hex characters, optional `tp:` prefix).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("tp:").unwrap_or(s);
        Ok(Self {
            hash: decode_32(s)?,
        })
    }

    pub fn from_raw(hash: [u8; 32]) -> Self {
        Self { hash }
    }
}

impl fmt::Debug for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TopicId({})", self.short_id())
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}

fn decode_32(s: &str) -> Result<[u8; 32], TypeError> {
    let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(TypeError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        });
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}
