use std::fmt;

use serde::{Deserialize, Serialize};

use topic_fabric::DepositAccepted;
use topic_types::{Amount, BlockHeight, ParticipantId, TopicId};

use crate::error::TopicError;

/// A request to stake `amount` on `outcome_index` on behalf of `participant`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub participant: ParticipantId,
    pub outcome_index: usize,
    pub amount: Amount,
}

impl DepositRequest {
    pub fn new(participant: ParticipantId, outcome_index: usize, amount: Amount) -> Self {
        Self {
            participant,
            outcome_index,
            amount,
        }
    }
}

/// Unique identifier for an accepted deposit (UUID v7 for time-ordering).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepositId(uuid::Uuid);

impl DepositId {
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of the UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for DepositId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DepositId({})", self.short_id())
    }
}

impl fmt::Display for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Journal entry for one accepted deposit.
///
/// Receipts form a hash chain: `prev_hash` is the previous receipt's
/// `receipt_hash`, and `receipt_hash` covers every other field. The balance
/// fields hold post-deposit values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub seq: u64,
    pub deposit_id: DepositId,
    pub topic: TopicId,
    pub participant: ParticipantId,
    pub outcome_index: usize,
    pub amount: Amount,
    pub block_height: BlockHeight,
    pub participant_balance: Amount,
    pub outcome_aggregate: Amount,
    pub prev_hash: Option<[u8; 32]>,
    pub receipt_hash: [u8; 32],
}

impl DepositReceipt {
    /// The notification body announced for this receipt.
    pub fn accepted(&self) -> DepositAccepted {
        DepositAccepted {
            outcome_index: self.outcome_index,
            amount: self.amount,
            new_participant_balance: self.participant_balance,
        }
    }

    /// Recompute the hash of this receipt's canonical form.
    pub fn compute_hash(&self) -> Result<[u8; 32], TopicError> {
        let mut canonical = self.clone();
        canonical.receipt_hash = [0; 32];

        let encoded = serde_json::to_vec(&canonical)
            .map_err(|e| TopicError::Serialization(e.to_string()))?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"topic-receipt-v1:");
        hasher.update(&encoded);
        Ok(*hasher.finalize().as_bytes())
    }

    /// Short hex of the receipt hash, for display.
    pub fn short_hash(&self) -> String {
        short_hash(self.receipt_hash)
    }
}

pub(crate) fn short_hash(hash: [u8; 32]) -> String {
    hash[..6].iter().map(|b| format!("{b:02x}")).collect()
}
