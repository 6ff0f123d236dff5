use serde::{Deserialize, Serialize};

use topic_types::{Amount, BlockHeight, ParticipantId, TopicId};

/// Unique identifier for a deposit event (its BLAKE3 integrity hash).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub hash: [u8; 32],
}

impl EventId {
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self { hash }
    }

    /// Short hex representation (first 8 hex chars).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.hash[..4])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "evt:{}", self.short_hex())
    }
}

/// Body of the notification published after a deposit commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositAccepted {
    pub outcome_index: usize,
    pub amount: Amount,
    /// The depositor's balance on this outcome after the deposit.
    pub new_participant_balance: Amount,
}

/// Envelope routed through the fabric.
///
/// Besides the [`DepositAccepted`] body it carries the routing keys used by
/// [`EventFilter`](crate::EventFilter) and the journal sequence number of
/// the committed deposit, so observers can order events across topics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEvent {
    pub id: EventId,
    pub topic: TopicId,
    /// Journal sequence number of the receipt this event announces.
    pub seq: u64,
    pub block_height: BlockHeight,
    pub participant: ParticipantId,
    pub accepted: DepositAccepted,
    /// BLAKE3 hash over (topic, seq, height, participant, body).
    pub integrity_hash: [u8; 32],
}

impl DepositEvent {
    pub fn new(
        topic: TopicId,
        seq: u64,
        block_height: BlockHeight,
        participant: ParticipantId,
        accepted: DepositAccepted,
    ) -> Self {
        let integrity_hash =
            Self::compute_integrity(&topic, seq, block_height, &participant, &accepted);
        Self {
            id: EventId::from_hash(integrity_hash),
            topic,
            seq,
            block_height,
            participant,
            accepted,
            integrity_hash,
        }
    }

    /// Verify the integrity hash matches the event content.
    pub fn verify_integrity(&self) -> bool {
        let expected = Self::compute_integrity(
            &self.topic,
            self.seq,
            self.block_height,
            &self.participant,
            &self.accepted,
        );
        self.integrity_hash == expected && self.id.hash == expected
    }

    fn compute_integrity(
        topic: &TopicId,
        seq: u64,
        block_height: BlockHeight,
        participant: &ParticipantId,
        accepted: &DepositAccepted,
    ) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"topic-deposit-event-v1:");
        hasher.update(topic.as_bytes());
        hasher.update(&seq.to_le_bytes());
        hasher.update(&block_height.get().to_le_bytes());
        hasher.update(participant.as_bytes());

        if let Ok(body) = bincode::serialize(accepted) {
            hasher.update(&body);
        }

        *hasher.finalize().as_bytes()
    }
}
