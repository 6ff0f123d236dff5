use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use topic_fabric::EventFabric;

use crate::error::TopicError;
use crate::ledger::TopicLedger;
use crate::params::TopicParams;
use crate::records::DepositReceipt;
use crate::traits::TopicReader;
use crate::validation::LedgerValidator;

/// Portable export of a topic: its construction parameters and the full
/// receipt journal. Balances are not stored; they are rebuilt on restore.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSnapshot {
    pub params: TopicParams,
    pub receipts: Vec<DepositReceipt>,
}

impl TopicSnapshot {
    pub fn to_json(&self) -> Result<String, TopicError> {
        serde_json::to_string_pretty(self).map_err(|e| TopicError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, TopicError> {
        serde_json::from_str(json).map_err(|e| TopicError::Serialization(e.to_string()))
    }
}

impl TopicLedger {
    /// Export the committed state.
    pub fn snapshot(&self) -> Result<TopicSnapshot, TopicError> {
        let sheet = self.balance_sheet()?;
        let mut receipts = self.receipts()?;
        receipts.truncate(usize::try_from(sheet.deposit_count).unwrap_or(usize::MAX));
        Ok(TopicSnapshot {
            params: self.definition().to_params(),
            receipts,
        })
    }

    /// Rebuild a topic from a snapshot with its own notification fabric.
    pub fn restore(snapshot: &TopicSnapshot) -> Result<Self, TopicError> {
        Self::restore_with_fabric(snapshot, Arc::new(EventFabric::default()))
    }

    /// Rebuild a topic from a snapshot, rejecting any journal that fails
    /// validation. Restoring publishes no events.
    pub fn restore_with_fabric(
        snapshot: &TopicSnapshot,
        fabric: Arc<EventFabric>,
    ) -> Result<Self, TopicError> {
        let definition = snapshot.params.validate()?;
        let (report, sheet) = LedgerValidator::validate_journal(&definition, &snapshot.receipts);

        if let Some(first) = report.violations.first() {
            warn!(
                topic = %definition.id,
                violations = report.violations.len(),
                first = %first.description,
                "snapshot rejected"
            );
            return Err(TopicError::IntegrityViolation {
                seq: first.seq,
                reason: format!("{:?}: {}", first.kind, first.description),
            });
        }

        info!(
            topic = %definition.id,
            receipts = snapshot.receipts.len(),
            total = %sheet.total,
            "topic restored"
        );
        Ok(Self::from_parts(
            definition,
            fabric,
            sheet,
            snapshot.receipts.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use topic_types::{BlockHeight, ParticipantId};

    use crate::records::DepositRequest;
    use crate::traits::TopicWriter;

    use super::*;

    fn populated() -> TopicLedger {
        let ledger = TopicLedger::new(TopicParams::new(
            ParticipantId::from_alias("owner"),
            "snapshot",
            ["yes", "no"],
            BlockHeight::new(50),
        ))
        .unwrap();
        let bob = ParticipantId::from_alias("bob");
        let carol = ParticipantId::from_alias("carol");
        ledger.deposit(&DepositRequest::new(bob.clone(), 0, 3), BlockHeight::new(1)).unwrap();
        ledger.deposit(&DepositRequest::new(carol, 1, 7), BlockHeight::new(2)).unwrap();
        ledger.deposit(&DepositRequest::new(bob, 0, 2), BlockHeight::new(3)).unwrap();
        ledger
    }

    #[test]
    fn restore_reproduces_state() {
        let original = populated();
        let json = original.snapshot().unwrap().to_json().unwrap();
        let restored = TopicLedger::restore(&TopicSnapshot::from_json(&json).unwrap()).unwrap();

        assert_eq!(restored.topic_id(), original.topic_id());
        assert_eq!(restored.balance_sheet().unwrap(), original.balance_sheet().unwrap());
        assert_eq!(restored.head().unwrap(), original.head().unwrap());
        assert_eq!(
            restored
                .participant_balance(&ParticipantId::from_alias("bob"), 0)
                .unwrap(),
            5
        );
    }

    #[test]
    fn restored_topic_continues_the_chain() {
        let restored = TopicLedger::restore(&populated().snapshot().unwrap()).unwrap();
        let head = restored.head().unwrap().unwrap();
        let receipt = restored
            .deposit(
                &DepositRequest::new(ParticipantId::from_alias("dave"), 1, 1),
                BlockHeight::new(4),
            )
            .unwrap();
        assert_eq!(receipt.seq, 4);
        assert_eq!(receipt.prev_hash, Some(head.receipt_hash));
        assert_eq!(receipt.outcome_aggregate, 8);
    }

    #[test]
    fn tampered_snapshot_is_rejected() {
        let mut snapshot = populated().snapshot().unwrap();
        snapshot.receipts[1].amount = 700;

        let err = TopicLedger::restore(&snapshot).err();
        assert!(matches!(
            err,
            Some(TopicError::IntegrityViolation { seq: 2, .. })
        ));
    }

    #[test]
    fn snapshot_with_changed_params_is_rejected() {
        let mut snapshot = populated().snapshot().unwrap();
        snapshot.params.deadline_block = BlockHeight::new(2);

        assert!(matches!(
            TopicLedger::restore(&snapshot).err(),
            Some(TopicError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        assert!(matches!(
            TopicSnapshot::from_json("{not json"),
            Err(TopicError::Serialization(_))
        ));
    }
}
