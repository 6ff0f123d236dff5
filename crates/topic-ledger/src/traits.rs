use topic_types::{Amount, BlockHeight, Label, ParticipantId, TopicId};

use crate::balances::BalanceSheet;
use crate::error::TopicError;
use crate::records::{DepositReceipt, DepositRequest};
use crate::window::WindowStatus;

/// Write boundary: the single state-mutating operation of a topic.
pub trait TopicWriter: Send + Sync {
    /// Record a deposit observed at `current_height`.
    ///
    /// Either the aggregate, the participant balance and the journal are all
    /// updated and one notification is published, or nothing changes.
    fn deposit(
        &self,
        request: &DepositRequest,
        current_height: BlockHeight,
    ) -> Result<DepositReceipt, TopicError>;
}

/// Read boundary over committed topic state.
pub trait TopicReader: Send + Sync {
    fn topic_id(&self) -> &TopicId;

    fn owner(&self) -> &ParticipantId;

    fn name(&self) -> &Label;

    fn deadline_block(&self) -> BlockHeight;

    fn outcome_count(&self) -> usize;

    fn outcome_label(&self, index: usize) -> Result<&Label, TopicError>;

    fn outcome_aggregate(&self, index: usize) -> Result<Amount, TopicError>;

    /// Zero for participants that never deposited on this outcome.
    fn participant_balance(
        &self,
        participant: &ParticipantId,
        index: usize,
    ) -> Result<Amount, TopicError>;

    /// Sum of all outcome aggregates.
    fn total_value(&self) -> Result<Amount, TopicError>;

    fn receipts(&self) -> Result<Vec<DepositReceipt>, TopicError>;

    fn receipt_count(&self) -> Result<u64, TopicError>;

    fn head(&self) -> Result<Option<DepositReceipt>, TopicError>;

    /// Consistent copy of every balance, taken in one read.
    fn balance_sheet(&self) -> Result<BalanceSheet, TopicError>;

    /// Every participant with at least one accepted deposit, sorted.
    fn participants(&self) -> Result<Vec<ParticipantId>, TopicError>;

    fn status(&self, current_height: BlockHeight) -> WindowStatus {
        WindowStatus::at(current_height, self.deadline_block())
    }
}
