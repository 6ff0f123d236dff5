use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use topic_fabric::{DepositEvent, EventFabric, EventFilter, EventStream};
use topic_types::{Amount, BlockHeight, Label, ParticipantId, TopicId};

use crate::balances::BalanceSheet;
use crate::error::TopicError;
use crate::params::{TopicDefinition, TopicParams};
use crate::records::{DepositId, DepositReceipt, DepositRequest};
use crate::traits::{TopicReader, TopicWriter};

/// A single wagering topic: fixed outcomes, a deadline block, and the
/// stakes deposited on each outcome.
///
/// The immutable definition lives outside the lock. Balances and the
/// receipt journal sit behind one `RwLock`, so readers only ever observe
/// fully committed deposits.
pub struct TopicLedger {
    definition: TopicDefinition,
    fabric: Arc<EventFabric>,
    inner: RwLock<TopicState>,
}

struct TopicState {
    sheet: BalanceSheet,
    journal: Vec<DepositReceipt>,
}

impl TopicLedger {
    /// Create a topic with its own notification fabric.
    pub fn new(params: TopicParams) -> Result<Self, TopicError> {
        Self::with_fabric(params, Arc::new(EventFabric::default()))
    }

    /// Create a topic that publishes into a shared fabric.
    pub fn with_fabric(params: TopicParams, fabric: Arc<EventFabric>) -> Result<Self, TopicError> {
        let definition = params.validate()?;
        info!(
            topic = %definition.id,
            name = %definition.name,
            outcomes = definition.outcome_count(),
            deadline = %definition.deadline_block,
            "topic created"
        );
        Ok(Self::from_parts(
            definition,
            fabric,
            BalanceSheet::new(params.outcomes.len()),
            Vec::new(),
        ))
    }

    pub(crate) fn from_parts(
        definition: TopicDefinition,
        fabric: Arc<EventFabric>,
        sheet: BalanceSheet,
        journal: Vec<DepositReceipt>,
    ) -> Self {
        Self {
            definition,
            fabric,
            inner: RwLock::new(TopicState { sheet, journal }),
        }
    }

    pub fn definition(&self) -> &TopicDefinition {
        &self.definition
    }

    pub fn fabric(&self) -> &Arc<EventFabric> {
        &self.fabric
    }

    /// Subscribe to deposit notifications for this topic.
    pub fn subscribe(&self) -> EventStream {
        self.fabric
            .subscribe(EventFilter::topic(self.definition.id.clone()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, TopicState>, TopicError> {
        self.inner.read().map_err(|_| TopicError::poisoned("read"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, TopicState>, TopicError> {
        self.inner.write().map_err(|_| TopicError::poisoned("write"))
    }

    /// Guard, credit and journal a deposit under the write lock.
    fn commit(
        &self,
        request: &DepositRequest,
        current_height: BlockHeight,
    ) -> Result<DepositReceipt, TopicError> {
        self.definition.outcome(request.outcome_index)?;
        if request.amount == 0 {
            return Err(TopicError::ZeroAmount);
        }

        let mut state = self.write()?;

        if !current_height.is_before(self.definition.deadline_block) {
            return Err(TopicError::DepositWindowClosed {
                current_height,
                deadline_block: self.definition.deadline_block,
            });
        }

        let credit = state.sheet.preview(
            &request.participant,
            request.outcome_index,
            request.amount,
        )?;

        let mut receipt = DepositReceipt {
            seq: state.journal.len() as u64 + 1,
            deposit_id: DepositId::new(),
            topic: self.definition.id.clone(),
            participant: request.participant.clone(),
            outcome_index: request.outcome_index,
            amount: request.amount,
            block_height: current_height,
            participant_balance: credit.participant_balance,
            outcome_aggregate: credit.outcome_aggregate,
            prev_hash: state.journal.last().map(|r| r.receipt_hash),
            receipt_hash: [0; 32],
        };
        receipt.receipt_hash = receipt.compute_hash()?;

        state.sheet.apply(credit);
        state.journal.push(receipt.clone());

        Ok(receipt)
    }
}

impl TopicWriter for TopicLedger {
    fn deposit(
        &self,
        request: &DepositRequest,
        current_height: BlockHeight,
    ) -> Result<DepositReceipt, TopicError> {
        let receipt = match self.commit(request, current_height) {
            Ok(receipt) => receipt,
            Err(e) => {
                debug!(
                    topic = %self.definition.id,
                    participant = %request.participant,
                    outcome = request.outcome_index,
                    amount = %request.amount,
                    height = %current_height,
                    error = %e,
                    "deposit rejected"
                );
                return Err(e);
            }
        };

        debug!(
            topic = %self.definition.id,
            seq = receipt.seq,
            participant = %receipt.participant,
            outcome = receipt.outcome_index,
            amount = %receipt.amount,
            balance = %receipt.participant_balance,
            "deposit accepted"
        );

        // Published after the write lock is released; delivery cannot undo
        // the commit.
        self.fabric.publish(&DepositEvent::new(
            receipt.topic.clone(),
            receipt.seq,
            receipt.block_height,
            receipt.participant.clone(),
            receipt.accepted(),
        ));

        Ok(receipt)
    }
}

impl TopicReader for TopicLedger {
    fn topic_id(&self) -> &TopicId {
        &self.definition.id
    }

    fn owner(&self) -> &ParticipantId {
        &self.definition.owner
    }

    fn name(&self) -> &Label {
        &self.definition.name
    }

    fn deadline_block(&self) -> BlockHeight {
        self.definition.deadline_block
    }

    fn outcome_count(&self) -> usize {
        self.definition.outcome_count()
    }

    fn outcome_label(&self, index: usize) -> Result<&Label, TopicError> {
        self.definition.outcome(index)
    }

    fn outcome_aggregate(&self, index: usize) -> Result<Amount, TopicError> {
        self.read()?.sheet.aggregate(index)
    }

    fn participant_balance(
        &self,
        participant: &ParticipantId,
        index: usize,
    ) -> Result<Amount, TopicError> {
        self.read()?.sheet.balance(participant, index)
    }

    fn total_value(&self) -> Result<Amount, TopicError> {
        Ok(self.read()?.sheet.total)
    }

    fn receipts(&self) -> Result<Vec<DepositReceipt>, TopicError> {
        Ok(self.read()?.journal.clone())
    }

    fn receipt_count(&self) -> Result<u64, TopicError> {
        Ok(self.read()?.journal.len() as u64)
    }

    fn head(&self) -> Result<Option<DepositReceipt>, TopicError> {
        Ok(self.read()?.journal.last().cloned())
    }

    fn balance_sheet(&self) -> Result<BalanceSheet, TopicError> {
        Ok(self.read()?.sheet.clone())
    }

    fn participants(&self) -> Result<Vec<ParticipantId>, TopicError> {
        Ok(self.read()?.sheet.participants())
    }
}
