use std::sync::Arc;

use tracing::{debug, info};

use topic_fabric::{EventFabric, EventStream};
use topic_ledger::{
    DepositReceipt, DepositRequest, LedgerValidator, ParticipantPosition, ProjectionBuilder,
    TopicLedger, TopicParams, TopicReader, TopicSummary, TopicWriter, ValidationReport,
    WindowStatus,
};
use topic_types::{Amount, BlockHeight, ParticipantId, TopicId};

use crate::chain::BlockHeightSource;
use crate::custody::Vault;
use crate::error::SdkResult;

/// A topic bound to a chain and a value custody.
///
/// Deposits run as a small transaction: the amount is held from the
/// caller's wallet with room reserved in the topic's custody account, the
/// ledger records the deposit at the chain's current height, and the hold is
/// then settled into custody or released back to the wallet if the ledger
/// rejected the deposit. Nothing after the ledger commit can fail.
pub struct TopicHost<C: BlockHeightSource> {
    ledger: Arc<TopicLedger>,
    chain: Arc<C>,
    vault: Arc<Vault>,
}

impl<C: BlockHeightSource> TopicHost<C> {
    pub fn new(params: TopicParams, chain: Arc<C>, vault: Arc<Vault>) -> SdkResult<Self> {
        Self::with_fabric(params, chain, vault, Arc::new(EventFabric::default()))
    }

    pub fn with_fabric(
        params: TopicParams,
        chain: Arc<C>,
        vault: Arc<Vault>,
        fabric: Arc<EventFabric>,
    ) -> SdkResult<Self> {
        let ledger = TopicLedger::with_fabric(params, fabric)?;
        Ok(Self::from_ledger(Arc::new(ledger), chain, vault))
    }

    /// Host an existing ledger, for example one restored from a snapshot.
    pub fn from_ledger(ledger: Arc<TopicLedger>, chain: Arc<C>, vault: Arc<Vault>) -> Self {
        info!(
            topic = %ledger.topic_id(),
            height = %chain.current_height(),
            "topic hosted"
        );
        Self {
            ledger,
            chain,
            vault,
        }
    }

    pub fn ledger(&self) -> &Arc<TopicLedger> {
        &self.ledger
    }

    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    pub fn vault(&self) -> &Arc<Vault> {
        &self.vault
    }

    pub fn topic_id(&self) -> &TopicId {
        self.ledger.topic_id()
    }

    pub fn current_height(&self) -> BlockHeight {
        self.chain.current_height()
    }

    /// Stake `amount` from `participant`'s wallet on `outcome_index`.
    ///
    /// A rejected deposit leaves the wallet exactly as it was.
    pub fn deposit(
        &self,
        participant: &ParticipantId,
        outcome_index: usize,
        amount: Amount,
    ) -> SdkResult<DepositReceipt> {
        let hold = self.vault.hold(participant, self.ledger.topic_id(), amount)?;
        let request = DepositRequest::new(participant.clone(), outcome_index, amount);
        let height = self.chain.current_height();

        match self.ledger.deposit(&request, height) {
            Ok(receipt) => {
                let custody = self.vault.settle(hold);
                debug!(
                    topic = %receipt.topic,
                    seq = receipt.seq,
                    custody = %custody,
                    "hold settled"
                );
                Ok(receipt)
            }
            Err(e) => {
                let wallet = self.vault.release(hold)?;
                debug!(
                    topic = %self.ledger.topic_id(),
                    participant = %participant,
                    wallet = %wallet,
                    "hold released"
                );
                Err(e.into())
            }
        }
    }

    pub fn outcome_aggregate(&self, index: usize) -> SdkResult<Amount> {
        Ok(self.ledger.outcome_aggregate(index)?)
    }

    pub fn participant_balance(&self, participant: &ParticipantId, index: usize) -> SdkResult<Amount> {
        Ok(self.ledger.participant_balance(participant, index)?)
    }

    pub fn total_value(&self) -> SdkResult<Amount> {
        Ok(self.ledger.total_value()?)
    }

    /// Value held in custody for this topic.
    pub fn custody_balance(&self) -> SdkResult<Amount> {
        Ok(self.vault.custody_balance(self.ledger.topic_id())?)
    }

    pub fn status(&self) -> WindowStatus {
        self.ledger.status(self.chain.current_height())
    }

    pub fn summary(&self) -> SdkResult<TopicSummary> {
        Ok(ProjectionBuilder::summary(
            self.ledger.as_ref(),
            self.chain.current_height(),
        )?)
    }

    pub fn position(&self, participant: &ParticipantId) -> SdkResult<ParticipantPosition> {
        Ok(ProjectionBuilder::position(self.ledger.as_ref(), participant)?)
    }

    pub fn validate(&self) -> SdkResult<ValidationReport> {
        Ok(LedgerValidator::validate(self.ledger.as_ref())?)
    }

    pub fn subscribe(&self) -> EventStream {
        self.ledger.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use topic_ledger::TopicError;

    use crate::chain::SimulatedChain;
    use crate::error::{CustodyError, SdkError};

    use super::*;

    const DEADLINE: u64 = 1000;

    fn x() -> ParticipantId {
        ParticipantId::from_alias("x")
    }

    fn y() -> ParticipantId {
        ParticipantId::from_alias("y")
    }

    fn host() -> TopicHost<SimulatedChain> {
        let vault = Arc::new(Vault::new());
        vault.fund(&x(), 10).unwrap();
        vault.fund(&y(), 10).unwrap();
        TopicHost::new(
            TopicParams::new(
                ParticipantId::from_alias("owner"),
                "test",
                ["first", "second", "third"],
                BlockHeight::new(DEADLINE),
            ),
            Arc::new(SimulatedChain::new(BlockHeight::new(10))),
            vault,
        )
        .unwrap()
    }

    #[test]
    fn accepted_deposit_moves_value_into_custody() {
        let host = host();
        let before = host.custody_balance().unwrap();

        host.deposit(&x(), 0, 1).unwrap();

        assert_eq!(host.outcome_aggregate(0).unwrap(), 1);
        assert_eq!(host.participant_balance(&x(), 0).unwrap(), 1);
        assert_eq!(host.outcome_aggregate(1).unwrap(), 0);
        assert_eq!(host.outcome_aggregate(2).unwrap(), 0);
        assert_eq!(host.custody_balance().unwrap() - before, 1);
        assert_eq!(host.vault().wallet_balance(&x()).unwrap(), 9);
    }

    #[test]
    fn closed_window_refunds_the_caller() {
        let host = host();
        host.chain().mine_to(BlockHeight::new(DEADLINE));
        assert_eq!(host.status(), WindowStatus::Closed);

        let err = host.deposit(&x(), 0, 1).unwrap_err();
        assert!(matches!(
            err,
            SdkError::Topic(TopicError::DepositWindowClosed { .. })
        ));
        assert_eq!(host.vault().wallet_balance(&x()).unwrap(), 10);
        assert_eq!(host.custody_balance().unwrap(), 0);
        assert_eq!(host.vault().held_total().unwrap(), 0);
        assert_eq!(host.total_value().unwrap(), 0);
    }

    #[test]
    fn invalid_outcome_refunds_the_caller() {
        let host = host();
        let err = host.deposit(&x(), 3, 1).unwrap_err();
        assert!(matches!(
            err,
            SdkError::Topic(TopicError::InvalidOutcome { index: 3, .. })
        ));
        assert_eq!(host.vault().wallet_balance(&x()).unwrap(), 10);
        assert_eq!(host.total_value().unwrap(), 0);
    }

    #[test]
    fn insufficient_funds_never_reach_the_ledger() {
        let host = host();
        let mut stream = host.subscribe();
        let err = host.deposit(&x(), 0, 11).unwrap_err();
        assert!(matches!(
            err,
            SdkError::Custody(CustodyError::InsufficientFunds { .. })
        ));
        assert_eq!(host.ledger().receipt_count().unwrap(), 0);
        assert_eq!(stream.try_next().unwrap(), None);
    }

    #[test]
    fn custody_tracks_total_value() {
        let host = host();
        host.deposit(&x(), 0, 1).unwrap();
        host.deposit(&y(), 0, 2).unwrap();
        host.chain().mine(5);
        host.deposit(&y(), 2, 3).unwrap();

        assert_eq!(host.outcome_aggregate(0).unwrap(), 3);
        assert_eq!(host.participant_balance(&y(), 0).unwrap(), 2);
        assert_eq!(host.custody_balance().unwrap(), host.total_value().unwrap());
        assert_eq!(host.summary().unwrap().participant_count, 2);
        assert_eq!(host.position(&y()).unwrap().total, 5);
        assert!(host.validate().unwrap().is_valid());

        let receipts = host.ledger().receipts().unwrap();
        assert_eq!(receipts[2].block_height, BlockHeight::new(15));
    }

    #[test]
    fn shared_custody_overflow_is_refused_before_commit() {
        let vault = Arc::new(Vault::new());
        let chain = Arc::new(SimulatedChain::new(BlockHeight::new(10)));
        let params = || {
            TopicParams::new(
                ParticipantId::from_alias("owner"),
                "twin",
                ["a", "b"],
                BlockHeight::new(DEADLINE),
            )
        };
        let first = TopicHost::new(params(), Arc::clone(&chain), Arc::clone(&vault)).unwrap();
        let second = TopicHost::new(params(), Arc::clone(&chain), Arc::clone(&vault)).unwrap();
        assert_eq!(first.topic_id(), second.topic_id());

        vault.fund(&x(), Amount::MAX).unwrap();
        vault.fund(&y(), 1).unwrap();
        first.deposit(&x(), 0, Amount::MAX).unwrap();

        let mut stream = second.subscribe();
        let err = second.deposit(&y(), 0, 1).unwrap_err();
        assert!(matches!(err, SdkError::Custody(CustodyError::Overflow)));
        assert_eq!(second.total_value().unwrap(), 0);
        assert_eq!(second.ledger().receipt_count().unwrap(), 0);
        assert_eq!(stream.try_next().unwrap(), None);
        assert_eq!(vault.wallet_balance(&y()).unwrap(), 1);
        assert_eq!(vault.held_total().unwrap(), 0);
        assert_eq!(first.custody_balance().unwrap(), Amount::MAX);
    }

    #[test]
    fn concurrent_hosted_deposits_keep_custody_in_step() {
        use std::thread;

        let vault = Arc::new(Vault::new());
        let chain = Arc::new(SimulatedChain::default());
        let host = Arc::new(
            TopicHost::new(
                TopicParams::new(
                    ParticipantId::from_alias("owner"),
                    "race",
                    ["a", "b"],
                    BlockHeight::new(DEADLINE),
                ),
                Arc::clone(&chain),
                Arc::clone(&vault),
            )
            .unwrap(),
        );

        let handles: Vec<_> = (0u8..4)
            .map(|i| {
                let host = Arc::clone(&host);
                let who = ParticipantId::from_raw([i; 32]);
                host.vault().fund(&who, 20).unwrap();
                thread::spawn(move || {
                    for n in 0..25usize {
                        // The last five exceed the wallet and are refused.
                        let _ = host.deposit(&who, n % 2, 1);
                        host.chain().mine(1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(host.total_value().unwrap(), 80);
        assert_eq!(host.custody_balance().unwrap(), 80);
        assert_eq!(vault.held_total().unwrap(), 0);
        assert!(host.validate().unwrap().is_valid());
    }
}
