use crate::balances::BalanceSheet;
use crate::error::TopicError;
use crate::records::DepositReceipt;
use crate::traits::TopicReader;

/// Deterministic rebuild of balances from the receipt journal.
pub struct ReplayEngine;

impl ReplayEngine {
    /// Fold `receipts` into a fresh sheet with `outcome_count` outcomes.
    pub fn replay(
        outcome_count: usize,
        receipts: &[DepositReceipt],
    ) -> Result<BalanceSheet, TopicError> {
        let mut sheet = BalanceSheet::new(outcome_count);
        for receipt in receipts {
            let credit = sheet
                .preview(&receipt.participant, receipt.outcome_index, receipt.amount)
                .map_err(|e| TopicError::IntegrityViolation {
                    seq: receipt.seq,
                    reason: format!("receipt cannot be replayed: {e}"),
                })?;
            sheet.apply(credit);
        }
        Ok(sheet)
    }

    /// Replay a reader's whole journal.
    pub fn replay_reader<R: TopicReader>(reader: &R) -> Result<BalanceSheet, TopicError> {
        let receipts = reader.receipts()?;
        Self::replay(reader.outcome_count(), &receipts)
    }

    /// Returns `true` if replaying the journal reproduces `live`.
    ///
    /// Only the first `live.deposit_count` receipts are replayed, so a sheet
    /// taken before concurrent deposits still compares against the matching
    /// journal prefix.
    pub fn converges<R: TopicReader>(reader: &R, live: &BalanceSheet) -> Result<bool, TopicError> {
        let receipts = reader.receipts()?;
        let prefix = usize::try_from(live.deposit_count)
            .ok()
            .and_then(|n| receipts.get(..n))
            .ok_or_else(|| TopicError::IntegrityViolation {
                seq: live.deposit_count,
                reason: "balance sheet is ahead of the journal".into(),
            })?;
        let replayed = Self::replay(reader.outcome_count(), prefix)?;
        Ok(&replayed == live)
    }
}
