use topic_types::{BlockHeight, TopicId};

use crate::balances::BalanceSheet;
use crate::error::TopicError;
use crate::params::TopicDefinition;
use crate::records::DepositReceipt;
use crate::traits::TopicReader;

/// Result of validating a topic's journal and balances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub topic: TopicId,
    pub receipt_count: u64,
    pub hash_chain_valid: bool,
    pub sequence_monotonic: bool,
    pub deposits_in_window: bool,
    pub balances_conserved: bool,
    pub replay_consistent: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Receipt sequence number, or 0 for sheet-level violations.
    pub seq: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    SequenceGap,
    HashChainBreak,
    HashMismatch,
    ForeignTopic,
    LateDeposit,
    ZeroDeposit,
    UnknownOutcome,
    ConservationBreak,
    ReplayMismatch,
}

/// Journal and balance validator.
pub struct LedgerValidator;

impl LedgerValidator {
    /// Validate a live topic: its journal, the conservation invariant, and
    /// agreement between the journal and the committed balances.
    pub fn validate<R: TopicReader>(reader: &R) -> Result<ValidationReport, TopicError> {
        let live = reader.balance_sheet()?;
        let receipts = reader.receipts()?;
        let committed = usize::try_from(live.deposit_count)
            .unwrap_or(usize::MAX)
            .min(receipts.len());

        let mut scan = scan_journal(
            reader.topic_id(),
            reader.outcome_count(),
            reader.deadline_block(),
            &receipts[..committed],
        );

        if committed as u64 != live.deposit_count {
            scan.violations.push(Violation {
                seq: 0,
                kind: ViolationKind::ReplayMismatch,
                description: format!(
                    "balance sheet counts {} deposit(s), journal holds {}",
                    live.deposit_count, committed
                ),
            });
        }

        for (index, aggregate, sum) in live.conservation_breaks() {
            scan.violations.push(Violation {
                seq: 0,
                kind: ViolationKind::ConservationBreak,
                description: format!(
                    "outcome {index}: aggregate {aggregate} != participant sum {sum}"
                ),
            });
        }

        if scan.sheet != live {
            scan.violations.push(Violation {
                seq: 0,
                kind: ViolationKind::ReplayMismatch,
                description: "replayed journal does not reproduce committed balances".into(),
            });
        }

        Ok(report(reader.topic_id().clone(), committed as u64, scan.violations))
    }

    /// Validate a detached journal against a topic definition.
    pub fn validate_journal(
        definition: &TopicDefinition,
        receipts: &[DepositReceipt],
    ) -> (ValidationReport, BalanceSheet) {
        let scan = scan_journal(
            &definition.id,
            definition.outcome_count(),
            definition.deadline_block,
            receipts,
        );
        (
            report(definition.id.clone(), receipts.len() as u64, scan.violations),
            scan.sheet,
        )
    }
}

struct JournalScan {
    sheet: BalanceSheet,
    violations: Vec<Violation>,
}

fn scan_journal(
    topic: &TopicId,
    outcome_count: usize,
    deadline_block: BlockHeight,
    receipts: &[DepositReceipt],
) -> JournalScan {
    let mut sheet = BalanceSheet::new(outcome_count);
    let mut violations = Vec::new();
    let mut push = |seq: u64, kind: ViolationKind, description: String| {
        violations.push(Violation {
            seq,
            kind,
            description,
        })
    };

    for (index, receipt) in receipts.iter().enumerate() {
        let seq = receipt.seq;
        let expected_seq = (index + 1) as u64;
        if seq != expected_seq {
            push(
                seq,
                ViolationKind::SequenceGap,
                format!("expected seq {expected_seq}, got {seq}"),
            );
        }

        let expected_prev = index.checked_sub(1).map(|i| receipts[i].receipt_hash);
        if receipt.prev_hash != expected_prev {
            push(
                seq,
                ViolationKind::HashChainBreak,
                "previous hash link mismatch".into(),
            );
        }

        if let Ok(hash) = receipt.compute_hash() {
            if hash != receipt.receipt_hash {
                push(
                    seq,
                    ViolationKind::HashMismatch,
                    "receipt hash does not match computed".into(),
                );
            }
        }

        if &receipt.topic != topic {
            push(
                seq,
                ViolationKind::ForeignTopic,
                format!("receipt belongs to {}", receipt.topic),
            );
        }

        if !receipt.block_height.is_before(deadline_block) {
            push(
                seq,
                ViolationKind::LateDeposit,
                format!(
                    "deposit at {} on or after deadline {deadline_block}",
                    receipt.block_height
                ),
            );
        }

        if receipt.amount == 0 {
            push(seq, ViolationKind::ZeroDeposit, "zero-amount deposit".into());
            continue;
        }

        if receipt.outcome_index >= outcome_count {
            push(
                seq,
                ViolationKind::UnknownOutcome,
                format!(
                    "outcome {} out of range for {outcome_count} outcome(s)",
                    receipt.outcome_index
                ),
            );
            continue;
        }

        match sheet.preview(&receipt.participant, receipt.outcome_index, receipt.amount) {
            Ok(credit) => {
                if credit.participant_balance != receipt.participant_balance
                    || credit.outcome_aggregate != receipt.outcome_aggregate
                {
                    push(
                        seq,
                        ViolationKind::ReplayMismatch,
                        format!(
                            "recorded balances ({}, {}) differ from replay ({}, {})",
                            receipt.participant_balance,
                            receipt.outcome_aggregate,
                            credit.participant_balance,
                            credit.outcome_aggregate
                        ),
                    );
                }
                sheet.apply(credit);
            }
            Err(e) => push(seq, ViolationKind::ReplayMismatch, e.to_string()),
        }
    }

    JournalScan { sheet, violations }
}

fn report(topic: TopicId, receipt_count: u64, violations: Vec<Violation>) -> ValidationReport {
    let any = |kinds: &[ViolationKind]| violations.iter().any(|v| kinds.contains(&v.kind));
    ValidationReport {
        topic,
        receipt_count,
        hash_chain_valid: !any(&[ViolationKind::HashChainBreak, ViolationKind::HashMismatch]),
        sequence_monotonic: !any(&[ViolationKind::SequenceGap]),
        deposits_in_window: !any(&[ViolationKind::LateDeposit]),
        balances_conserved: !any(&[ViolationKind::ConservationBreak]),
        replay_consistent: !any(&[ViolationKind::ReplayMismatch]),
        violations,
    }
}
