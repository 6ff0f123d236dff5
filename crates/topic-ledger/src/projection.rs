use topic_types::{Amount, BlockHeight, Label, ParticipantId, TopicId};

use crate::error::TopicError;
use crate::records::short_hash;
use crate::traits::TopicReader;
use crate::window::WindowStatus;

/// Basis points in one whole.
pub const BPS_SCALE: u32 = 10_000;

/// Standing of one outcome within a topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutcomeStanding {
    pub index: usize,
    pub label: Label,
    pub aggregate: Amount,
    /// Share of the topic's total value, rounded down, in basis points.
    pub share_bps: u32,
}

/// Point-in-time overview of a topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicSummary {
    pub topic: TopicId,
    pub owner: ParticipantId,
    pub name: Label,
    pub deadline_block: BlockHeight,
    pub observed_at: BlockHeight,
    pub status: WindowStatus,
    pub standings: Vec<OutcomeStanding>,
    pub total_value: Amount,
    pub participant_count: usize,
    pub deposit_count: u64,
    /// Short hex of the latest receipt hash.
    pub head: Option<String>,
}

impl TopicSummary {
    /// Index of the outcome with the largest aggregate. Ties go to the
    /// lowest index; `None` while nothing has been deposited.
    pub fn leading_outcome(&self) -> Option<usize> {
        self.standings
            .iter()
            .filter(|s| s.aggregate > 0)
            .fold(None::<&OutcomeStanding>, |best, s| match best {
                Some(b) if b.aggregate >= s.aggregate => Some(b),
                _ => Some(s),
            })
            .map(|s| s.index)
    }
}

/// Everything one participant holds in a topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantPosition {
    pub topic: TopicId,
    pub participant: ParticipantId,
    /// One entry per outcome, zero where nothing was deposited.
    pub balances: Vec<Amount>,
    pub total: Amount,
    pub deposit_count: u64,
}

/// Deterministic projection builders.
pub struct ProjectionBuilder;

impl ProjectionBuilder {
    pub fn summary<R: TopicReader>(
        reader: &R,
        current_height: BlockHeight,
    ) -> Result<TopicSummary, TopicError> {
        let sheet = reader.balance_sheet()?;
        // The journal may already hold receipts newer than the sheet.
        let receipts = reader.receipts()?;
        let head = usize::try_from(sheet.deposit_count)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| receipts.get(i));

        let standings = sheet
            .aggregates
            .iter()
            .enumerate()
            .map(|(index, &aggregate)| {
                Ok(OutcomeStanding {
                    index,
                    label: reader.outcome_label(index)?.clone(),
                    aggregate,
                    share_bps: share_bps(aggregate, sheet.total),
                })
            })
            .collect::<Result<Vec<_>, TopicError>>()?;

        Ok(TopicSummary {
            topic: reader.topic_id().clone(),
            owner: reader.owner().clone(),
            name: reader.name().clone(),
            deadline_block: reader.deadline_block(),
            observed_at: current_height,
            status: reader.status(current_height),
            standings,
            total_value: sheet.total,
            participant_count: sheet.participants().len(),
            deposit_count: sheet.deposit_count,
            head: head.map(|r| short_hash(r.receipt_hash)),
        })
    }

    pub fn position<R: TopicReader>(
        reader: &R,
        participant: &ParticipantId,
    ) -> Result<ParticipantPosition, TopicError> {
        let sheet = reader.balance_sheet()?;
        let balances = (0..sheet.outcome_count())
            .map(|index| sheet.balance(participant, index))
            .collect::<Result<Vec<_>, _>>()?;
        let total = balances
            .iter()
            .try_fold(0 as Amount, |acc, b| acc.checked_add(*b))
            .ok_or(TopicError::BalanceOverflow)?;

        let receipts = reader.receipts()?;
        let deposit_count = receipts
            .iter()
            .take(usize::try_from(sheet.deposit_count).unwrap_or(usize::MAX))
            .filter(|r| &r.participant == participant)
            .count() as u64;

        Ok(ParticipantPosition {
            topic: reader.topic_id().clone(),
            participant: participant.clone(),
            balances,
            total,
            deposit_count,
        })
    }
}

fn share_bps(part: Amount, whole: Amount) -> u32 {
    if whole == 0 {
        return 0;
    }
    // part <= whole, so the quotient fits in BPS_SCALE.
    let scaled = match part.checked_mul(Amount::from(BPS_SCALE)) {
        Some(p) => p / whole,
        None => part / (whole / Amount::from(BPS_SCALE)).max(1),
    };
    u32::try_from(scaled.min(Amount::from(BPS_SCALE))).unwrap_or(BPS_SCALE)
}
