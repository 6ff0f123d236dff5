use std::collections::{BTreeMap, BTreeSet};

use topic_types::{Amount, ParticipantId};

use crate::error::TopicError;

/// Per-outcome aggregates and per-(participant, outcome) balances.
///
/// Absent participant entries read as zero. Balances only ever grow, and
/// every credit goes through [`BalanceSheet::preview`] followed by
/// [`BalanceSheet::apply`], so the aggregate of an outcome always equals
/// the sum of its participant balances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceSheet {
    pub aggregates: Vec<Amount>,
    pub balances: BTreeMap<(ParticipantId, usize), Amount>,
    pub total: Amount,
    /// Number of deposits folded into this sheet.
    pub deposit_count: u64,
}

/// Post-credit values computed by [`BalanceSheet::preview`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credit {
    pub participant: ParticipantId,
    pub outcome_index: usize,
    pub amount: Amount,
    pub participant_balance: Amount,
    pub outcome_aggregate: Amount,
    pub total: Amount,
}

impl BalanceSheet {
    pub fn new(outcome_count: usize) -> Self {
        Self {
            aggregates: vec![0; outcome_count],
            balances: BTreeMap::new(),
            total: 0,
            deposit_count: 0,
        }
    }

    pub fn outcome_count(&self) -> usize {
        self.aggregates.len()
    }

    pub fn aggregate(&self, index: usize) -> Result<Amount, TopicError> {
        self.aggregates
            .get(index)
            .copied()
            .ok_or(TopicError::InvalidOutcome {
                index,
                outcome_count: self.aggregates.len(),
            })
    }

    pub fn balance(&self, participant: &ParticipantId, index: usize) -> Result<Amount, TopicError> {
        self.aggregate(index)?;
        Ok(self
            .balances
            .get(&(participant.clone(), index))
            .copied()
            .unwrap_or(0))
    }

    pub fn participants(&self) -> Vec<ParticipantId> {
        self.balances
            .keys()
            .map(|(p, _)| p.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Compute the effect of crediting `amount` without changing anything.
    pub fn preview(
        &self,
        participant: &ParticipantId,
        index: usize,
        amount: Amount,
    ) -> Result<Credit, TopicError> {
        let aggregate = self.aggregate(index)?;
        if amount == 0 {
            return Err(TopicError::ZeroAmount);
        }
        let current = self.balance(participant, index)?;

        Ok(Credit {
            participant: participant.clone(),
            outcome_index: index,
            amount,
            participant_balance: current
                .checked_add(amount)
                .ok_or(TopicError::BalanceOverflow)?,
            outcome_aggregate: aggregate
                .checked_add(amount)
                .ok_or(TopicError::BalanceOverflow)?,
            total: self
                .total
                .checked_add(amount)
                .ok_or(TopicError::BalanceOverflow)?,
        })
    }

    /// Commit a credit previously returned by `preview` on this sheet.
    pub fn apply(&mut self, credit: Credit) {
        self.aggregates[credit.outcome_index] = credit.outcome_aggregate;
        self.balances.insert(
            (credit.participant, credit.outcome_index),
            credit.participant_balance,
        );
        self.total = credit.total;
        self.deposit_count += 1;
    }

    /// Outcomes whose aggregate differs from the sum of participant balances.
    pub fn conservation_breaks(&self) -> Vec<(usize, Amount, Amount)> {
        let mut sums = vec![0 as Amount; self.aggregates.len()];
        for ((_, index), balance) in &self.balances {
            if let Some(sum) = sums.get_mut(*index) {
                *sum = sum.saturating_add(*balance);
            }
        }
        self.aggregates
            .iter()
            .zip(sums)
            .enumerate()
            .filter(|(_, (aggregate, sum))| **aggregate != *sum)
            .map(|(index, (aggregate, sum))| (index, *aggregate, sum))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_balances_read_as_zero() {
        let sheet = BalanceSheet::new(3);
        let nobody = ParticipantId::from_alias("nobody");
        assert_eq!(sheet.balance(&nobody, 2).unwrap(), 0);
        assert!(sheet.participants().is_empty());
    }

    #[test]
    fn preview_does_not_mutate() {
        let sheet = BalanceSheet::new(2);
        let bob = ParticipantId::from_alias("bob");
        let credit = sheet.preview(&bob, 1, 4).unwrap();
        assert_eq!(credit.participant_balance, 4);
        assert_eq!(sheet, BalanceSheet::new(2));
    }

    #[test]
    fn apply_updates_all_three_totals() {
        let mut sheet = BalanceSheet::new(2);
        let bob = ParticipantId::from_alias("bob");
        let carol = ParticipantId::from_alias("carol");

        let c = sheet.preview(&bob, 0, 1).unwrap();
        sheet.apply(c);
        let c = sheet.preview(&carol, 0, 2).unwrap();
        sheet.apply(c);

        assert_eq!(sheet.aggregate(0).unwrap(), 3);
        assert_eq!(sheet.aggregate(1).unwrap(), 0);
        assert_eq!(sheet.balance(&bob, 0).unwrap(), 1);
        assert_eq!(sheet.balance(&carol, 0).unwrap(), 2);
        assert_eq!(sheet.total, 3);
        assert_eq!(sheet.deposit_count, 2);
        assert!(sheet.conservation_breaks().is_empty());
        assert_eq!(sheet.participants().len(), 2);
    }

    #[test]
    fn preview_rejects_bad_input() {
        let sheet = BalanceSheet::new(2);
        let bob = ParticipantId::from_alias("bob");
        assert_eq!(
            sheet.preview(&bob, 2, 1).unwrap_err(),
            TopicError::InvalidOutcome {
                index: 2,
                outcome_count: 2
            }
        );
        assert_eq!(sheet.preview(&bob, 0, 0).unwrap_err(), TopicError::ZeroAmount);
    }

    #[test]
    fn preview_detects_overflow() {
        let mut sheet = BalanceSheet::new(2);
        let bob = ParticipantId::from_alias("bob");
        let carol = ParticipantId::from_alias("carol");
        let c = sheet.preview(&bob, 0, Amount::MAX).unwrap();
        sheet.apply(c);

        assert_eq!(
            sheet.preview(&carol, 1, 1).unwrap_err(),
            TopicError::BalanceOverflow
        );
    }

    #[test]
    fn conservation_breaks_reports_tampering() {
        let mut sheet = BalanceSheet::new(2);
        let bob = ParticipantId::from_alias("bob");
        let c = sheet.preview(&bob, 1, 5).unwrap();
        sheet.apply(c);
        sheet.aggregates[1] = 9;
        assert_eq!(sheet.conservation_breaks(), vec![(1, 9, 5)]);
    }
}
