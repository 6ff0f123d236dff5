use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use topic_types::{Amount, ParticipantId, TopicId};

use crate::error::CustodyError;

/// Value debited from a wallet while a deposit is pending.
///
/// Creating a hold also reserves room for its amount in the target topic's
/// custody account, so settling it cannot fail. A hold must be resolved
/// exactly once, by [`Vault::settle`] or [`Vault::release`].
#[must_use = "a hold must be settled or released"]
#[derive(Debug, PartialEq, Eq)]
pub struct Hold {
    participant: ParticipantId,
    topic: TopicId,
    amount: Amount,
}

impl Hold {
    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

/// Participant wallets and per-topic custody accounts.
#[derive(Debug, Default)]
pub struct Vault {
    inner: RwLock<VaultState>,
}

#[derive(Debug, Default)]
struct VaultState {
    wallets: HashMap<ParticipantId, Amount>,
    custody: HashMap<TopicId, Amount>,
    /// Pending holds per topic; custody plus reservation never overflows.
    reserved: HashMap<TopicId, Amount>,
    held: Amount,
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, VaultState>, CustodyError> {
        self.inner.read().map_err(|_| CustodyError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, VaultState>, CustodyError> {
        self.inner.write().map_err(|_| CustodyError::Poisoned)
    }

    /// Credit a participant's wallet, returning the new balance.
    pub fn fund(&self, participant: &ParticipantId, amount: Amount) -> Result<Amount, CustodyError> {
        let mut state = self.write()?;
        let wallet = state.wallets.entry(participant.clone()).or_insert(0);
        *wallet = wallet.checked_add(amount).ok_or(CustodyError::Overflow)?;
        Ok(*wallet)
    }

    pub fn wallet_balance(&self, participant: &ParticipantId) -> Result<Amount, CustodyError> {
        Ok(self.read()?.wallets.get(participant).copied().unwrap_or(0))
    }

    pub fn custody_balance(&self, topic: &TopicId) -> Result<Amount, CustodyError> {
        Ok(self.read()?.custody.get(topic).copied().unwrap_or(0))
    }

    /// Value currently debited from wallets but not yet settled or released.
    pub fn held_total(&self) -> Result<Amount, CustodyError> {
        Ok(self.read()?.held)
    }

    /// Debit `amount` from the participant's wallet into a pending hold
    /// bound for `topic`'s custody account.
    ///
    /// Fails without touching any balance if the wallet is short or the
    /// custody account has no room left for the amount.
    pub fn hold(
        &self,
        participant: &ParticipantId,
        topic: &TopicId,
        amount: Amount,
    ) -> Result<Hold, CustodyError> {
        let mut state = self.write()?;
        let available = state.wallets.get(participant).copied().unwrap_or(0);
        let remaining = available
            .checked_sub(amount)
            .ok_or(CustodyError::InsufficientFunds {
                available,
                requested: amount,
            })?;

        let custody = state.custody.get(topic).copied().unwrap_or(0);
        let reserved = state.reserved.get(topic).copied().unwrap_or(0);
        let reserved = reserved.checked_add(amount).ok_or(CustodyError::Overflow)?;
        custody.checked_add(reserved).ok_or(CustodyError::Overflow)?;
        let held = state.held.checked_add(amount).ok_or(CustodyError::Overflow)?;

        state.wallets.insert(participant.clone(), remaining);
        state.reserved.insert(topic.clone(), reserved);
        state.held = held;
        Ok(Hold {
            participant: participant.clone(),
            topic: topic.clone(),
            amount,
        })
    }

    /// Move held value into its topic's custody account, returning the new
    /// custody balance.
    pub fn settle(&self, hold: Hold) -> Amount {
        // Every critical section leaves the state consistent, so a poisoned
        // lock still guards valid balances.
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.held = state.held.saturating_sub(hold.amount);
        unreserve(&mut state, &hold);

        let custody = state.custody.entry(hold.topic).or_insert(0);
        // Room was reserved when the hold was taken.
        *custody = custody.saturating_add(hold.amount);
        *custody
    }

    /// Return held value to the wallet it came from, returning the new
    /// wallet balance.
    pub fn release(&self, hold: Hold) -> Result<Amount, CustodyError> {
        let mut state = self.write()?;
        state.held = state.held.saturating_sub(hold.amount);
        unreserve(&mut state, &hold);
        let wallet = state.wallets.entry(hold.participant).or_insert(0);
        // The hold was debited from this wallet, so it fits again.
        *wallet = wallet.saturating_add(hold.amount);
        Ok(*wallet)
    }
}

fn unreserve(state: &mut VaultState, hold: &Hold) {
    if let Some(reserved) = state.reserved.get_mut(&hold.topic) {
        *reserved = reserved.saturating_sub(hold.amount);
        if *reserved == 0 {
            state.reserved.remove(&hold.topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bob() -> ParticipantId {
        ParticipantId::from_alias("bob")
    }

    #[test]
    fn unfunded_wallet_reads_zero() {
        let vault = Vault::new();
        assert_eq!(vault.wallet_balance(&bob()).unwrap(), 0);
        assert_eq!(vault.custody_balance(&TopicId::from_raw([1; 32])).unwrap(), 0);
    }

    #[test]
    fn hold_then_settle_moves_value() {
        let vault = Vault::new();
        let topic = TopicId::from_raw([1; 32]);
        vault.fund(&bob(), 10).unwrap();

        let hold = vault.hold(&bob(), &topic, 4).unwrap();
        assert_eq!(vault.wallet_balance(&bob()).unwrap(), 6);
        assert_eq!(vault.held_total().unwrap(), 4);

        assert_eq!(vault.settle(hold), 4);
        assert_eq!(vault.custody_balance(&topic).unwrap(), 4);
        assert_eq!(vault.held_total().unwrap(), 0);
        assert_eq!(vault.wallet_balance(&bob()).unwrap(), 6);
    }

    #[test]
    fn release_refunds_wallet() {
        let vault = Vault::new();
        vault.fund(&bob(), 10).unwrap();
        let hold = vault.hold(&bob(), &TopicId::from_raw([1; 32]), 10).unwrap();
        assert_eq!(vault.wallet_balance(&bob()).unwrap(), 0);

        assert_eq!(vault.release(hold).unwrap(), 10);
        assert_eq!(vault.held_total().unwrap(), 0);
    }

    #[test]
    fn hold_beyond_balance_fails() {
        let vault = Vault::new();
        vault.fund(&bob(), 3).unwrap();
        assert_eq!(
            vault.hold(&bob(), &TopicId::from_raw([1; 32]), 4).unwrap_err(),
            CustodyError::InsufficientFunds {
                available: 3,
                requested: 4
            }
        );
        assert_eq!(vault.wallet_balance(&bob()).unwrap(), 3);
    }

    #[test]
    fn funding_overflow_is_rejected() {
        let vault = Vault::new();
        vault.fund(&bob(), Amount::MAX).unwrap();
        assert_eq!(vault.fund(&bob(), 1).unwrap_err(), CustodyError::Overflow);
        assert_eq!(vault.wallet_balance(&bob()).unwrap(), Amount::MAX);
    }

    #[test]
    fn hold_without_custody_room_fails() {
        let vault = Vault::new();
        let topic = TopicId::from_raw([2; 32]);
        let carol = ParticipantId::from_alias("carol");
        vault.fund(&bob(), Amount::MAX).unwrap();
        vault.fund(&carol, 1).unwrap();

        let big = vault.hold(&bob(), &topic, Amount::MAX).unwrap();
        // A pending hold already claims the whole account.
        assert_eq!(vault.hold(&carol, &topic, 1).unwrap_err(), CustodyError::Overflow);
        assert_eq!(vault.settle(big), Amount::MAX);
        assert_eq!(vault.hold(&carol, &topic, 1).unwrap_err(), CustodyError::Overflow);

        assert_eq!(vault.wallet_balance(&carol).unwrap(), 1);
        assert_eq!(vault.held_total().unwrap(), 0);
    }

    #[test]
    fn released_hold_frees_its_reservation() {
        let vault = Vault::new();
        let topic = TopicId::from_raw([3; 32]);
        vault.fund(&bob(), Amount::MAX).unwrap();

        let hold = vault.hold(&bob(), &topic, Amount::MAX).unwrap();
        vault.release(hold).unwrap();
        let again = vault.hold(&bob(), &topic, Amount::MAX).unwrap();
        assert_eq!(vault.settle(again), Amount::MAX);
        assert_eq!(vault.wallet_balance(&bob()).unwrap(), 0);
    }
}
