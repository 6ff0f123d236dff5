use thiserror::Error;

use topic_types::Amount;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodyError {
    #[error("insufficient funds: {available} available, {requested} requested")]
    InsufficientFunds { available: Amount, requested: Amount },

    #[error("custody balance would overflow")]
    Overflow,

    #[error("custody lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("topic error: {0}")]
    Topic(#[from] topic_ledger::TopicError),

    #[error("custody error: {0}")]
    Custody(#[from] CustodyError),
}

pub type SdkResult<T> = Result<T, SdkError>;
