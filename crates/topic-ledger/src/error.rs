use topic_types::{BlockHeight, TypeError};

/// Broad classification of ledger failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed construction arguments; no topic was created.
    Configuration,
    /// Caller mistake (bad outcome index, zero amount, overflow).
    Validation,
    /// Time-based policy outcome: the deposit window has closed.
    PolicyRejection,
    /// Broken internal state (poisoned lock, tampered journal, encoding).
    Internal,
}

/// Errors produced by ledger operations.
///
/// Every failing operation leaves the ledger exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("outcome index {index} out of range for {outcome_count} outcome(s)")]
    InvalidOutcome { index: usize, outcome_count: usize },

    #[error("deposit amount must be greater than zero")]
    ZeroAmount,

    #[error("deposit window closed at {deadline_block} (current height {current_height})")]
    DepositWindowClosed {
        current_height: BlockHeight,
        deadline_block: BlockHeight,
    },

    #[error("deposit would overflow a balance")]
    BalanceOverflow,

    #[error("integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TopicError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidConfiguration(_) => ErrorClass::Configuration,
            Self::InvalidOutcome { .. } | Self::ZeroAmount | Self::BalanceOverflow => {
                ErrorClass::Validation
            }
            Self::DepositWindowClosed { .. } => ErrorClass::PolicyRejection,
            Self::IntegrityViolation { .. } | Self::Serialization(_) => ErrorClass::Internal,
        }
    }

    /// Returns `true` if the caller can continue using the ledger after this
    /// error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::Validation | ErrorClass::PolicyRejection
        )
    }

    pub(crate) fn poisoned(what: &str) -> Self {
        Self::IntegrityViolation {
            seq: 0,
            reason: format!("ledger {what} lock poisoned"),
        }
    }
}

impl From<TypeError> for TopicError {
    fn from(e: TypeError) -> Self {
        Self::InvalidConfiguration(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_taxonomy() {
        assert_eq!(
            TopicError::InvalidConfiguration("x".into()).class(),
            ErrorClass::Configuration
        );
        assert_eq!(
            TopicError::InvalidOutcome {
                index: 3,
                outcome_count: 3
            }
            .class(),
            ErrorClass::Validation
        );
        assert_eq!(TopicError::ZeroAmount.class(), ErrorClass::Validation);
        assert_eq!(
            TopicError::DepositWindowClosed {
                current_height: BlockHeight::new(1000),
                deadline_block: BlockHeight::new(1000),
            }
            .class(),
            ErrorClass::PolicyRejection
        );
    }

    #[test]
    fn only_caller_and_policy_errors_are_recoverable() {
        assert!(TopicError::ZeroAmount.is_recoverable());
        assert!(!TopicError::InvalidConfiguration("x".into()).is_recoverable());
        assert!(!TopicError::poisoned("write").is_recoverable());
    }

    #[test]
    fn type_errors_become_configuration_errors() {
        let err: TopicError = TypeError::EmptyLabel.into();
        assert_eq!(
            err,
            TopicError::InvalidConfiguration("label must not be empty".into())
        );
    }
}
