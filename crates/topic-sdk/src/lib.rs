//! Host environment for the Topic Ledger.
//!
//! Binds a [`TopicLedger`] to a block height source and a value custody so
//! that deposits either move value and update balances together, or do
//! neither. This is the main entry point for applications embedding topics.

pub mod chain;
pub mod custody;
pub mod error;
pub mod host;

pub use chain::{BlockHeightSource, FixedHeight, SimulatedChain};
pub use custody::{Hold, Vault};
pub use error::{CustodyError, SdkError, SdkResult};
pub use host::TopicHost;

// Re-export key types
pub use topic_ledger::{
    DepositReceipt, TopicError, TopicLedger, TopicParams, TopicReader, TopicSnapshot,
    TopicSummary, ValidationReport,
};
pub use topic_types::{Amount, BlockHeight, ParticipantId, TopicId};
