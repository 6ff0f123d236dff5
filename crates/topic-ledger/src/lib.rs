//! Deadline-gated wagering topics for the Topic Ledger.
//!
//! This crate is the core of the workspace. It provides:
//! - `TopicParams` validation into an immutable `TopicDefinition`
//! - `TopicWriter` / `TopicReader` trait boundaries
//! - `TopicLedger`, the locked in-memory implementation
//! - A hash-chained journal of `DepositReceipt`s
//! - Deterministic replay, journal validation and projections
//! - JSON snapshots with tamper-checked restore

pub mod balances;
pub mod error;
pub mod ledger;
pub mod params;
pub mod projection;
pub mod records;
pub mod replay;
pub mod snapshot;
pub mod traits;
pub mod validation;
pub mod window;

pub use balances::{BalanceSheet, Credit};
pub use error::{ErrorClass, TopicError};
pub use ledger::TopicLedger;
pub use params::{TopicDefinition, TopicParams, MIN_OUTCOMES};
pub use projection::{OutcomeStanding, ParticipantPosition, ProjectionBuilder, TopicSummary};
pub use records::{DepositId, DepositReceipt, DepositRequest};
pub use replay::ReplayEngine;
pub use snapshot::TopicSnapshot;
pub use traits::{TopicReader, TopicWriter};
pub use validation::{LedgerValidator, ValidationReport, Violation, ViolationKind};
pub use window::WindowStatus;
