//! Foundation types for the Topic Ledger.
//!
//! This crate provides the identity, label, and height types shared by every
//! other crate in the workspace.
//!
//! # Key Types
//!
//! - [`ParticipantId`] — Persistent identity of a depositor or topic owner
//! - [`TopicId`] — Identity of a topic, derived from its construction parameters
//! - [`Label`] — Opaque, bounded byte-string used for topic and outcome names
//! - [`BlockHeight`] — Chain height, the clock that gates the deposit window
//! - [`Amount`] — Value units attached to a deposit

pub mod error;
pub mod height;
pub mod identity;
pub mod label;

pub use error::TypeError;
pub use height::BlockHeight;
pub use identity::{IdentityMaterial, ParticipantId, TopicId};
pub use label::Label;

/// Value units moved by a deposit.
pub type Amount = u128;
