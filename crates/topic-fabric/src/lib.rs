//! Deposit notification fabric for the Topic Ledger.
//!
//! Every accepted deposit is announced as a [`DepositEvent`] carrying a
//! [`DepositAccepted`] body. Delivery is fire-and-forget: the fabric fans
//! events out to zero or more filtered subscribers and never feeds back into
//! the commit path.

pub mod error;
pub mod event;
pub mod fabric;

pub use error::FabricError;
pub use event::{DepositAccepted, DepositEvent, EventId};
pub use fabric::{EventFabric, EventFilter, EventStream, FabricConfig};
