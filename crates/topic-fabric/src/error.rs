/// Errors observed by fabric subscribers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FabricError {
    /// The subscriber fell behind and the oldest events were overwritten.
    #[error("subscriber lagged behind and missed {missed} event(s)")]
    Lagged { missed: u64 },

    /// The fabric that fed this stream has been dropped.
    #[error("subscriber channel closed")]
    SubscriberClosed,
}

/// Convenience alias used throughout the fabric crate.
pub type Result<T> = std::result::Result<T, FabricError>;
