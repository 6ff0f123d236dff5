use std::sync::atomic::{AtomicU64, Ordering};

use topic_types::BlockHeight;

/// Source of the current block height.
///
/// Implementations must never report a height lower than one they already
/// reported.
pub trait BlockHeightSource: Send + Sync {
    fn current_height(&self) -> BlockHeight;
}

/// In-process chain whose height advances only when blocks are mined.
#[derive(Debug, Default)]
pub struct SimulatedChain {
    height: AtomicU64,
}

impl SimulatedChain {
    pub fn new(start: BlockHeight) -> Self {
        Self {
            height: AtomicU64::new(start.get()),
        }
    }

    /// Advance by `blocks`, returning the new height.
    pub fn mine(&self, blocks: u64) -> BlockHeight {
        let previous = self
            .height
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| {
                Some(h.saturating_add(blocks))
            })
            .unwrap_or_else(|h| h);
        BlockHeight::new(previous.saturating_add(blocks))
    }

    /// Advance to `target` if it lies ahead; the chain never moves back.
    pub fn mine_to(&self, target: BlockHeight) -> BlockHeight {
        let previous = self.height.fetch_max(target.get(), Ordering::SeqCst);
        BlockHeight::new(previous.max(target.get()))
    }
}

impl BlockHeightSource for SimulatedChain {
    fn current_height(&self) -> BlockHeight {
        BlockHeight::new(self.height.load(Ordering::SeqCst))
    }
}

/// A height that never changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixedHeight(pub BlockHeight);

impl BlockHeightSource for FixedHeight {
    fn current_height(&self) -> BlockHeight {
        self.0
    }
}
