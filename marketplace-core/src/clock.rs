//! Block-height clock supplied by the host
//!
//! The ledger never reads wall time. It stamps listings and purchases with
//! whatever height the host reports, which must be non-decreasing.

use crate::types::BlockHeight;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of the current block height
pub trait BlockClock: Send + Sync {
    /// Current height, non-decreasing across calls
    fn current_block_height(&self) -> BlockHeight;
}

impl<C: BlockClock + ?Sized> BlockClock for Arc<C> {
    fn current_block_height(&self) -> BlockHeight {
        (**self).current_block_height()
    }
}

/// Clock pinned to one height
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock(pub BlockHeight);

impl BlockClock for FixedClock {
    fn current_block_height(&self) -> BlockHeight {
        self.0
    }
}

/// Clock advanced explicitly by the host (one tick per committed block)
#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    /// Start at `height`
    pub fn new(height: BlockHeight) -> Self {
        Self {
            height: AtomicU64::new(height),
        }
    }

    /// Move to the next block, returning the new height
    pub fn tick(&self) -> BlockHeight {
        self.height.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Jump forward to `height`. Lower values are ignored.
    pub fn advance_to(&self, height: BlockHeight) -> BlockHeight {
        let previous = self.height.fetch_max(height, Ordering::SeqCst);
        previous.max(height)
    }
}

impl BlockClock for ManualClock {
    fn current_block_height(&self) -> BlockHeight {
        self.height.load(Ordering::SeqCst)
    }
}
