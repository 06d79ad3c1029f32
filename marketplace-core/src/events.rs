//! Audit journal of accepted writes
//!
//! Every successful registration or purchase appends one event. Rejected
//! operations leave no trace here (they are counted in metrics instead).

use crate::fees::Settlement;
use crate::types::{BlockHeight, ItemId, Principal};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEvent {
    /// Unique event ID (UUIDv7 for time-ordering)
    pub event_id: Uuid,

    /// Height at which the write was applied
    pub height: BlockHeight,

    /// What happened
    pub kind: MarketEventKind,
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEventKind {
    /// New listing registered
    ContentRegistered {
        /// Allocated id
        item_id: ItemId,
        /// Listing owner
        seller: Principal,
        /// Asking price
        price: u64,
    },

    /// Purchase booked
    ContentAcquired {
        /// Purchased item
        item_id: ItemId,
        /// Buyer
        buyer: Principal,
        /// Listing owner
        seller: Principal,
        /// Fee split of the price
        settlement: Settlement,
    },
}

impl MarketEvent {
    /// Stamp a new event
    pub fn new(height: BlockHeight, kind: MarketEventKind) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            height,
            kind,
        }
    }

    /// Item the event concerns
    pub fn item_id(&self) -> ItemId {
        match &self.kind {
            MarketEventKind::ContentRegistered { item_id, .. }
            | MarketEventKind::ContentAcquired { item_id, .. } => *item_id,
        }
    }
}
