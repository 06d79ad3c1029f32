//! Core types for the marketplace ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Typed table keys (`ItemId`, `Principal`) instead of string maps
//! - Exact integer arithmetic for prices and fees

use crate::fees::Percentage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Block height reported by the host clock
pub type BlockHeight = u64;

/// Listing identifier, allocated sequentially from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(u64);

impl ItemId {
    /// First id handed out by a fresh ledger
    pub const FIRST: ItemId = ItemId(1);

    /// Create new item ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw value
    pub fn get(&self) -> u64 {
        self.0
    }

    /// The id allocated after this one, `None` once the id space is spent
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Big-endian key bytes (sorts like the numeric value)
    pub fn to_key(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque caller identity (account address, user handle, etc.)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Create new principal
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Principal {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A seller's offer of content at a fixed price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Seller
    pub owner: Principal,

    /// Asking price (always > 0)
    pub price: u64,

    /// Human-readable summary
    pub summary: String,

    /// Content type (e.g. "image")
    pub content_type: String,

    /// Whether the listing accepts purchases
    pub tradeable: bool,

    /// Height at which the listing was registered
    pub created_at: BlockHeight,
}

/// Secret disclosed only to an authorized buyer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Token value, returned verbatim
    pub token: String,
}

/// Proof that a buyer purchased an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Purchased item
    pub item_id: ItemId,

    /// Height at which the purchase was booked
    pub purchased_at: BlockHeight,

    /// Price paid
    pub price: u64,

    /// Listing owner at purchase time
    pub seller: Principal,
}

/// Ledger-wide scalars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCounters {
    /// Id the next registration receives
    pub next_item_id: ItemId,

    /// Platform fee
    pub fee: Percentage,

    /// Number of settled purchases
    pub total_volume: u64,

    /// Sum of all fee amounts booked
    pub fees_collected: u64,
}

impl LedgerCounters {
    /// Counters for an empty ledger
    pub fn new(fee: Percentage) -> Self {
        Self {
            next_item_id: ItemId::FIRST,
            fee,
            total_volume: 0,
            fees_collected: 0,
        }
    }
}

/// Complete ledger contents: the four keyed tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Listings by item
    pub listings: HashMap<ItemId, Listing>,

    /// Access tokens by item
    pub access_tokens: HashMap<ItemId, AccessToken>,

    /// Latest purchase by buyer
    pub purchases: HashMap<Principal, PurchaseRecord>,

    /// Scalars
    pub counters: LedgerCounters,
}

impl LedgerState {
    /// Empty state with the given fee
    pub fn new(fee: Percentage) -> Self {
        Self {
            listings: HashMap::new(),
            access_tokens: HashMap::new(),
            purchases: HashMap::new(),
            counters: LedgerCounters::new(fee),
        }
    }

    /// Check the table invariants hold.
    ///
    /// Every listing has a token, every purchase points at a listing, and no
    /// existing id is at or beyond `next_item_id`.
    pub fn is_consistent(&self) -> bool {
        let next = self.counters.next_item_id;

        self.listings.len() == self.access_tokens.len()
            && self
                .listings
                .keys()
                .all(|id| *id < next && self.access_tokens.contains_key(id))
            && self
                .purchases
                .values()
                .all(|record| self.listings.contains_key(&record.item_id))
    }
}
