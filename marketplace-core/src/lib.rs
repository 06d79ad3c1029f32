//! Content Marketplace Ledger Core
//!
//! Ledger for a digital-content marketplace: sellers list content, buyers
//! purchase it (paying a platform fee), and only a verified buyer may
//! retrieve the purchased content's access token.
//!
//! # Architecture
//!
//! - **State Machine**: `MarketplaceLedger` owns four typed tables and applies
//!   register / acquire / retrieve as all-or-nothing transitions
//! - **Host Clock**: Block heights come from a `BlockClock`, never wall time
//! - **Single Writer**: `SharedLedger` (RwLock) or `LedgerHandle` (actor)
//!   serialize writes for concurrent callers
//! - **Durability**: Optional RocksDB tables (`persistence` feature)
//!
//! # Invariants
//!
//! - Item ids are allocated 1, 2, 3, ... and never reused
//! - Every listing has exactly one access token
//! - Fee conservation: fee + seller share == price for every purchase
//! - One purchase record per buyer; the latest purchase wins

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    clippy::all
)]

pub mod types;
pub mod fees;
pub mod clock;
pub mod ledger;
pub mod events;
pub mod error;
pub mod actor;
pub mod shared;
pub mod config;
pub mod metrics;
#[cfg(feature = "persistence")]
pub mod storage;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    AccessToken, BlockHeight, ItemId, LedgerCounters, LedgerState, Listing, Principal,
    PurchaseRecord,
};
pub use fees::{Percentage, Settlement};
pub use clock::{BlockClock, FixedClock, ManualClock};
pub use events::{MarketEvent, MarketEventKind};
pub use ledger::MarketplaceLedger;
pub use shared::SharedLedger;
pub use actor::{spawn_ledger_actor, LedgerHandle};
pub use config::Config;
pub use metrics::Metrics;
#[cfg(feature = "persistence")]
pub use storage::Storage;
