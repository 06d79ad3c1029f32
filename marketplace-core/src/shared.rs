//! Thread-safe ledger wrapper
//!
//! Writes take the exclusive lock, reads share it. A write is never observed
//! half-applied because the whole operation runs under one guard.

use crate::{
    clock::BlockClock,
    events::MarketEvent,
    fees::Settlement,
    ledger::MarketplaceLedger,
    types::{ItemId, LedgerCounters, Listing, Principal},
    Result,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable handle to a ledger guarded by a reader-writer lock
pub struct SharedLedger<C: BlockClock> {
    inner: Arc<RwLock<MarketplaceLedger<C>>>,
}

impl<C: BlockClock> Clone for SharedLedger<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: BlockClock> SharedLedger<C> {
    /// Wrap a ledger
    pub fn new(ledger: MarketplaceLedger<C>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// See [`MarketplaceLedger::register_content`]
    pub fn register_content(
        &self,
        price: u64,
        summary: &str,
        content_type: &str,
        access_token: &str,
        seller: &Principal,
    ) -> Result<ItemId> {
        self.inner
            .write()
            .register_content(price, summary, content_type, access_token, seller)
    }

    /// See [`MarketplaceLedger::acquire_content`]
    pub fn acquire_content(&self, item_id: ItemId, buyer: &Principal) -> Result<()> {
        self.inner.write().acquire_content(item_id, buyer)
    }

    /// See [`MarketplaceLedger::retrieve_access_token`]
    pub fn retrieve_access_token(&self, item_id: ItemId, buyer: &Principal) -> Result<String> {
        self.inner.read().retrieve_access_token(item_id, buyer)
    }

    /// See [`MarketplaceLedger::quote`]
    pub fn quote(&self, item_id: ItemId) -> Result<Settlement> {
        self.inner.read().quote(item_id)
    }

    /// Copy of a listing
    pub fn listing(&self, item_id: ItemId) -> Option<Listing> {
        self.inner.read().listing(item_id).cloned()
    }

    /// Copy of the counters
    pub fn counters(&self) -> LedgerCounters {
        *self.inner.read().counters()
    }

    /// See [`MarketplaceLedger::drain_events`]
    pub fn drain_events(&self) -> Vec<MarketEvent> {
        self.inner.write().drain_events()
    }

    /// Run a read-only closure under the shared lock
    pub fn read<R>(&self, f: impl FnOnce(&MarketplaceLedger<C>) -> R) -> R {
        f(&self.inner.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::fees::Percentage;
    use crate::Error;
    use std::thread;

    fn create_shared() -> SharedLedger<FixedClock> {
        SharedLedger::new(MarketplaceLedger::new(
            Percentage::from_percent(3).unwrap(),
            FixedClock(100),
        ))
    }

    #[test]
    fn test_concurrent_registrations_get_distinct_ids() {
        let shared = create_shared();

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let seller = Principal::new(format!("seller{}", n));
                    (0..25)
                        .map(|_| {
                            shared
                                .register_content(10, "summary", "image", "token", &seller)
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .map(|id| id.get())
            .collect();
        ids.sort_unstable();

        assert_eq!(ids, (1..=200).collect::<Vec<_>>());
        assert_eq!(shared.counters().next_item_id, ItemId::new(201));
    }

    #[test]
    fn test_buyer_observes_own_purchase() {
        let shared = create_shared();
        let seller = Principal::new("user1");
        let item_id = shared
            .register_content(100, "Test Content", "image", "secure-token-123", &seller)
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let buyer = Principal::new(format!("buyer{}", n));
                    shared.acquire_content(item_id, &buyer).unwrap();
                    shared.retrieve_access_token(item_id, &buyer).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "secure-token-123");
        }
        assert_eq!(shared.counters().total_volume, 4);
        assert_eq!(shared.drain_events().len(), 5);
    }

    #[test]
    fn test_read_closure() {
        let shared = create_shared();
        let count = shared.read(|ledger| ledger.listing_count());
        assert_eq!(count, 0);
        assert!(matches!(
            shared.quote(ItemId::new(1)),
            Err(Error::ItemUnavailable(1))
        ));
        assert!(shared.listing(ItemId::new(1)).is_none());
    }
}
