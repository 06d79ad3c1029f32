//! Marketplace ledger state machine
//!
//! Owns the four tables (listings, access tokens, purchase records,
//! counters) and applies the three state transitions. Every operation is
//! all-or-nothing: validation runs first, the durable write (if any) second,
//! and in-memory state changes only after both succeed.
//!
//! # Example
//!
//! ```
//! use marketplace_core::{FixedClock, MarketplaceLedger, Percentage, Principal};
//!
//! let fee = Percentage::from_percent(3).unwrap();
//! let mut ledger = MarketplaceLedger::new(fee, FixedClock(100));
//!
//! let seller = Principal::new("user1");
//! let buyer = Principal::new("user2");
//!
//! let item = ledger
//!     .register_content(100, "Test Content", "image", "secure-token-123", &seller)
//!     .unwrap();
//! ledger.acquire_content(item, &buyer).unwrap();
//!
//! assert_eq!(ledger.retrieve_access_token(item, &buyer).unwrap(), "secure-token-123");
//! ```

use crate::{
    clock::BlockClock,
    events::{MarketEvent, MarketEventKind},
    fees::{Percentage, Settlement},
    metrics::Metrics,
    types::{AccessToken, ItemId, LedgerCounters, LedgerState, Listing, Principal, PurchaseRecord},
    Config, Error, Result,
};

#[cfg(feature = "persistence")]
use crate::storage::Storage;

/// Content marketplace ledger
pub struct MarketplaceLedger<C: BlockClock> {
    /// The four keyed tables
    state: LedgerState,

    /// Host block-height clock
    clock: C,

    /// Accepted writes since the last drain
    journal: Vec<MarketEvent>,

    /// Optional Prometheus metrics
    metrics: Option<Metrics>,

    /// Durable copy of `state`
    #[cfg(feature = "persistence")]
    storage: Option<Storage>,
}

impl<C: BlockClock> MarketplaceLedger<C> {
    /// Empty in-memory ledger
    pub fn new(fee: Percentage, clock: C) -> Self {
        Self::from_state(LedgerState::new(fee), clock)
    }

    /// Resume from existing tables
    pub fn from_state(state: LedgerState, clock: C) -> Self {
        Self {
            state,
            clock,
            journal: Vec::new(),
            metrics: None,
            #[cfg(feature = "persistence")]
            storage: None,
        }
    }

    /// Open ledger with configuration
    ///
    /// With storage enabled the tables are loaded from RocksDB and every
    /// accepted write is persisted before it is applied in memory. The fee
    /// always comes from `config`.
    pub fn open(config: &Config, clock: C) -> Result<Self> {
        config.validate()?;
        let fee = config.fee()?;

        if !config.storage.enabled {
            tracing::info!(fee = %fee, "Opened in-memory marketplace ledger");
            return Ok(Self::new(fee, clock));
        }

        Self::open_persistent(config, fee, clock)
    }

    #[cfg(feature = "persistence")]
    fn open_persistent(config: &Config, fee: Percentage, clock: C) -> Result<Self> {
        let storage = Storage::open(&config.storage)?;
        let mut state = storage.load_state()?.unwrap_or_else(|| LedgerState::new(fee));
        state.counters.fee = fee;

        if !state.is_consistent() {
            return Err(Error::Storage(
                "Persisted tables violate ledger invariants".to_string(),
            ));
        }

        tracing::info!(
            listings = state.listings.len(),
            purchases = state.purchases.len(),
            next_item_id = %state.counters.next_item_id,
            fee = %fee,
            "Opened persistent marketplace ledger"
        );

        let mut ledger = Self::from_state(state, clock);
        ledger.storage = Some(storage);
        Ok(ledger)
    }

    #[cfg(not(feature = "persistence"))]
    fn open_persistent(_config: &Config, _fee: Percentage, _clock: C) -> Result<Self> {
        Err(Error::Config(
            "storage.enabled requires the `persistence` feature".to_string(),
        ))
    }

    /// Attach metrics, seeding the fee gauge from the loaded counters
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        metrics.set_fees_collected(self.state.counters.fees_collected);
        self.metrics = Some(metrics);
        self
    }

    /// Release the ledger, flushing and closing storage if attached
    pub fn close(self) -> Result<()> {
        tracing::info!(
            next_item_id = %self.state.counters.next_item_id,
            total_volume = self.state.counters.total_volume,
            "Closing marketplace ledger"
        );
        self.close_storage()
    }

    /// Register a new listing and its access token.
    ///
    /// The price is validated before the string fields, so a request that is
    /// wrong on both counts reports `PriceInvalid`.
    pub fn register_content(
        &mut self,
        price: u64,
        summary: &str,
        content_type: &str,
        access_token: &str,
        seller: &Principal,
    ) -> Result<ItemId> {
        if price == 0 {
            return Err(self.reject("register_content", Error::PriceInvalid));
        }
        if summary.is_empty() || content_type.is_empty() || access_token.is_empty() {
            return Err(self.reject("register_content", Error::InputInvalid));
        }

        let item_id = self.state.counters.next_item_id;
        let next_item_id = match item_id.next() {
            Some(next) => next,
            None => return Err(self.reject("register_content", Error::ItemIdsExhausted)),
        };
        let height = self.clock.current_block_height();

        let listing = Listing {
            owner: seller.clone(),
            price,
            summary: summary.to_string(),
            content_type: content_type.to_string(),
            tradeable: true,
            created_at: height,
        };
        let token = AccessToken {
            token: access_token.to_string(),
        };
        let counters = LedgerCounters {
            next_item_id,
            ..self.state.counters
        };

        self.persist_registration(item_id, &listing, &token, &counters)?;

        self.state.listings.insert(item_id, listing);
        self.state.access_tokens.insert(item_id, token);
        self.state.counters = counters;

        self.journal.push(MarketEvent::new(
            height,
            MarketEventKind::ContentRegistered {
                item_id,
                seller: seller.clone(),
                price,
            },
        ));
        if let Some(metrics) = &self.metrics {
            metrics.record_listing();
        }

        tracing::info!(item_id = %item_id, seller = %seller, price, height, "Content registered");

        Ok(item_id)
    }

    /// Book a purchase of `item_id` by `buyer`.
    ///
    /// The listing stays tradeable, so any number of buyers may purchase it.
    /// The buyer's previous purchase record, if any, is replaced.
    pub fn acquire_content(&mut self, item_id: ItemId, buyer: &Principal) -> Result<()> {
        let (price, seller, tradeable) = match self.state.listings.get(&item_id) {
            Some(listing) => (listing.price, listing.owner.clone(), listing.tradeable),
            None => {
                return Err(self.reject("acquire_content", Error::ItemUnavailable(item_id.get())))
            }
        };

        if &seller == buyer {
            return Err(self.reject("acquire_content", Error::SelfTradeBlocked));
        }
        if !tradeable {
            return Err(self.reject("acquire_content", Error::ItemUnavailable(item_id.get())));
        }

        let height = self.clock.current_block_height();
        let settlement = Settlement::split(price, self.state.counters.fee);

        let record = PurchaseRecord {
            item_id,
            purchased_at: height,
            price,
            seller: seller.clone(),
        };
        let counters = LedgerCounters {
            total_volume: self.state.counters.total_volume.saturating_add(1),
            fees_collected: self
                .state
                .counters
                .fees_collected
                .saturating_add(settlement.fee_amount),
            ..self.state.counters
        };

        self.persist_purchase(buyer, &record, &counters)?;

        let replaced = self.state.purchases.insert(buyer.clone(), record);
        self.state.counters = counters;

        self.journal.push(MarketEvent::new(
            height,
            MarketEventKind::ContentAcquired {
                item_id,
                buyer: buyer.clone(),
                seller: seller.clone(),
                settlement,
            },
        ));
        if let Some(metrics) = &self.metrics {
            metrics.record_purchase(counters.fees_collected);
        }

        if let Some(previous) = replaced {
            tracing::debug!(
                buyer = %buyer,
                previous_item_id = %previous.item_id,
                "Replaced earlier purchase record"
            );
        }
        tracing::info!(
            item_id = %item_id,
            buyer = %buyer,
            seller = %seller,
            price,
            fee = settlement.fee_amount,
            seller_share = settlement.seller_share,
            height,
            "Content acquired"
        );

        Ok(())
    }

    /// Disclose the access token of `item_id` to `buyer`.
    ///
    /// Only the buyer's latest purchase authorizes retrieval. Retrieval has no
    /// side effects and may be repeated.
    pub fn retrieve_access_token(&self, item_id: ItemId, buyer: &Principal) -> Result<String> {
        let authorized = self
            .state
            .purchases
            .get(buyer)
            .is_some_and(|record| record.item_id == item_id);

        if !authorized {
            return Err(self.reject("retrieve_access_token", Error::Unauthorized(item_id.get())));
        }

        let token = self
            .state
            .access_tokens
            .get(&item_id)
            .ok_or_else(|| self.reject("retrieve_access_token", Error::Unauthorized(item_id.get())))?;

        tracing::debug!(item_id = %item_id, buyer = %buyer, "Access token retrieved");

        Ok(token.token.clone())
    }

    /// Fee split a purchase of `item_id` would book right now
    pub fn quote(&self, item_id: ItemId) -> Result<Settlement> {
        self.state
            .listings
            .get(&item_id)
            .filter(|listing| listing.tradeable)
            .map(|listing| Settlement::split(listing.price, self.state.counters.fee))
            .ok_or(Error::ItemUnavailable(item_id.get()))
    }

    /// Listing by id
    pub fn listing(&self, item_id: ItemId) -> Option<&Listing> {
        self.state.listings.get(&item_id)
    }

    /// Whether `item_id` has a stored access token
    pub fn access_token_exists(&self, item_id: ItemId) -> bool {
        self.state.access_tokens.contains_key(&item_id)
    }

    /// Latest purchase by `buyer`
    pub fn purchase_record(&self, buyer: &Principal) -> Option<&PurchaseRecord> {
        self.state.purchases.get(buyer)
    }

    /// Ledger-wide scalars
    pub fn counters(&self) -> &LedgerCounters {
        &self.state.counters
    }

    /// Platform fee
    pub fn fee(&self) -> Percentage {
        self.state.counters.fee
    }

    /// Number of listings ever registered
    pub fn listing_count(&self) -> usize {
        self.state.listings.len()
    }

    /// All tables (for snapshots and replay)
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Events accepted since the last drain
    pub fn events(&self) -> &[MarketEvent] {
        &self.journal
    }

    /// Hand off and clear the journal
    pub fn drain_events(&mut self) -> Vec<MarketEvent> {
        std::mem::take(&mut self.journal)
    }

    /// Host clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Log and count a rejected operation
    fn reject(&self, operation: &'static str, err: Error) -> Error {
        tracing::warn!(operation, code = err.code(), "{}", err);
        if let Some(metrics) = &self.metrics {
            metrics.record_rejection(err.code());
        }
        err
    }

    #[cfg(feature = "persistence")]
    fn close_storage(self) -> Result<()> {
        match self.storage {
            Some(storage) => storage.close(),
            None => Ok(()),
        }
    }

    #[cfg(not(feature = "persistence"))]
    fn close_storage(self) -> Result<()> {
        Ok(())
    }

    #[cfg(feature = "persistence")]
    fn persist_registration(
        &self,
        item_id: ItemId,
        listing: &Listing,
        token: &AccessToken,
        counters: &LedgerCounters,
    ) -> Result<()> {
        match &self.storage {
            Some(storage) => storage.commit_registration(item_id, listing, token, counters),
            None => Ok(()),
        }
    }

    #[cfg(not(feature = "persistence"))]
    fn persist_registration(
        &self,
        _item_id: ItemId,
        _listing: &Listing,
        _token: &AccessToken,
        _counters: &LedgerCounters,
    ) -> Result<()> {
        Ok(())
    }

    #[cfg(feature = "persistence")]
    fn persist_purchase(
        &self,
        buyer: &Principal,
        record: &PurchaseRecord,
        counters: &LedgerCounters,
    ) -> Result<()> {
        match &self.storage {
            Some(storage) => storage.commit_purchase(buyer, record, counters),
            None => Ok(()),
        }
    }

    #[cfg(not(feature = "persistence"))]
    fn persist_purchase(
        &self,
        _buyer: &Principal,
        _record: &PurchaseRecord,
        _counters: &LedgerCounters,
    ) -> Result<()> {
        Ok(())
    }
}
