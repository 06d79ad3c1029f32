//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `listings` - Listings (key: item_id, big-endian)
//! - `access_tokens` - Access tokens (key: item_id, big-endian)
//! - `purchases` - Latest purchase per buyer (key: principal bytes)
//! - `counters` - Ledger scalars (single key)
//!
//! Values are bincode. Each accepted ledger write is one `WriteBatch`, so a
//! crash never leaves a listing without its token or a purchase without its
//! counter update.

use crate::{
    config::StorageConfig,
    error::{Error, Result},
    types::{AccessToken, ItemId, LedgerCounters, LedgerState, Listing, Principal, PurchaseRecord},
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::collections::HashMap;

/// Column family names
const CF_LISTINGS: &str = "listings";
const CF_ACCESS_TOKENS: &str = "access_tokens";
const CF_PURCHASES: &str = "purchases";
const CF_COUNTERS: &str = "counters";

/// Key of the single counters row
const COUNTERS_KEY: &[u8] = b"counters";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_LISTINGS, Self::cf_options_tables()),
            ColumnFamilyDescriptor::new(CF_ACCESS_TOKENS, Self::cf_options_tables()),
            ColumnFamilyDescriptor::new(CF_PURCHASES, Self::cf_options_purchases()),
            ColumnFamilyDescriptor::new(CF_COUNTERS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db })
    }

    // Column family options

    fn cf_options_tables() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_purchases() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Point lookups by buyer on every token retrieval
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Atomic writes

    /// Persist a new listing, its token and the bumped counters
    pub fn commit_registration(
        &self,
        item_id: ItemId,
        listing: &Listing,
        token: &AccessToken,
        counters: &LedgerCounters,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        let key = item_id.to_key();

        batch.put_cf(self.cf_handle(CF_LISTINGS)?, key, bincode::serialize(listing)?);
        batch.put_cf(self.cf_handle(CF_ACCESS_TOKENS)?, key, bincode::serialize(token)?);
        batch.put_cf(
            self.cf_handle(CF_COUNTERS)?,
            COUNTERS_KEY,
            bincode::serialize(counters)?,
        );

        self.db.write(batch)?;

        tracing::debug!(item_id = %item_id, "Registration persisted");

        Ok(())
    }

    /// Persist a buyer's purchase record and the updated counters
    pub fn commit_purchase(
        &self,
        buyer: &Principal,
        record: &PurchaseRecord,
        counters: &LedgerCounters,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();

        batch.put_cf(
            self.cf_handle(CF_PURCHASES)?,
            buyer.as_str().as_bytes(),
            bincode::serialize(record)?,
        );
        batch.put_cf(
            self.cf_handle(CF_COUNTERS)?,
            COUNTERS_KEY,
            bincode::serialize(counters)?,
        );

        self.db.write(batch)?;

        tracing::debug!(buyer = %buyer, item_id = %record.item_id, "Purchase persisted");

        Ok(())
    }

    // Point reads

    /// Get listing by ID
    pub fn get_listing(&self, item_id: ItemId) -> Result<Option<Listing>> {
        let cf = self.cf_handle(CF_LISTINGS)?;
        match self.db.get_cf(cf, item_id.to_key())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Get a buyer's purchase record
    pub fn get_purchase(&self, buyer: &Principal) -> Result<Option<PurchaseRecord>> {
        let cf = self.cf_handle(CF_PURCHASES)?;
        match self.db.get_cf(cf, buyer.as_str().as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Get counters
    pub fn get_counters(&self) -> Result<Option<LedgerCounters>> {
        let cf = self.cf_handle(CF_COUNTERS)?;
        match self.db.get_cf(cf, COUNTERS_KEY)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    // Full load

    /// Rebuild all four tables. `None` for a fresh database.
    pub fn load_state(&self) -> Result<Option<LedgerState>> {
        let counters = match self.get_counters()? {
            Some(counters) => counters,
            None => {
                let cf = self.cf_handle(CF_LISTINGS)?;
                if self.db.iterator_cf(cf, IteratorMode::Start).next().is_some() {
                    return Err(Error::Storage(
                        "Listings present but counters row missing".to_string(),
                    ));
                }
                return Ok(None);
            }
        };

        let mut listings = HashMap::new();
        for item in self.db.iterator_cf(self.cf_handle(CF_LISTINGS)?, IteratorMode::Start) {
            let (key, value) = item?;
            listings.insert(Self::decode_item_key(&key)?, bincode::deserialize(&value)?);
        }

        let mut access_tokens = HashMap::new();
        for item in self.db.iterator_cf(self.cf_handle(CF_ACCESS_TOKENS)?, IteratorMode::Start) {
            let (key, value) = item?;
            access_tokens.insert(Self::decode_item_key(&key)?, bincode::deserialize(&value)?);
        }

        let mut purchases = HashMap::new();
        for item in self.db.iterator_cf(self.cf_handle(CF_PURCHASES)?, IteratorMode::Start) {
            let (key, value) = item?;
            let buyer = std::str::from_utf8(&key)
                .map_err(|e| Error::Storage(format!("Invalid principal key: {}", e)))?;
            purchases.insert(Principal::new(buyer), bincode::deserialize(&value)?);
        }

        Ok(Some(LedgerState {
            listings,
            access_tokens,
            purchases,
            counters,
        }))
    }

    fn decode_item_key(key: &[u8]) -> Result<ItemId> {
        let bytes: [u8; 8] = key
            .try_into()
            .map_err(|_| Error::Storage(format!("Invalid item key length {}", key.len())))?;
        Ok(ItemId::new(u64::from_be_bytes(bytes)))
    }

    /// Flush memtables and release the database
    pub fn close(self) -> Result<()> {
        self.db.flush()?;
        tracing::info!(path = %self.db.path().display(), "Marketplace storage flushed and closed");
        Ok(())
    }
}
