//! Error types for the marketplace ledger

use thiserror::Error;

/// Result type for marketplace operations
pub type Result<T> = std::result::Result<T, Error>;

/// Marketplace errors
#[derive(Error, Debug)]
pub enum Error {
    /// Asking price is not strictly positive
    #[error("Price must be greater than zero")]
    PriceInvalid,

    /// One or more required string fields are empty
    #[error("Summary, content type and access token must be non-empty")]
    InputInvalid,

    /// Item has no listing, or its listing is not tradeable
    #[error("Item {0} is not available")]
    ItemUnavailable(u64),

    /// Buyer is the listing owner
    #[error("Seller cannot acquire their own listing")]
    SelfTradeBlocked,

    /// Caller holds no purchase record for the requested item
    #[error("No purchase record for item {0}")]
    Unauthorized(u64),

    /// Every item id has been allocated
    #[error("Item id space exhausted")]
    ItemIdsExhausted,

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::PriceInvalid => "ERR_PRICE_INVALID",
            Error::InputInvalid => "ERR_INPUT_INVALID",
            Error::ItemUnavailable(_) => "ERR_ITEM_UNAVAILABLE",
            Error::SelfTradeBlocked => "ERR_SELF_TRADE_BLOCKED",
            Error::Unauthorized(_) => "ERR_UNAUTHORIZED",
            Error::ItemIdsExhausted => "ERR_ITEM_IDS_EXHAUSTED",
            Error::Storage(_) => "ERR_STORAGE",
            Error::Serialization(_) => "ERR_SERIALIZATION",
            Error::Config(_) => "ERR_CONFIG",
            Error::Concurrency(_) => "ERR_CONCURRENCY",
            Error::Io(_) => "ERR_IO",
        }
    }

    /// True for validation failures the caller fixes by correcting input.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::PriceInvalid
                | Error::InputInvalid
                | Error::ItemUnavailable(_)
                | Error::SelfTradeBlocked
                | Error::Unauthorized(_)
        )
    }
}

#[cfg(feature = "persistence")]
impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::PriceInvalid.code(), "ERR_PRICE_INVALID");
        assert_eq!(Error::InputInvalid.code(), "ERR_INPUT_INVALID");
        assert_eq!(Error::ItemUnavailable(999).code(), "ERR_ITEM_UNAVAILABLE");
        assert_eq!(Error::SelfTradeBlocked.code(), "ERR_SELF_TRADE_BLOCKED");
        assert_eq!(Error::Unauthorized(1).code(), "ERR_UNAUTHORIZED");
    }

    #[test]
    fn test_rejection_classification() {
        assert!(Error::PriceInvalid.is_rejection());
        assert!(Error::Unauthorized(1).is_rejection());
        assert!(!Error::Storage("disk full".to_string()).is_rejection());
        assert!(!Error::Concurrency("closed".to_string()).is_rejection());
        assert!(!Error::ItemIdsExhausted.is_rejection());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::ItemUnavailable(999).to_string(),
            "Item 999 is not available"
        );
    }
}
