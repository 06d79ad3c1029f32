//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the marketplace.
//!
//! # Metrics
//!
//! - `market_listings_total` - Total number of listings registered
//! - `market_purchases_total` - Total number of purchases booked
//! - `market_rejections_total{code}` - Rejected operations by error code
//! - `market_fees_collected` - Sum of fee amounts booked

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total listings registered
    pub listings_total: IntCounter,

    /// Total purchases booked
    pub purchases_total: IntCounter,

    /// Rejections by error code
    pub rejections_total: IntCounterVec,

    /// Fees booked so far
    pub fees_collected: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let listings_total =
            IntCounter::new("market_listings_total", "Total number of listings registered")?;
        registry.register(Box::new(listings_total.clone()))?;

        let purchases_total =
            IntCounter::new("market_purchases_total", "Total number of purchases booked")?;
        registry.register(Box::new(purchases_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("market_rejections_total", "Rejected operations by error code"),
            &["code"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let fees_collected =
            IntGauge::new("market_fees_collected", "Sum of fee amounts booked")?;
        registry.register(Box::new(fees_collected.clone()))?;

        Ok(Self {
            listings_total,
            purchases_total,
            rejections_total,
            fees_collected,
            registry,
        })
    }

    /// Record listing registration
    pub fn record_listing(&self) {
        self.listings_total.inc();
    }

    /// Record purchase and the running fee total
    pub fn record_purchase(&self, fees_collected: u64) {
        self.purchases_total.inc();
        self.set_fees_collected(fees_collected);
    }

    /// Set the fee gauge to a running total
    pub fn set_fees_collected(&self, fees_collected: u64) {
        self.fees_collected
            .set(i64::try_from(fees_collected).unwrap_or(i64::MAX));
    }

    /// Record rejected operation
    pub fn record_rejection(&self, code: &str) {
        self.rejections_total.with_label_values(&[code]).inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.listings_total.get(), 0);
        assert_eq!(metrics.purchases_total.get(), 0);
    }

    #[test]
    fn test_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_listing();
        assert_eq!(a.listings_total.get(), 1);
        assert_eq!(b.listings_total.get(), 0);
    }

    #[test]
    fn test_record_purchase() {
        let metrics = Metrics::new().unwrap();
        metrics.record_purchase(3);
        metrics.record_purchase(6);
        assert_eq!(metrics.purchases_total.get(), 2);
        assert_eq!(metrics.fees_collected.get(), 6);
    }

    #[test]
    fn test_fee_gauge_saturates() {
        let metrics = Metrics::new().unwrap();
        metrics.set_fees_collected(u64::MAX);
        assert_eq!(metrics.fees_collected.get(), i64::MAX);
        assert_eq!(metrics.purchases_total.get(), 0);
    }

    #[test]
    fn test_record_rejection_by_code() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejection("ERR_UNAUTHORIZED");
        metrics.record_rejection("ERR_UNAUTHORIZED");
        metrics.record_rejection("ERR_PRICE_INVALID");

        let unauthorized = metrics
            .rejections_total
            .with_label_values(&["ERR_UNAUTHORIZED"])
            .get();
        assert_eq!(unauthorized, 2);
        assert_eq!(metrics.registry().gather().len(), 4);
    }
}
