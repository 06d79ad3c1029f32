//! Platform fee and settlement split
//!
//! The fee is a whole percentage of the sale price. Integer division
//! truncates the fee amount; the seller share takes the remainder, so
//! `fee + seller_share == price` always holds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fee rate as a whole percentage (0..=100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Percentage(u8);

impl Percentage {
    /// Upper bound
    pub const MAX: Percentage = Percentage(100);

    /// Create from a whole percent, `None` above 100
    pub fn from_percent(percent: u8) -> Option<Self> {
        if percent <= Self::MAX.0 {
            Some(Self(percent))
        } else {
            None
        }
    }

    /// Whole percent value
    pub fn percent(&self) -> u8 {
        self.0
    }

    /// `floor(amount * self / 100)`
    pub fn of(&self, amount: u64) -> u64 {
        // u128 intermediate: amount * 100 cannot overflow
        (amount as u128 * self.0 as u128 / 100) as u64
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// How a sale price is divided between platform and seller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Sale price
    pub price: u64,

    /// Platform fee (rounded down)
    pub fee_amount: u64,

    /// Seller proceeds
    pub seller_share: u64,
}

impl Settlement {
    /// Split `price` at `fee`
    pub fn split(price: u64, fee: Percentage) -> Self {
        let fee_amount = fee.of(price);
        Self {
            price,
            fee_amount,
            seller_share: price - fee_amount,
        }
    }
}
