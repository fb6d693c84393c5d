//! Order book types for market depth representation.
//!
//! - [`PriceLevel`] - A single price level with size
//! - [`LocalBook`] - Cached book state for a single contract
//! - [`BookUpdate`] - What a feed message says about one contract
//!
//! # Order Book Structure
//!
//! - **Bids**: sorted by price descending (best bid first)
//! - **Asks**: sorted by price ascending (best ask first)
//!
//! A side is *synthetic* when it was derived from a best-bid/best-ask
//! summary rather than full depth. Synthetic levels carry a size of zero,
//! meaning "unknown", and nothing beyond the top level is known.
//!
//! # Examples
//!
//! ```
//! use basketwatch::domain::{BookUpdate, LocalBook, PriceLevel, TokenId};
//! use rust_decimal_macros::dec;
//!
//! let mut book = LocalBook::new(TokenId::new("yes-token"));
//! book.apply(
//!     BookUpdate::Snapshot {
//!         bids: vec![PriceLevel::new(dec!(0.44), dec!(200)), PriceLevel::new(dec!(0.45), dec!(100))],
//!         asks: vec![PriceLevel::new(dec!(0.47), dec!(300)), PriceLevel::new(dec!(0.46), dec!(150))],
//!     },
//!     chrono::Utc::now(),
//! );
//!
//! assert_eq!(book.best_bid().unwrap().price(), dec!(0.45));
//! assert_eq!(book.best_ask().unwrap().price(), dec!(0.46));
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::id::TokenId;
use super::money::{Price, Volume};

/// A single price level in an order book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevel {
    price: Price,
    size: Volume,
}

impl PriceLevel {
    /// Creates a new price level.
    #[must_use]
    pub const fn new(price: Price, size: Volume) -> Self {
        Self { price, size }
    }

    /// Returns the price at this level.
    #[must_use]
    pub const fn price(&self) -> Price {
        self.price
    }

    /// Returns the total volume available at this level.
    #[must_use]
    pub const fn size(&self) -> Volume {
        self.size
    }
}

/// What one feed message reports for a single contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookUpdate {
    /// Full depth for both sides.
    Snapshot {
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    },
    /// Top-of-book summary. `None` means the message said nothing about
    /// that side.
    Summary {
        best_bid: Option<Price>,
        best_ask: Option<Price>,
    },
}

/// Cached book state for one tracked contract.
///
/// Overwritten in place on every relevant message. A summary that only
/// carries one side leaves the other side exactly as it was.
#[derive(Debug, Clone)]
pub struct LocalBook {
    token_id: TokenId,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    bids_synthetic: bool,
    asks_synthetic: bool,
    updated_at: Option<DateTime<Utc>>,
}

impl LocalBook {
    /// Creates an empty book that has never been updated.
    #[must_use]
    pub const fn new(token_id: TokenId) -> Self {
        Self {
            token_id,
            bids: Vec::new(),
            asks: Vec::new(),
            bids_synthetic: false,
            asks_synthetic: false,
            updated_at: None,
        }
    }

    /// Apply one update in place.
    pub fn apply(&mut self, update: BookUpdate, now: DateTime<Utc>) {
        match update {
            BookUpdate::Snapshot { bids, asks } => {
                self.bids = normalize(bids, true);
                self.asks = normalize(asks, false);
                self.bids_synthetic = false;
                self.asks_synthetic = false;
            }
            BookUpdate::Summary { best_bid, best_ask } => {
                if let Some(price) = best_bid {
                    self.bids = synthetic_side(price);
                    self.bids_synthetic = true;
                }
                if let Some(price) = best_ask {
                    self.asks = synthetic_side(price);
                    self.asks_synthetic = true;
                }
            }
        }
        self.updated_at = Some(now);
    }

    /// Returns the token ID for this book.
    #[must_use]
    pub const fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    /// Bid levels, best first.
    #[must_use]
    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    /// Ask levels, best first.
    #[must_use]
    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    /// Returns the best bid (highest buy price).
    #[must_use]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Returns the best ask (lowest sell price).
    #[must_use]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    #[must_use]
    pub const fn bids_synthetic(&self) -> bool {
        self.bids_synthetic
    }

    #[must_use]
    pub const fn asks_synthetic(&self) -> bool {
        self.asks_synthetic
    }

    /// When the last message for this contract was applied.
    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

fn synthetic_side(price: Price) -> Vec<PriceLevel> {
    if price <= Decimal::ZERO {
        Vec::new()
    } else {
        vec![PriceLevel::new(price, Decimal::ZERO)]
    }
}

/// Drop empty levels and sort best-first.
fn normalize(mut levels: Vec<PriceLevel>, descending: bool) -> Vec<PriceLevel> {
    levels.retain(|l| l.size > Decimal::ZERO && l.price > Decimal::ZERO);
    if descending {
        levels.sort_by(|a, b| b.price.cmp(&a.price));
    } else {
        levels.sort_by(|a, b| a.price.cmp(&b.price));
    }
    levels
}
