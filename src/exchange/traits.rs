//! Exchange trait definitions.
//!
//! These traits define the interface that any exchange implementation must provide.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{BookUpdate, Price, TokenId, Volume};
use crate::error::{Error, ExecutionError};

/// Unique identifier for an order on an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderId(pub String);

impl OrderId {
    /// Create a new OrderId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying ID string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Events received from a market data stream.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    /// Book updates decoded from one feed frame, in frame order.
    BookUpdates(Vec<(TokenId, BookUpdate)>),
    /// Connection established.
    Connected,
    /// Connection lost (may reconnect).
    Disconnected { reason: String },
}

/// Real-time market data stream from an exchange.
///
/// Implementations handle connection management, subscriptions, and message
/// parsing for their specific exchange protocols. `next_event` must be
/// cancel-safe: the event loop races it against timers.
#[async_trait]
pub trait MarketDataStream: Send {
    /// Connect to the exchange's real-time data feed.
    async fn connect(&mut self) -> Result<(), Error>;

    /// Subscribe to market data for the given tokens.
    async fn subscribe(&mut self, token_ids: &[TokenId]) -> Result<(), Error>;

    /// Receive the next market event. `None` when the stream is closed.
    async fn next_event(&mut self) -> Option<MarketEvent>;

    /// Get the exchange name for logging/debugging.
    fn exchange_name(&self) -> &'static str;
}

#[async_trait]
impl MarketDataStream for Box<dyn MarketDataStream> {
    async fn connect(&mut self) -> Result<(), Error> {
        (**self).connect().await
    }

    async fn subscribe(&mut self, token_ids: &[TokenId]) -> Result<(), Error> {
        (**self).subscribe(token_ids).await
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        (**self).next_event().await
    }

    fn exchange_name(&self) -> &'static str {
        (**self).exchange_name()
    }
}

/// One buy order within a basket submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegOrder {
    pub token_id: TokenId,
    /// Limit price before tick rounding.
    pub price: Price,
    pub size: Volume,
    pub tick_size: Price,
}

impl LegOrder {
    /// Limit price rounded up to the tick grid, capped one tick below 1.
    #[must_use]
    pub fn limit_price(&self) -> Price {
        if self.tick_size <= Decimal::ZERO {
            return self.price;
        }
        let rounded = (self.price / self.tick_size).ceil() * self.tick_size;
        rounded.min(Decimal::ONE - self.tick_size)
    }
}

/// Fill report for one leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegFill {
    pub token_id: TokenId,
    pub order_id: OrderId,
    pub filled: Volume,
    pub price: Price,
}

/// Result of a fully filled basket submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BasketFill {
    pub fills: Vec<LegFill>,
}

impl BasketFill {
    /// Sum of `filled * price` over every leg.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.fills.iter().map(|f| f.filled * f.price).sum()
    }

    /// Legs of `orders` not reported as fully filled; these still rest on
    /// the book.
    #[must_use]
    pub fn resting_legs(&self, orders: &[LegOrder]) -> usize {
        orders
            .iter()
            .filter(|order| {
                !self
                    .fills
                    .iter()
                    .any(|f| f.token_id == order.token_id && f.filled >= order.size)
            })
            .count()
    }

    /// Order ids joined for display.
    #[must_use]
    pub fn order_ids(&self) -> String {
        self.fills
            .iter()
            .map(|f| f.order_id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Submits every leg of a basket as one all-or-nothing attempt.
///
/// A partially filled attempt is reported as an error; retrying is the
/// caller's decision.
#[async_trait]
pub trait BasketExecutor: Send + Sync {
    /// Submit simultaneous buy orders for every leg.
    async fn submit(&self, orders: &[LegOrder]) -> Result<BasketFill, ExecutionError>;

    /// Get the exchange name for logging/debugging.
    fn exchange_name(&self) -> &'static str;
}

/// Account-level PnL snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountSnapshot {
    /// Realized plus unrealized PnL across all positions.
    pub total_pnl: Decimal,
    pub open_positions: usize,
    pub open_orders: usize,
}

/// Source of account PnL for the daily loss guard.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn snapshot(&self) -> Result<AccountSnapshot, Error>;
}
