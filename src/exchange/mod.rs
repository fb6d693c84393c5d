//! Exchange abstraction layer.
//!
//! Defines traits that exchange implementations must fulfill, plus the
//! reconnecting stream wrapper that works over any of them.

mod reconnecting;
mod traits;

pub use reconnecting::{ReconnectingDataStream, ReconnectionConfig};
pub use traits::{
    AccountSnapshot, AccountSource, BasketExecutor, BasketFill, LegFill, LegOrder,
    MarketDataStream, MarketEvent, OrderId,
};
