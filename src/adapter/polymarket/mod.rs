//! Polymarket exchange integration.

mod account;
#[cfg(feature = "polymarket")]
mod executor;
mod message;
mod websocket;

pub use account::{summarize, DataApiAccount, PositionRow};
#[cfg(feature = "polymarket")]
pub use executor::LiveExecutor;
pub use message::{
    decode_frame, PolymarketBookMessage, PolymarketSubscribeMessage, PolymarketWsMessage,
    WireDecimal,
};
pub use websocket::{PolymarketDataStream, PING_INTERVAL};
