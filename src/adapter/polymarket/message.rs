//! Polymarket WebSocket message types.
//!
//! The market channel sends either a single JSON object or an array of them.
//! Three shapes carry book information:
//!
//! ```json
//! {"event_type":"book","asset_id":"123","bids":[{"price":"0.48","size":"30"}],"asks":[...]}
//! {"event_type":"price_change","market":"0x..","price_changes":[{"asset_id":"123","best_bid":"0.48","best_ask":"0.52"}]}
//! {"event_type":"best_bid_ask","asset_id":"123","best_bid":"0.48","best_ask":"0.52"}
//! ```
//!
//! Prices and sizes arrive as strings or as bare numbers. Anything that does
//! not decode is dropped without an error.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{BookUpdate, PriceLevel, TokenId};

/// Subscription request sent to Polymarket WebSocket
#[derive(Debug, Serialize)]
pub struct PolymarketSubscribeMessage {
    pub assets_ids: Vec<String>,
    #[serde(rename = "type")]
    pub msg_type: String,
}

impl PolymarketSubscribeMessage {
    pub fn new(asset_ids: Vec<String>) -> Self {
        Self {
            assets_ids: asset_ids,
            msg_type: "market".into(),
        }
    }
}

/// A decimal that may be encoded as a JSON string or number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireDecimal {
    Text(String),
    Number(serde_json::Number),
}

impl WireDecimal {
    /// Parsed value, `None` when malformed.
    #[must_use]
    pub fn value(&self) -> Option<Decimal> {
        let raw = match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        };
        raw.parse::<Decimal>()
            .ok()
            .or_else(|| Decimal::from_scientific(&raw).ok())
    }
}

/// Messages received from Polymarket WebSocket.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PolymarketWsMessage {
    Batch(Vec<PolymarketWsEvent>),
    Single(PolymarketWsEvent),
}

/// One object within a frame, matched by shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PolymarketWsEvent {
    Book(PolymarketBookMessage),
    PriceChange(PolymarketPriceChangeMessage),
    BestBidAsk(PolymarketBestBidAsk),
    Unknown(serde_json::Value),
}

#[derive(Debug, Deserialize)]
pub struct PolymarketBookMessage {
    pub asset_id: String,
    #[serde(default)]
    pub market: Option<String>,
    pub bids: Vec<PolymarketWsPriceLevel>,
    pub asks: Vec<PolymarketWsPriceLevel>,
}

impl PolymarketBookMessage {
    fn parse_levels(levels: &[PolymarketWsPriceLevel]) -> Vec<PriceLevel> {
        levels
            .iter()
            .filter_map(|pl| Some(PriceLevel::new(pl.price.value()?, pl.size.value()?)))
            .collect()
    }

    fn into_update(self) -> (TokenId, BookUpdate) {
        let update = BookUpdate::Snapshot {
            bids: Self::parse_levels(&self.bids),
            asks: Self::parse_levels(&self.asks),
        };
        (TokenId::from(self.asset_id), update)
    }
}

#[derive(Debug, Deserialize)]
pub struct PolymarketPriceChangeMessage {
    #[serde(default)]
    pub market: Option<String>,
    pub price_changes: Vec<PolymarketBestBidAsk>,
}

/// Best bid/ask summary, standalone or inside a `price_change`.
#[derive(Debug, Deserialize)]
pub struct PolymarketBestBidAsk {
    pub asset_id: String,
    #[serde(default)]
    pub best_bid: Option<WireDecimal>,
    #[serde(default)]
    pub best_ask: Option<WireDecimal>,
}

impl PolymarketBestBidAsk {
    fn into_update(self) -> Option<(TokenId, BookUpdate)> {
        let best_bid = self.best_bid.as_ref().and_then(WireDecimal::value);
        let best_ask = self.best_ask.as_ref().and_then(WireDecimal::value);
        if best_bid.is_none() && best_ask.is_none() {
            return None;
        }
        Some((
            TokenId::from(self.asset_id),
            BookUpdate::Summary { best_bid, best_ask },
        ))
    }
}

/// Price level as received from WebSocket.
#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketWsPriceLevel {
    pub price: WireDecimal,
    pub size: WireDecimal,
}

impl PolymarketWsEvent {
    fn push_updates(self, out: &mut Vec<(TokenId, BookUpdate)>) {
        match self {
            Self::Book(book) => out.push(book.into_update()),
            Self::PriceChange(change) => out.extend(
                change
                    .price_changes
                    .into_iter()
                    .filter_map(PolymarketBestBidAsk::into_update),
            ),
            Self::BestBidAsk(summary) => out.extend(summary.into_update()),
            Self::Unknown(_) => {}
        }
    }
}

impl PolymarketWsMessage {
    /// Flatten into book updates in frame order.
    #[must_use]
    pub fn into_updates(self) -> Vec<(TokenId, BookUpdate)> {
        let mut out = Vec::new();
        match self {
            Self::Batch(events) => {
                for event in events {
                    event.push_updates(&mut out);
                }
            }
            Self::Single(event) => event.push_updates(&mut out),
        }
        out
    }
}

/// Decode a text frame; malformed frames yield nothing.
#[must_use]
pub fn decode_frame(text: &str) -> Vec<(TokenId, BookUpdate)> {
    serde_json::from_str::<PolymarketWsMessage>(text)
        .map(PolymarketWsMessage::into_updates)
        .unwrap_or_default()
}
