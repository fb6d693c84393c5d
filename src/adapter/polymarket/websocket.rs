//! Polymarket market-channel data stream.
//!
//! # Connection Lifecycle
//!
//! 1. **Connection**: `connect()` opens the socket (TLS for `wss://`)
//! 2. **Subscription**: `subscribe()` sends the asset list
//! 3. **Events**: `next_event()` decodes frames into book updates
//!
//! The venue drops idle clients, so a `PING` text frame is sent on a fixed
//! interval while waiting for data. Protocol-level pings are answered with
//! pongs. Reconnection is left to
//! [`ReconnectingDataStream`](crate::exchange::ReconnectingDataStream).

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace};

use super::message::{decode_frame, PolymarketSubscribeMessage};
use crate::domain::TokenId;
use crate::error::{Error, Result};
use crate::exchange::{MarketDataStream, MarketEvent};

/// Application-level keepalive period.
pub const PING_INTERVAL: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Polymarket market data stream implementing the `MarketDataStream` trait.
pub struct PolymarketDataStream {
    url: String,
    ws: Option<WsStream>,
    ping: Interval,
}

impl PolymarketDataStream {
    /// Create a new data stream for the given WebSocket URL.
    #[must_use]
    pub fn new(url: String) -> Self {
        Self {
            url,
            ws: None,
            ping: Self::ping_interval(),
        }
    }

    fn ping_interval() -> Interval {
        let mut ping = interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ping
    }
}

#[async_trait]
impl MarketDataStream for PolymarketDataStream {
    async fn connect(&mut self) -> Result<()> {
        info!(url = %self.url, "Connecting to WebSocket");
        let (ws_stream, response) = connect_async(&self.url).await?;
        info!(status = %response.status(), "WebSocket connected");
        self.ws = Some(ws_stream);
        self.ping = Self::ping_interval();
        Ok(())
    }

    async fn subscribe(&mut self, token_ids: &[TokenId]) -> Result<()> {
        let ws = self
            .ws
            .as_mut()
            .ok_or_else(|| Error::Connection("Not connected".into()))?;

        let asset_ids: Vec<String> = token_ids.iter().map(|t| t.as_str().to_string()).collect();
        let total = asset_ids.len();
        let json = serde_json::to_string(&PolymarketSubscribeMessage::new(asset_ids))?;

        info!(assets = total, "Subscribing to assets");
        ws.send(Message::Text(json)).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        let ws = self.ws.as_mut()?;

        loop {
            tokio::select! {
                frame = ws.next() => match frame? {
                    Ok(Message::Text(text)) => {
                        let updates = decode_frame(&text);
                        if updates.is_empty() {
                            trace!(bytes = text.len(), "Ignoring frame without book data");
                            continue;
                        }
                        return Some(MarketEvent::BookUpdates(updates));
                    }
                    Ok(Message::Ping(data)) => {
                        trace!("Received WebSocket ping");
                        if ws.send(Message::Pong(data)).await.is_err() {
                            return Some(MarketEvent::Disconnected {
                                reason: "Failed to send pong".into(),
                            });
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        info!(frame = ?frame, "WebSocket closed by server");
                        return Some(MarketEvent::Disconnected {
                            reason: frame.map(|f| f.reason.to_string()).unwrap_or_default(),
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "WebSocket error");
                        return Some(MarketEvent::Disconnected {
                            reason: e.to_string(),
                        });
                    }
                },
                _ = self.ping.tick() => {
                    debug!("Sending keepalive PING");
                    if let Err(e) = ws.send(Message::Text("PING".into())).await {
                        return Some(MarketEvent::Disconnected {
                            reason: format!("keepalive failed: {e}"),
                        });
                    }
                }
            }
        }
    }

    fn exchange_name(&self) -> &'static str {
        "Polymarket"
    }
}
