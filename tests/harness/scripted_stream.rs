use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use basketwatch::domain::{BookUpdate, TokenId};
use basketwatch::error::Error;
use basketwatch::exchange::{MarketDataStream, MarketEvent};
use parking_lot::Mutex;

/// What the scripted stream saw, shared so it can be read after the stream
/// has been moved into a wrapper.
#[derive(Debug, Default)]
pub struct StreamLog {
    pub connect_calls: usize,
    pub subscriptions: Vec<Vec<TokenId>>,
}

/// Deterministic test double for market data streaming.
///
/// Yields its queued events in order, then `None` (or hangs forever when
/// `hang_when_empty` is set).
#[derive(Debug, Default)]
pub struct ScriptedMarketDataStream {
    connect_results: VecDeque<Result<(), Error>>,
    events: VecDeque<MarketEvent>,
    log: Arc<Mutex<StreamLog>>,
    hang_when_empty: bool,
}

impl ScriptedMarketDataStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream that never ends once its script is exhausted.
    pub fn hanging() -> Self {
        Self {
            hang_when_empty: true,
            ..Self::default()
        }
    }

    pub fn push_event(&mut self, event: MarketEvent) {
        self.events.push_back(event);
    }

    pub fn push_updates(&mut self, updates: Vec<(TokenId, BookUpdate)>) {
        self.push_event(MarketEvent::BookUpdates(updates));
    }

    pub fn push_disconnect(&mut self, reason: &str) {
        self.push_event(MarketEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Queue a successful connect ahead of any scripted failures.
    pub fn succeed_next_connect(&mut self) {
        self.connect_results.push_back(Ok(()));
    }

    pub fn fail_next_connect(&mut self, reason: &str) {
        self.connect_results
            .push_back(Err(Error::Connection(reason.to_string())));
    }

    pub fn log(&self) -> Arc<Mutex<StreamLog>> {
        self.log.clone()
    }
}

#[async_trait]
impl MarketDataStream for ScriptedMarketDataStream {
    async fn connect(&mut self) -> Result<(), Error> {
        self.log.lock().connect_calls += 1;
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    async fn subscribe(&mut self, token_ids: &[TokenId]) -> Result<(), Error> {
        self.log.lock().subscriptions.push(token_ids.to_vec());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        match self.events.pop_front() {
            Some(event) => Some(event),
            None if self.hang_when_empty => std::future::pending().await,
            None => None,
        }
    }

    fn exchange_name(&self) -> &'static str {
        "scripted"
    }
}
