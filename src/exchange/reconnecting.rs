//! Reconnecting wrapper for MarketDataStream.
//!
//! Provides automatic reconnection with exponential backoff, jitter and a
//! circuit breaker for any MarketDataStream implementation. The token set
//! passed to `subscribe` is replayed after every reconnect.
//!
//! `next_event` is cancel-safe: the time of the next attempt is fixed once
//! per failure and kept on the wrapper, so a caller that drops the future
//! mid-wait (a receive timeout, a `select!` branch) resumes the same wait
//! on its next call instead of starting a longer one.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use super::traits::{MarketDataStream, MarketEvent};
use crate::domain::TokenId;
use crate::error::Error;

/// Reconnection configuration for the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectionConfig {
    /// Initial delay before first reconnection attempt (milliseconds).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier applied to delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Maximum consecutive failures before circuit breaker trips.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// Cooldown period after circuit breaker trips (milliseconds).
    #[serde(default = "default_circuit_breaker_cooldown_ms")]
    pub circuit_breaker_cooldown_ms: u64,
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_consecutive_failures() -> u32 {
    10
}

fn default_circuit_breaker_cooldown_ms() -> u64 {
    300_000
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_consecutive_failures: default_max_consecutive_failures(),
            circuit_breaker_cooldown_ms: default_circuit_breaker_cooldown_ms(),
        }
    }
}

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    /// Normal operation, connections allowed.
    Closed,
    /// Too many failures, blocking connections temporarily.
    Open { until: Instant },
}

/// Wrapper that adds reconnection logic to any MarketDataStream.
pub struct ReconnectingDataStream<S: MarketDataStream> {
    inner: S,
    config: ReconnectionConfig,
    /// Token IDs to resubscribe after reconnection.
    subscribed_tokens: Vec<TokenId>,
    consecutive_failures: u32,
    current_delay_ms: u64,
    circuit_state: CircuitState,
    /// When the pending reconnect attempt may run; `None` until scheduled.
    next_attempt_at: Option<Instant>,
    connected: bool,
    reconnects: u64,
}

impl<S: MarketDataStream> ReconnectingDataStream<S> {
    /// Create a new reconnecting wrapper.
    pub fn new(inner: S, config: ReconnectionConfig) -> Self {
        let initial_delay = config.initial_delay_ms;
        Self {
            inner,
            config,
            subscribed_tokens: Vec::new(),
            consecutive_failures: 0,
            current_delay_ms: initial_delay,
            circuit_state: CircuitState::Closed,
            next_attempt_at: None,
            connected: false,
            reconnects: 0,
        }
    }

    /// Successful reconnects so far.
    #[must_use]
    pub const fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Access the wrapped stream.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    fn reset_backoff(&mut self) {
        self.consecutive_failures = 0;
        self.current_delay_ms = self.config.initial_delay_ms;
        self.circuit_state = CircuitState::Closed;
    }

    /// Current backoff delay; advances the delay for the next attempt.
    fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_millis(self.current_delay_ms);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let next_delay = (self.current_delay_ms as f64 * self.config.backoff_multiplier) as u64;
        self.current_delay_ms = next_delay.min(self.config.max_delay_ms);

        delay
    }

    /// Add up to 25% random jitter so many clients do not reconnect in step.
    fn with_jitter(delay: Duration) -> Duration {
        let spread = delay.as_millis() / 4;
        if spread == 0 {
            return delay;
        }
        #[allow(clippy::cast_possible_truncation)]
        let extra = rand::thread_rng().gen_range(0..spread as u64);
        delay + Duration::from_millis(extra)
    }

    fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.connected = false;

        if self.consecutive_failures >= self.config.max_consecutive_failures {
            let cooldown = Duration::from_millis(self.config.circuit_breaker_cooldown_ms);
            let until = Instant::now() + cooldown;
            self.circuit_state = CircuitState::Open { until };
            error!(
                failures = self.consecutive_failures,
                cooldown_secs = cooldown.as_secs(),
                "Circuit breaker tripped, pausing reconnection attempts"
            );
        }
    }

    /// Fix the time of the next attempt, consuming one backoff step.
    fn schedule_attempt(&mut self) -> Instant {
        let now = Instant::now();
        let mut start = now;
        if let CircuitState::Open { until } = self.circuit_state {
            warn!(
                remaining_secs = until.saturating_duration_since(now).as_secs(),
                "Circuit breaker open, waiting for cooldown"
            );
            self.reset_backoff();
            start = until.max(now);
        }

        let delay = Self::with_jitter(self.next_delay());
        info!(
            delay = ?delay,
            attempt = self.consecutive_failures + 1,
            "Reconnecting after delay"
        );
        start + delay
    }

    async fn reconnect(&mut self) -> Result<(), Error> {
        let at = match self.next_attempt_at {
            Some(at) => at,
            None => {
                let at = self.schedule_attempt();
                self.next_attempt_at = Some(at);
                at
            }
        };
        sleep_until(at).await;

        let result = match self.inner.connect().await {
            Ok(()) if self.subscribed_tokens.is_empty() => Ok(()),
            Ok(()) => {
                debug!(tokens = self.subscribed_tokens.len(), "Resubscribing to tokens");
                self.inner.subscribe(&self.subscribed_tokens).await
            }
            Err(e) => Err(e),
        };
        self.next_attempt_at = None;

        match result {
            Ok(()) => {
                info!(exchange = self.inner.exchange_name(), "Reconnected successfully");
                self.connected = true;
                self.reconnects += 1;
                self.reset_backoff();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Reconnection failed");
                self.record_failure();
                Err(e)
            }
        }
    }
}

#[async_trait]
impl<S: MarketDataStream + Send> MarketDataStream for ReconnectingDataStream<S> {
    async fn connect(&mut self) -> Result<(), Error> {
        let result = self.inner.connect().await;
        if result.is_ok() {
            self.connected = true;
            self.next_attempt_at = None;
            self.reset_backoff();
        }
        result
    }

    async fn subscribe(&mut self, token_ids: &[TokenId]) -> Result<(), Error> {
        self.subscribed_tokens = token_ids.to_vec();
        self.inner.subscribe(token_ids).await
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        loop {
            if !self.connected {
                if let Err(e) = self.reconnect().await {
                    warn!(error = %e, "Reconnection attempt failed, will retry");
                    continue;
                }
                return Some(MarketEvent::Connected);
            }

            match self.inner.next_event().await {
                Some(MarketEvent::Disconnected { reason }) => {
                    warn!(reason = %reason, "Connection lost, will reconnect");
                    self.record_failure();
                }
                Some(event) => return Some(event),
                None => {
                    warn!("Data stream ended unexpectedly, will reconnect");
                    self.record_failure();
                }
            }
        }
    }

    fn exchange_name(&self) -> &'static str {
        self.inner.exchange_name()
    }
}
