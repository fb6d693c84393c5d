//! Execution gate.
//!
//! Decides whether a candidate may be executed, re-checks the live book
//! right before submitting, retries submission with backoff, and books the
//! result against the daily counters.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::{info, warn};

use crate::app::state::RuntimeState;
use crate::domain::{bps_to_fraction, seconds, BasketRuntime, BookCache, Candidate, Price};
use crate::error::{ExecutionError, GateError};
use crate::exchange::{BasketExecutor, BasketFill, LegOrder};

/// Hard caps on execution.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionLimits {
    /// Refuse fractional share counts per leg.
    #[serde(default = "default_true")]
    pub require_whole_shares: bool,
    /// 0 = unlimited.
    #[serde(default)]
    pub max_legs_per_basket: usize,
    #[serde(default = "default_max_exec_per_day")]
    pub max_exec_per_day: u32,
    #[serde(default = "default_max_notional_per_day")]
    pub max_notional_per_day: Decimal,
    /// 0 = unlimited.
    #[serde(default)]
    pub max_open_orders: usize,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

const fn default_true() -> bool {
    true
}

const fn default_max_exec_per_day() -> u32 {
    5
}

fn default_max_notional_per_day() -> Decimal {
    dec!(100)
}

const fn default_max_consecutive_failures() -> u32 {
    3
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            require_whole_shares: true,
            max_legs_per_basket: 0,
            max_exec_per_day: default_max_exec_per_day(),
            max_notional_per_day: default_max_notional_per_day(),
            max_open_orders: 0,
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

/// Result of the pure authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Rejected(GateError),
}

impl GateDecision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Check the daily counters and halt flag. Mutates nothing.
#[must_use]
pub fn can_execute(
    state: &RuntimeState,
    candidate: &Candidate,
    limits: &ExecutionLimits,
) -> GateDecision {
    let reject = GateDecision::Rejected;
    let legs = candidate.legs().len();

    if state.halted {
        return reject(GateError::Halted {
            reason: state.halt_reason.clone().unwrap_or_else(|| "halted".into()),
        });
    }
    let shares = candidate.shares_per_leg();
    if limits.require_whole_shares && shares.fract() != Decimal::ZERO {
        return reject(GateError::FractionalShares { shares });
    }
    if limits.max_legs_per_basket > 0 && legs > limits.max_legs_per_basket {
        return reject(GateError::TooManyLegs {
            legs,
            limit: limits.max_legs_per_basket,
        });
    }
    if state.executions_today + 1 > limits.max_exec_per_day {
        return reject(GateError::DailyExecutionCap {
            limit: limits.max_exec_per_day,
        });
    }
    if state.notional_today + candidate.cost() > limits.max_notional_per_day {
        return reject(GateError::DailyNotionalCap {
            current: state.notional_today,
            additional: candidate.cost(),
            limit: limits.max_notional_per_day,
        });
    }
    if limits.max_open_orders > 0 && state.open_orders + legs > limits.max_open_orders {
        return reject(GateError::OpenOrderCap {
            current: state.open_orders,
            additional: legs,
            limit: limits.max_open_orders,
        });
    }
    if state.consecutive_failures >= limits.max_consecutive_failures {
        return reject(GateError::ConsecutiveFailures {
            count: state.consecutive_failures,
            limit: limits.max_consecutive_failures,
        });
    }
    GateDecision::Allowed
}

/// Bounded retry with exponential backoff and full jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RetryPolicy {
    /// Backoff cap before jitter: `min(max, base * 2^(attempt-1))`.
    #[must_use]
    pub fn capped_delay_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1);
        let multiplier = if exponent >= 32 { u64::MAX } else { 1u64 << exponent };
        self.base_delay_ms
            .saturating_mul(multiplier)
            .min(self.max_delay_ms)
    }

    /// Delay after the given failed attempt, jittered into `[0, cap)`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let capped = self.capped_delay_ms(attempt);
        if capped == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..capped))
    }
}

/// What happened to one candidate at the gate.
#[derive(Debug, Clone)]
pub enum GateOutcome {
    /// Declined before anything was submitted.
    Rejected(GateError),
    Executed { fill: BasketFill, attempts: u32 },
    /// Every attempt failed.
    Failed { error: ExecutionError, attempts: u32 },
}

impl GateOutcome {
    /// Whether orders were sent (state changed and must be persisted).
    #[must_use]
    pub const fn attempted(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }
}

/// Authorizes and submits basket executions.
pub struct ExecutionGate {
    executor: Arc<dyn BasketExecutor>,
    limits: ExecutionLimits,
    retry: RetryPolicy,
    cooldown: chrono::Duration,
    max_slippage_bps: Decimal,
}

impl ExecutionGate {
    #[must_use]
    pub fn new(
        executor: Arc<dyn BasketExecutor>,
        limits: ExecutionLimits,
        retry: RetryPolicy,
        cooldown_secs: u64,
        max_slippage_bps: Decimal,
    ) -> Self {
        Self {
            executor,
            limits,
            retry,
            cooldown: seconds(cooldown_secs),
            max_slippage_bps,
        }
    }

    #[must_use]
    pub const fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    fn check_cooldown(&self, runtime: &BasketRuntime, now: DateTime<Utc>) -> Result<(), GateError> {
        if let Some(last) = runtime.last_exec_ts {
            let elapsed = now - last;
            if elapsed < self.cooldown {
                return Err(GateError::Cooldown {
                    remaining_secs: (self.cooldown - elapsed).num_seconds(),
                });
            }
        }
        Ok(())
    }

    /// Every leg must still be buyable near the evaluated price.
    fn precheck(&self, candidate: &Candidate, books: &BookCache) -> Result<(), GateError> {
        let slip = Decimal::ONE + bps_to_fraction(self.max_slippage_bps);
        for leg in candidate.legs() {
            let fail = |reason: String| GateError::PrecheckFailed {
                token_id: leg.token_id.to_string(),
                reason,
            };
            let book = books
                .get(&leg.token_id)
                .ok_or_else(|| fail("no book".into()))?;
            let best = book.best_ask().ok_or_else(|| fail("no ask".into()))?;

            let max_price = leg.ask * slip;
            if best.price() > max_price {
                return Err(fail(format!("ask {} above limit {}", best.price(), max_price)));
            }
            if !book.asks_synthetic() {
                let depth: Decimal = book
                    .asks()
                    .iter()
                    .take_while(|level| level.price() <= max_price)
                    .map(|level| level.size())
                    .sum();
                if depth < leg.shares {
                    return Err(fail(format!("depth {depth} below {} shares", leg.shares)));
                }
            }
        }
        Ok(())
    }

    fn orders(candidate: &Candidate, tick_size: Price) -> Vec<LegOrder> {
        candidate
            .legs()
            .iter()
            .map(|leg| LegOrder {
                token_id: leg.token_id.clone(),
                price: leg.ask,
                size: leg.shares,
                tick_size,
            })
            .collect()
    }

    /// Run a candidate through the gate and, if allowed, submit it.
    ///
    /// Counters in `state` and `runtime` change only when orders were sent.
    pub async fn execute(
        &self,
        state: &mut RuntimeState,
        runtime: &mut BasketRuntime,
        candidate: &Candidate,
        tick_size: Price,
        books: &BookCache,
        now: DateTime<Utc>,
    ) -> GateOutcome {
        let key = candidate.basket_key();

        let checks = match can_execute(state, candidate, &self.limits) {
            GateDecision::Allowed => self
                .check_cooldown(runtime, now)
                .and_then(|()| self.precheck(candidate, books)),
            GateDecision::Rejected(reason) => Err(reason),
        };
        if let Err(reason) = checks {
            info!(basket = %key, reason = %reason, "Execution skipped");
            return GateOutcome::Rejected(reason);
        }

        let orders = Self::orders(candidate, tick_size);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.executor.submit(&orders).await {
                Ok(fill) => {
                    state.executions_today += 1;
                    state.notional_today += candidate.cost();
                    state.consecutive_failures = 0;
                    state.open_orders += fill.resting_legs(&orders);
                    runtime.last_exec_ts = Some(now);
                    info!(
                        basket = %key,
                        exchange = self.executor.exchange_name(),
                        attempts = attempt,
                        cost = %candidate.cost(),
                        edge = %candidate.edge(),
                        orders = %fill.order_ids(),
                        "Basket executed"
                    );
                    return GateOutcome::Executed {
                        fill,
                        attempts: attempt,
                    };
                }
                Err(error) if attempt >= max_attempts => {
                    state.consecutive_failures += 1;
                    warn!(
                        basket = %key,
                        attempts = attempt,
                        consecutive_failures = state.consecutive_failures,
                        error = %error,
                        "Execution failed, retries exhausted"
                    );
                    return GateOutcome::Failed {
                        error,
                        attempts: attempt,
                    };
                }
                Err(error) => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        basket = %key,
                        attempt = attempt,
                        delay = ?delay,
                        error = %error,
                        "Submission failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::basket::tests::leg;
    use crate::domain::{
        evaluate, BasketKey, BookUpdate, EventBasket, MarketMeta, PriceLevel, Side, Strategy,
        TokenId,
    };
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn books(asks: &[(&str, Decimal)]) -> BookCache {
        let mut books = BookCache::new();
        for (token, ask) in asks {
            books.update(
                TokenId::from(*token),
                BookUpdate::Summary {
                    best_bid: None,
                    best_ask: Some(*ask),
                },
                Utc::now(),
            );
        }
        books
    }

    fn candidate_with(shares: Decimal, legs: &[&str], books: &BookCache) -> Candidate {
        let basket = EventBasket::try_new(
            BasketKey::from("k"),
            "t",
            Strategy::BuyAllYes,
            legs.iter().map(|t| leg(t, Side::Yes)).collect(),
            MarketMeta::default(),
        )
        .unwrap();
        evaluate(&basket, books, shares, dec!(0), dec!(0)).unwrap()
    }

    fn candidate() -> (Candidate, BookCache) {
        let books = books(&[("a", dec!(0.40)), ("b", dec!(0.50))]);
        (candidate_with(dec!(10), &["a", "b"], &books), books)
    }

    #[test]
    fn allows_within_limits() {
        let (candidate, _) = candidate();
        let state = RuntimeState::new(day());
        assert!(can_execute(&state, &candidate, &ExecutionLimits::default()).is_allowed());
    }

    #[test]
    fn rejects_in_priority_order() {
        let (candidate, _) = candidate();
        let limits = ExecutionLimits {
            max_exec_per_day: 1,
            ..Default::default()
        };
        let mut state = RuntimeState::new(day());
        state.executions_today = 1;
        state.consecutive_failures = 10;

        // Daily cap is checked before consecutive failures.
        assert_eq!(
            can_execute(&state, &candidate, &limits),
            GateDecision::Rejected(GateError::DailyExecutionCap { limit: 1 })
        );

        state.halt("loss");
        assert_eq!(
            can_execute(&state, &candidate, &limits),
            GateDecision::Rejected(GateError::Halted {
                reason: "loss".into()
            })
        );
    }

    #[test]
    fn rejects_fractional_shares() {
        let books = books(&[("a", dec!(0.40)), ("b", dec!(0.50))]);
        let candidate = candidate_with(dec!(2.5), &["a", "b"], &books);
        let state = RuntimeState::new(day());
        assert!(matches!(
            can_execute(&state, &candidate, &ExecutionLimits::default()),
            GateDecision::Rejected(GateError::FractionalShares { .. })
        ));

        let lenient = ExecutionLimits {
            require_whole_shares: false,
            ..Default::default()
        };
        assert!(can_execute(&state, &candidate, &lenient).is_allowed());
    }

    #[test]
    fn rejects_notional_leg_and_open_order_caps() {
        let (candidate, _) = candidate();
        let mut state = RuntimeState::new(day());
        state.notional_today = dec!(95);
        assert_eq!(
            can_execute(&state, &candidate, &ExecutionLimits::default()),
            GateDecision::Rejected(GateError::DailyNotionalCap {
                current: dec!(95),
                additional: dec!(9.00),
                limit: dec!(100),
            })
        );

        let state = RuntimeState::new(day());
        let legs = ExecutionLimits {
            max_legs_per_basket: 1,
            ..Default::default()
        };
        assert!(matches!(
            can_execute(&state, &candidate, &legs),
            GateDecision::Rejected(GateError::TooManyLegs { legs: 2, limit: 1 })
        ));

        let mut state = RuntimeState::new(day());
        state.open_orders = 3;
        let open = ExecutionLimits {
            max_open_orders: 4,
            ..Default::default()
        };
        assert!(matches!(
            can_execute(&state, &candidate, &open),
            GateDecision::Rejected(GateError::OpenOrderCap { .. })
        ));
    }

    #[test]
    fn rejects_after_consecutive_failures() {
        let (candidate, _) = candidate();
        let mut state = RuntimeState::new(day());
        state.consecutive_failures = 3;
        assert_eq!(
            can_execute(&state, &candidate, &ExecutionLimits::default()),
            GateDecision::Rejected(GateError::ConsecutiveFailures { count: 3, limit: 3 })
        );
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 350,
        };
        assert_eq!(policy.capped_delay_ms(1), 100);
        assert_eq!(policy.capped_delay_ms(2), 200);
        assert_eq!(policy.capped_delay_ms(3), 350);
        assert_eq!(policy.capped_delay_ms(40), 350);
        for attempt in 1..6 {
            assert!(policy.backoff(attempt) < Duration::from_millis(350));
        }
    }

    fn gate(executor: Arc<dyn BasketExecutor>) -> ExecutionGate {
        ExecutionGate::new(
            executor,
            ExecutionLimits::default(),
            RetryPolicy {
                max_attempts: 2,
                base_delay_ms: 0,
                max_delay_ms: 0,
            },
            600,
            dec!(100),
        )
    }

    #[tokio::test]
    async fn successful_execution_updates_counters() {
        let executor = Arc::new(crate::adapter::paper::PaperExecutor::new());
        let gate = gate(executor.clone());
        let (candidate, books) = candidate();
        let mut state = RuntimeState::new(day());
        let mut runtime = BasketRuntime::default();
        let now = Utc::now();

        let outcome = gate
            .execute(&mut state, &mut runtime, &candidate, dec!(0.01), &books, now)
            .await;

        assert!(outcome.is_success());
        assert_eq!(state.executions_today, 1);
        assert_eq!(state.notional_today, dec!(9.00));
        assert_eq!(state.open_orders, 0);
        assert_eq!(runtime.last_exec_ts, Some(now));
        assert_eq!(executor.submissions().len(), 1);

        // Same basket again inside the cooldown.
        let again = gate
            .execute(&mut state, &mut runtime, &candidate, dec!(0.01), &books, now)
            .await;
        assert!(matches!(again, GateOutcome::Rejected(GateError::Cooldown { .. })));
        assert!(!again.attempted());
        assert_eq!(state.executions_today, 1);
    }

    #[tokio::test]
    async fn filled_baskets_do_not_consume_open_order_cap() {
        let executor = Arc::new(crate::adapter::paper::PaperExecutor::new());
        let gate = ExecutionGate::new(
            executor.clone(),
            ExecutionLimits {
                max_open_orders: 3,
                ..Default::default()
            },
            RetryPolicy::default(),
            600,
            dec!(100),
        );
        let (candidate, books) = candidate();
        let mut state = RuntimeState::new(day());
        let mut runtime = BasketRuntime::default();
        let now = Utc::now();

        for hour in 0..3 {
            let at = now + chrono::Duration::hours(hour);
            let outcome = gate
                .execute(&mut state, &mut runtime, &candidate, dec!(0.01), &books, at)
                .await;
            assert!(outcome.is_success(), "execution {hour}: {outcome:?}");
        }

        assert_eq!(executor.submissions().len(), 3);
        assert_eq!(state.open_orders, 0);
    }

    #[tokio::test]
    async fn precheck_blocks_when_ask_moved() {
        let executor = Arc::new(crate::adapter::paper::PaperExecutor::new());
        let gate = gate(executor.clone());
        let (candidate, mut books) = candidate();
        books.update(
            TokenId::from("a"),
            BookUpdate::Summary {
                best_bid: None,
                best_ask: Some(dec!(0.45)),
            },
            Utc::now(),
        );
        let mut state = RuntimeState::new(day());
        let mut runtime = BasketRuntime::default();

        let outcome = gate
            .execute(&mut state, &mut runtime, &candidate, dec!(0.01), &books, Utc::now())
            .await;

        assert!(matches!(outcome, GateOutcome::Rejected(GateError::PrecheckFailed { .. })));
        assert!(executor.submissions().is_empty());
        assert_eq!(state, RuntimeState::new(day()));
    }

    #[tokio::test]
    async fn precheck_requires_depth_on_real_books() {
        let executor = Arc::new(crate::adapter::paper::PaperExecutor::new());
        let gate = gate(executor.clone());
        let mut books = BookCache::new();
        for token in ["a", "b"] {
            books.update(
                TokenId::from(token),
                BookUpdate::Snapshot {
                    bids: vec![],
                    asks: vec![
                        PriceLevel::new(dec!(0.40), dec!(4)),
                        PriceLevel::new(dec!(0.90), dec!(100)),
                    ],
                },
                Utc::now(),
            );
        }
        let candidate = candidate_with(dec!(10), &["a", "b"], &books);
        let mut state = RuntimeState::new(day());
        let mut runtime = BasketRuntime::default();

        let outcome = gate
            .execute(&mut state, &mut runtime, &candidate, dec!(0.01), &books, Utc::now())
            .await;

        match outcome {
            GateOutcome::Rejected(GateError::PrecheckFailed { reason, .. }) => {
                assert!(reason.starts_with("depth 4"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
