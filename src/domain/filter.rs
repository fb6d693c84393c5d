//! Exec-edge noise filter.
//!
//! Raw edge assumes every leg fills at its quoted best ask. Many baskets
//! that look profitable on paper are not capturable once depth and
//! slippage are accounted for, typically because a thin synthetic top of
//! book is all that is known. This module estimates an execution-adjusted
//! edge and mutes baskets whose adjusted edge keeps coming out non-positive
//! even though their raw edge clears the alert threshold.
//!
//! # State machine (per basket)
//!
//! | Condition | Effect |
//! |---|---|
//! | `now < filtered_until` | filtered (`muted`), streak untouched |
//! | strategy not allow-listed | pass |
//! | raw edge below threshold, or adjusted edge > 0 | streak = 0, pass |
//! | otherwise | streak += 1; at `strike_limit` mute for `cooldown_secs`, streak = 0 |

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::basket::{BasketRuntime, Strategy};
use super::cache::BookCache;
use super::candidate::{Candidate, LegCost};
use super::id::BasketKey;
use super::money::bps_to_fraction;
use super::time::seconds;

/// Configuration for the exec-edge filter.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Strategies the filter applies to. Others are never filtered.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<Strategy>,

    /// Consecutive non-positive evaluations before a basket is muted.
    #[serde(default = "default_strike_limit")]
    pub strike_limit: u32,

    /// How long a mute lasts.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Slippage assumed on every leg when estimating execution cost.
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: Decimal,
}

const fn default_true() -> bool {
    true
}

fn default_strategies() -> Vec<Strategy> {
    vec![Strategy::BuyAllYes]
}

const fn default_strike_limit() -> u32 {
    3
}

const fn default_cooldown_secs() -> u64 {
    900
}

fn default_slippage_bps() -> Decimal {
    Decimal::from(25)
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            strategies: default_strategies(),
            strike_limit: default_strike_limit(),
            cooldown_secs: default_cooldown_secs(),
            slippage_bps: default_slippage_bps(),
        }
    }
}

/// Estimates edge after realistic execution cost.
pub trait ExecCostEstimator: Send + Sync {
    /// Adjusted edge, or `None` when the basket cannot be filled at all.
    fn exec_edge(
        &self,
        candidate: &Candidate,
        books: &BookCache,
        slippage_bps: Decimal,
    ) -> Option<Decimal>;
}

/// Walks ask depth for the full share count on every leg.
///
/// A synthetic side only knows its top level, so the whole size is assumed
/// to fill there; a real book without enough depth is unfillable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthWalkEstimator;

impl DepthWalkEstimator {
    fn leg_cost(books: &BookCache, candidate_leg: &LegCost) -> Option<Decimal> {
        let book = books.get(&candidate_leg.token_id)?;
        let shares = candidate_leg.shares;

        if book.asks_synthetic() {
            return Some(book.best_ask()?.price() * shares);
        }

        let mut remaining = shares;
        let mut cost = Decimal::ZERO;
        for level in book.asks() {
            if remaining <= Decimal::ZERO {
                break;
            }
            let take = remaining.min(level.size());
            cost += take * level.price();
            remaining -= take;
        }
        (remaining <= Decimal::ZERO).then_some(cost)
    }
}

impl ExecCostEstimator for DepthWalkEstimator {
    fn exec_edge(
        &self,
        candidate: &Candidate,
        books: &BookCache,
        slippage_bps: Decimal,
    ) -> Option<Decimal> {
        let slip = Decimal::ONE + bps_to_fraction(slippage_bps);
        let mut cost = Decimal::ZERO;
        for leg in candidate.legs() {
            cost += Self::leg_cost(books, leg)? * slip;
        }
        Some(candidate.payout() - cost - candidate.fixed_cost())
    }
}

/// Why a candidate was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    /// The basket is inside a mute window.
    Muted,
    /// This evaluation hit the strike limit and started a mute window.
    StrikeLimit,
}

impl FilterReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Muted => "muted",
            Self::StrikeLimit => "exec_edge_strikes",
        }
    }
}

/// Outcome of running the filter for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDecision {
    pub filtered: bool,
    pub reason: Option<FilterReason>,
    pub exec_edge: Option<Decimal>,
    /// Streak after this evaluation.
    pub streak: u32,
}

/// Per-basket exec-edge state machine.
#[derive(Debug, Clone)]
pub struct ExecEdgeFilter {
    config: FilterConfig,
}

impl ExecEdgeFilter {
    #[must_use]
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &FilterConfig {
        &self.config
    }

    fn applies_to(&self, strategy: Strategy) -> bool {
        self.config.enabled && self.config.strategies.contains(&strategy)
    }

    /// Advance the basket's filter state for one evaluation.
    ///
    /// `raw_clears` says whether the raw edge met the alert threshold.
    /// A missing `exec_edge` counts as non-positive.
    pub fn apply(
        &self,
        key: &BasketKey,
        runtime: &mut BasketRuntime,
        strategy: Strategy,
        exec_edge: Option<Decimal>,
        raw_clears: bool,
        now: DateTime<Utc>,
    ) -> FilterDecision {
        let decision = |filtered, reason, streak| FilterDecision {
            filtered,
            reason,
            exec_edge,
            streak,
        };

        if runtime.is_muted(now) {
            return decision(true, Some(FilterReason::Muted), runtime.neg_exec_streak);
        }
        if !self.applies_to(strategy) {
            return decision(false, None, runtime.neg_exec_streak);
        }

        let capturable = exec_edge.is_some_and(|e| e > Decimal::ZERO);
        if !raw_clears || capturable {
            runtime.neg_exec_streak = 0;
            return decision(false, None, 0);
        }

        runtime.neg_exec_streak += 1;
        if runtime.neg_exec_streak < self.config.strike_limit {
            return decision(false, None, runtime.neg_exec_streak);
        }

        let until = now + seconds(self.config.cooldown_secs);
        info!(
            basket = %key,
            strikes = runtime.neg_exec_streak,
            until = %until,
            "Muting basket: exec-adjusted edge persistently non-positive"
        );
        runtime.neg_exec_streak = 0;
        runtime.filtered_until = Some(until);
        decision(true, Some(FilterReason::StrikeLimit), 0)
    }
}
