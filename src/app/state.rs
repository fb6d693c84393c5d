//! Run-scoped mutable state owned by the dispatch loop.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::adapter::notifier::SummaryEvent;
use crate::domain::BasketKey;

/// Daily execution accounting and halt status.
///
/// Replaced wholesale when the local date changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeState {
    pub day: NaiveDate,
    pub executions_today: u32,
    pub notional_today: Decimal,
    pub consecutive_failures: u32,
    pub halted: bool,
    pub halt_reason: Option<String>,
    /// Account PnL at the first guard check of the day.
    pub start_pnl: Option<Decimal>,
    pub last_pnl: Option<Decimal>,
    pub open_orders: usize,
}

impl RuntimeState {
    /// Fresh state for `day`.
    #[must_use]
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day,
            executions_today: 0,
            notional_today: Decimal::ZERO,
            consecutive_failures: 0,
            halted: false,
            halt_reason: None,
            start_pnl: None,
            last_pnl: None,
            open_orders: 0,
        }
    }

    /// Stop execution until the next rollover.
    pub fn halt(&mut self, reason: impl Into<String>) {
        self.halted = true;
        self.halt_reason = Some(reason.into());
    }
}

/// Counters for the periodic summary.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub candidates_total: u64,
    pub candidates_window: u64,
    pub alerts: u64,
    pub filtered: u64,
    pub executions: u64,
    pub execution_failures: u64,
    pub best_window: Option<(BasketKey, Decimal)>,
    pub best_overall: Option<(BasketKey, Decimal)>,
}

fn keep_best(slot: &mut Option<(BasketKey, Decimal)>, key: &BasketKey, edge: Decimal) {
    if slot.as_ref().map_or(true, |(_, best)| edge > *best) {
        *slot = Some((key.clone(), edge));
    }
}

impl RunStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_candidate(&mut self, key: &BasketKey, edge: Decimal) {
        self.candidates_total += 1;
        self.candidates_window += 1;
        keep_best(&mut self.best_window, key, edge);
        keep_best(&mut self.best_overall, key, edge);
    }

    pub fn record_execution(&mut self, success: bool) {
        if success {
            self.executions += 1;
        } else {
            self.execution_failures += 1;
        }
    }

    /// Build the summary for the window just ended and start a new one.
    pub fn take_summary(&mut self, window_secs: u64) -> SummaryEvent {
        let event = SummaryEvent {
            window_secs,
            candidates_total: self.candidates_total,
            candidates_window: self.candidates_window,
            alerts: self.alerts,
            filtered: self.filtered,
            executions: self.executions,
            execution_failures: self.execution_failures,
            best_window: self.best_window.take().map(|(k, e)| (k.to_string(), e)),
            best_overall: self.best_overall.as_ref().map(|(k, e)| (k.to_string(), *e)),
        };
        self.candidates_window = 0;
        self.alerts = 0;
        self.filtered = 0;
        self.executions = 0;
        self.execution_failures = 0;
        event
    }
}
