//! Event dispatch: turns book updates into evaluations, alerts and executions.
//!
//! The engine owns every mutable value of a run (book cache, basket arena,
//! daily state, counters) and is driven from a single task, so nothing in
//! here locks.

use std::collections::BTreeSet;

use chrono::{DateTime, Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use crate::adapter::metrics::MetricsSink;
use crate::adapter::notifier::{AlertEvent, Event, ExecutionEvent, NotifierRegistry};
use crate::app::config::Config;
use crate::app::gate::{ExecutionGate, GateOutcome};
use crate::app::guard::{DailyLossGuard, GuardVerdict};
use crate::app::state::{RunStats, RuntimeState};
use crate::app::store::{PersistedState, StateStore};
use crate::domain::{
    evaluate, millis, seconds, signature, BasketKey, BookCache, BookUpdate, DepthWalkEstimator,
    ExecCostEstimator, ExecEdgeFilter, TokenId, Universe,
};

/// Evaluation knobs, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub shares_per_leg: Decimal,
    pub fee_rate: Decimal,
    pub fixed_cost: Decimal,
    pub min_edge: Decimal,
    pub min_eval_interval: chrono::Duration,
    pub alert_cooldown: chrono::Duration,
    pub notify_min_interval: chrono::Duration,
    pub record_all: bool,
    pub execution_enabled: bool,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        let eval = &config.evaluation;
        Self {
            shares_per_leg: eval.shares_per_leg,
            fee_rate: eval.fee_rate,
            fixed_cost: eval.fixed_cost,
            min_edge: eval.min_edge,
            min_eval_interval: millis(eval.min_eval_interval_ms),
            alert_cooldown: seconds(eval.alert_cooldown_secs),
            notify_min_interval: seconds(config.notify.observe_notify_min_interval_secs),
            record_all: config.metrics.record_all,
            execution_enabled: config.execution.enabled,
        }
    }
}

/// Local calendar date of an instant; the daily counters follow it.
#[must_use]
pub fn local_day(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

/// Single-owner evaluation engine.
pub struct Engine {
    settings: EngineSettings,
    universe: Universe,
    books: BookCache,
    filter: ExecEdgeFilter,
    estimator: Box<dyn ExecCostEstimator>,
    state: RuntimeState,
    stats: RunStats,
    notifier: NotifierRegistry,
    metrics: Option<MetricsSink>,
    gate: Option<ExecutionGate>,
    store: Option<StateStore>,
}

impl Engine {
    #[must_use]
    pub fn new(
        settings: EngineSettings,
        universe: Universe,
        filter: ExecEdgeFilter,
        notifier: NotifierRegistry,
        today: NaiveDate,
    ) -> Self {
        Self {
            settings,
            universe,
            books: BookCache::new(),
            filter,
            estimator: Box::new(DepthWalkEstimator),
            state: RuntimeState::new(today),
            stats: RunStats::new(),
            notifier,
            metrics: None,
            gate: None,
            store: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, sink: MetricsSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    #[must_use]
    pub fn with_gate(mut self, gate: ExecutionGate) -> Self {
        self.gate = Some(gate);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: StateStore) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_estimator(mut self, estimator: Box<dyn ExecCostEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Restore a previous run's state.
    ///
    /// Daily counters carry over only when they belong to the current day;
    /// basket bookkeeping always does. Baskets no longer in the universe are
    /// dropped.
    pub fn restore(&mut self, persisted: PersistedState) {
        if persisted.runtime.day == self.state.day {
            self.state = persisted.runtime;
        } else {
            info!(stored = %persisted.runtime.day, today = %self.state.day, "Stored daily state is stale");
        }
        let mut restored = 0usize;
        for (key, runtime) in persisted.baskets {
            if let Some(basket) = self.universe.get_mut(&key) {
                basket.runtime = runtime;
                restored += 1;
            }
        }
        info!(
            baskets = restored,
            executions_today = self.state.executions_today,
            halted = self.state.halted,
            "State restored"
        );
    }

    #[must_use]
    pub const fn state(&self) -> &RuntimeState {
        &self.state
    }

    #[must_use]
    pub const fn stats(&self) -> &RunStats {
        &self.stats
    }

    #[must_use]
    pub const fn universe(&self) -> &Universe {
        &self.universe
    }

    #[must_use]
    pub const fn books(&self) -> &BookCache {
        &self.books
    }

    /// Every contract the feed must be subscribed to.
    #[must_use]
    pub fn token_ids(&self) -> Vec<TokenId> {
        self.universe.token_ids()
    }

    /// Feed updates into the cache and return the baskets they impact.
    pub fn apply_updates(
        &mut self,
        updates: Vec<(TokenId, BookUpdate)>,
        now: DateTime<Utc>,
    ) -> BTreeSet<BasketKey> {
        let touched = self.books.apply(updates, now);
        self.universe.impacted(&touched)
    }

    /// Start a fresh daily state if the local date moved on.
    pub fn roll_day(&mut self, today: NaiveDate) -> bool {
        if today == self.state.day {
            return false;
        }
        info!(from = %self.state.day, to = %today, "Day rollover, daily counters reset");
        self.state = RuntimeState::new(today);
        self.persist();
        true
    }

    /// Write state to the store, if one is configured. Failures are logged.
    pub fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let persisted = PersistedState {
            runtime: self.state.clone(),
            baskets: self
                .universe
                .iter()
                .map(|b| (b.key().clone(), b.runtime.clone()))
                .collect(),
        };
        if let Err(e) = store.save(&persisted) {
            error!(error = %e, path = %store.path().display(), "Failed to persist state");
        }
    }

    /// Evaluate every impacted basket once.
    ///
    /// Returns the updated global alert gate.
    pub async fn on_impacted_baskets(
        &mut self,
        keys: &BTreeSet<BasketKey>,
        mut next_notify_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        self.roll_day(local_day(now));

        for key in keys {
            let (notify_at, attempted) = self.evaluate_basket(key, next_notify_at, now).await;
            next_notify_at = notify_at;
            if attempted {
                self.persist();
            }
        }

        if self.settings.execution_enabled {
            self.persist();
        }
        next_notify_at
    }

    async fn evaluate_basket(
        &mut self,
        key: &BasketKey,
        mut next_notify_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> (DateTime<Utc>, bool) {
        let settings = &self.settings;
        let Some(basket) = self.universe.get_mut(key) else {
            return (next_notify_at, false);
        };

        if let Some(last) = basket.runtime.last_eval_ts {
            if now - last < settings.min_eval_interval {
                return (next_notify_at, false);
            }
        }
        basket.runtime.last_eval_ts = Some(now);

        let Some(candidate) = evaluate(
            basket,
            &self.books,
            settings.shares_per_leg,
            settings.fee_rate,
            settings.fixed_cost,
        ) else {
            debug!(basket = %key, "Basket not priceable yet");
            return (next_notify_at, false);
        };
        self.stats.record_candidate(key, candidate.edge());

        let raw_clears = candidate.edge() >= settings.min_edge;
        let exec_edge =
            self.estimator
                .exec_edge(&candidate, &self.books, self.filter.config().slippage_bps);
        let decision = self.filter.apply(
            key,
            &mut basket.runtime,
            candidate.strategy(),
            exec_edge,
            raw_clears,
            now,
        );
        if decision.filtered {
            self.stats.filtered += 1;
        }
        if let Some(sink) = &mut self.metrics {
            if settings.record_all || raw_clears {
                sink.record(&candidate, &decision, now);
            }
        }
        if decision.filtered || !raw_clears {
            return (next_notify_at, false);
        }

        let sig = signature(&candidate);
        let changed = basket.runtime.last_signature.as_deref() != Some(sig.as_str());
        let cooled = basket
            .runtime
            .last_alert_ts
            .map_or(true, |last| now - last >= settings.alert_cooldown);
        if (changed || cooled) && now >= next_notify_at {
            info!(
                basket = %key,
                strategy = %candidate.strategy(),
                edge = %candidate.edge(),
                exec_edge = ?exec_edge,
                "Arbitrage candidate"
            );
            self.notifier
                .notify_all(Event::CandidateAlert(AlertEvent::new(&candidate, exec_edge)));
            basket.runtime.last_alert_ts = Some(now);
            basket.runtime.last_signature = Some(sig);
            next_notify_at = now + settings.notify_min_interval;
            self.stats.alerts += 1;
        }

        if !settings.execution_enabled {
            return (next_notify_at, false);
        }
        let Some(gate) = &self.gate else {
            return (next_notify_at, false);
        };
        let tick_size = basket.meta().tick_size;
        let outcome = gate
            .execute(
                &mut self.state,
                &mut basket.runtime,
                &candidate,
                tick_size,
                &self.books,
                now,
            )
            .await;

        let event = match &outcome {
            GateOutcome::Rejected(_) => return (next_notify_at, false),
            GateOutcome::Executed { fill, attempts } => ExecutionEvent {
                basket_key: key.to_string(),
                success: true,
                attempts: *attempts,
                details: format!("notional {} orders {}", fill.notional(), fill.order_ids()),
            },
            GateOutcome::Failed { error, attempts } => ExecutionEvent {
                basket_key: key.to_string(),
                success: false,
                attempts: *attempts,
                details: error.to_string(),
            },
        };
        self.stats.record_execution(outcome.is_success());
        self.notifier.notify_all(Event::ExecutionCompleted(event));
        (next_notify_at, true)
    }

    /// Run one loss check; on a fresh halt, persist and notify.
    ///
    /// The day is rolled first so drawdown is always measured against the
    /// current day's anchor, even when the feed has been quiet since midnight.
    pub async fn check_guard(
        &mut self,
        guard: &DailyLossGuard,
        now: DateTime<Utc>,
    ) -> GuardVerdict {
        self.roll_day(local_day(now));
        let verdict = guard.check(&mut self.state).await;
        if let GuardVerdict::Halted { reason } = &verdict {
            self.persist();
            self.notifier.notify_all(Event::Halted {
                reason: reason.clone(),
            });
        }
        verdict
    }

    /// Emit the periodic summary and start a new window.
    pub fn emit_summary(&mut self, window_secs: u64) {
        let summary = self.stats.take_summary(window_secs);
        self.notifier.notify_all(Event::Summary(summary));
    }

    /// Final flush before the run ends on its own.
    pub fn finish(&mut self, reason: &str) {
        self.persist();
        self.notifier.notify_all(Event::RunFinished {
            reason: reason.to_string(),
        });
    }
}
