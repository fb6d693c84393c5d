//! App orchestration.
//!
//! Wires configuration into an [`Engine`] and drives it from one
//! `tokio::select!` loop over the feed, the run deadline, the loss guard and
//! the summary timer.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval_at, sleep, timeout, Instant, Interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::adapter::metrics::MetricsSink;
use crate::adapter::notifier::{LogNotifier, NotifierRegistry, WebhookConfig, WebhookNotifier};
use crate::adapter::paper::PaperExecutor;
use crate::adapter::polymarket::{DataApiAccount, PolymarketDataStream};
use crate::adapter::universe::load_universe;
use crate::app::config::{Config, ExecutionMode, RunConfig};
use crate::app::dispatch::{local_day, Engine, EngineSettings};
use crate::app::gate::{ExecutionGate, RetryPolicy};
use crate::app::guard::{DailyLossGuard, GuardVerdict, HaltAction};
use crate::app::store::StateStore;
use crate::domain::ExecEdgeFilter;
use crate::error::{ConfigError, Result};
use crate::exchange::{BasketExecutor, MarketDataStream, MarketEvent, ReconnectingDataStream};

/// Why a run ended on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// `max_runtime_secs` elapsed.
    Deadline,
    /// Daily loss guard halted with `halt_action = "exit"`.
    Halted,
    /// The feed ended for good.
    FeedClosed,
}

/// Main application struct.
pub struct App;

impl App {
    /// Build everything from config and run until the run ends.
    pub async fn run(config: Config) -> Result<RunExit> {
        let universe = load_universe(
            &config.universe.path,
            config.universe.max_baskets,
            config.universe.max_tokens,
        )?;

        let notifier = build_notifier_registry(&config);
        info!(notifiers = notifier.len(), "Notifiers initialized");

        let now = Utc::now();
        let mut engine = Engine::new(
            EngineSettings::from(&config),
            universe,
            ExecEdgeFilter::new(config.filter.clone()),
            notifier,
            local_day(now),
        );

        if config.metrics.enabled {
            let sink = MetricsSink::new(&config.metrics.path);
            info!(path = %sink.path().display(), run_id = %sink.run_id(), "Metrics enabled");
            engine = engine.with_metrics(sink);
        }

        if config.execution.enabled {
            let store = StateStore::new(&config.execution.state_path);
            if let Some(persisted) = store.load()? {
                engine.restore(persisted);
            }
            engine = engine.with_store(store);

            let executor = init_executor(&config).await?;
            info!(exchange = executor.exchange_name(), "Execution enabled");
            let gate = ExecutionGate::new(
                executor,
                config.limits.clone(),
                RetryPolicy {
                    max_attempts: config.execution.max_attempts,
                    base_delay_ms: config.execution.retry_base_delay_ms,
                    max_delay_ms: config.execution.retry_max_delay_ms,
                },
                config.execution.exec_cooldown_secs,
                config.execution.max_slippage_bps,
            );
            engine = engine.with_gate(gate);
        } else {
            info!("Observe mode: no orders will be placed");
        }

        let guard = init_guard(&config)?;

        let mut stream = ReconnectingDataStream::new(
            PolymarketDataStream::new(config.network.ws_url.clone()),
            config.reconnection.clone(),
        );

        Self::run_with(&config.run, &mut engine, &mut stream, guard.as_ref()).await
    }

    /// Drive an engine from any feed. Used directly by tests.
    pub async fn run_with<S: MarketDataStream>(
        run: &RunConfig,
        engine: &mut Engine,
        stream: &mut S,
        guard: Option<&(DailyLossGuard, Duration)>,
    ) -> Result<RunExit> {
        let tokens = engine.token_ids();
        stream.connect().await?;
        stream.subscribe(&tokens).await?;
        info!(
            exchange = stream.exchange_name(),
            baskets = engine.universe().len(),
            tokens = tokens.len(),
            "Subscribed to market feed"
        );

        let max_runtime = (run.max_runtime_secs > 0).then(|| Duration::from_secs(run.max_runtime_secs));
        let deadline = async move {
            match max_runtime {
                Some(d) => sleep(d).await,
                None => pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let mut guard_tick = guard.map(|(_, every)| delayed_interval(*every, false));
        let mut summary_tick = (run.summary_interval_secs > 0)
            .then(|| delayed_interval(Duration::from_secs(run.summary_interval_secs), true));
        let recv_timeout = Duration::from_secs(run.recv_timeout_secs);
        let mut next_notify_at = Utc::now();

        loop {
            tokio::select! {
                () = &mut deadline => {
                    info!("Max runtime reached, shutting down");
                    engine.finish("max runtime reached");
                    return Ok(RunExit::Deadline);
                }
                () = tick(&mut guard_tick) => {
                    let Some((guard, _)) = guard else { continue };
                    let verdict = engine.check_guard(guard, Utc::now()).await;
                    let halted = matches!(verdict, GuardVerdict::Halted { .. } | GuardVerdict::AlreadyHalted);
                    if halted && guard.action() == HaltAction::Exit {
                        engine.finish("daily loss limit reached");
                        return Ok(RunExit::Halted);
                    }
                }
                () = tick(&mut summary_tick) => {
                    engine.emit_summary(run.summary_interval_secs);
                }
                event = timeout(recv_timeout, stream.next_event()) => match event {
                    Err(_) => {
                        info!(
                            books = engine.books().len(),
                            timeout_secs = run.recv_timeout_secs,
                            "No market data received, still listening"
                        );
                    }
                    Ok(None) => {
                        warn!("Market feed closed");
                        engine.finish("market feed closed");
                        return Ok(RunExit::FeedClosed);
                    }
                    Ok(Some(MarketEvent::BookUpdates(updates))) => {
                        let now = Utc::now();
                        let keys = engine.apply_updates(updates, now);
                        if !keys.is_empty() {
                            next_notify_at = engine.on_impacted_baskets(&keys, next_notify_at, now).await;
                        }
                    }
                    Ok(Some(MarketEvent::Connected)) => info!("Market feed connected"),
                    Ok(Some(MarketEvent::Disconnected { reason })) => {
                        warn!(reason = %reason, "Market feed disconnected");
                    }
                },
            }
        }
    }
}

/// Interval whose first tick is either immediate or one period out.
fn delayed_interval(period: Duration, skip_first: bool) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let start = if skip_first { Instant::now() + period } else { Instant::now() };
    let mut interval = interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Tick an optional interval; a missing one never fires.
async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending::<()>().await,
    }
}

fn build_notifier_registry(config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));

    if let Some(url) = &config.notify.webhook_url {
        let mut webhook = WebhookConfig::new(url.clone());
        webhook.queue_capacity = config.notify.queue_capacity;
        webhook.notify_alerts = config.notify.notify_alerts;
        registry.register(Box::new(WebhookNotifier::new(webhook)));
        info!("Webhook notifier enabled");
    }

    registry
}

#[allow(clippy::result_large_err)]
fn init_guard(config: &Config) -> Result<Option<(DailyLossGuard, Duration)>> {
    if !config.guard.enabled {
        return Ok(None);
    }
    let address = config
        .guard
        .account_address
        .as_deref()
        .ok_or(ConfigError::MissingField {
            field: "ACCOUNT_ADDRESS",
        })?;
    let account = DataApiAccount::new(&config.network.data_api_url, address)?;
    info!(
        max_daily_loss = %config.guard.max_daily_loss,
        halt_action = ?config.guard.halt_action,
        "Daily loss guard enabled"
    );
    let guard = DailyLossGuard::new(
        Arc::new(account),
        config.guard.max_daily_loss,
        config.guard.halt_action,
    );
    Ok(Some((guard, Duration::from_secs(config.guard.check_interval_secs))))
}

async fn init_executor(config: &Config) -> Result<Arc<dyn BasketExecutor>> {
    match config.execution.mode {
        ExecutionMode::Paper => Ok(Arc::new(PaperExecutor::new())),
        ExecutionMode::Live => live_executor(config).await,
    }
}

#[cfg(feature = "polymarket")]
async fn live_executor(config: &Config) -> Result<Arc<dyn BasketExecutor>> {
    use crate::adapter::polymarket::LiveExecutor;

    let key = config
        .wallet
        .private_key
        .as_deref()
        .ok_or(ConfigError::MissingField {
            field: "WALLET_PRIVATE_KEY",
        })?;
    let executor =
        LiveExecutor::new(&config.network.api_url, config.network.chain_id, key).await?;
    Ok(Arc::new(executor))
}

#[cfg(not(feature = "polymarket"))]
async fn live_executor(_config: &Config) -> Result<Arc<dyn BasketExecutor>> {
    Err(ConfigError::InvalidValue {
        field: "execution.mode",
        reason: "live execution requires the `polymarket` feature".into(),
    }
    .into())
}
