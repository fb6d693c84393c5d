use std::sync::Arc;

use basketwatch::adapter::notifier::NotifierRegistry;
use basketwatch::app::{
    local_day, Engine, EngineSettings, ExecutionGate, ExecutionLimits, RetryPolicy,
};
use basketwatch::domain::{ExecEdgeFilter, FilterConfig, Universe};
use basketwatch::exchange::BasketExecutor;
use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;

use crate::harness::recording_notifier::RecordingNotifier;

pub fn settings() -> EngineSettings {
    EngineSettings {
        shares_per_leg: dec!(10),
        fee_rate: dec!(0),
        fixed_cost: dec!(0),
        min_edge: dec!(0.05),
        min_eval_interval: chrono::Duration::zero(),
        alert_cooldown: chrono::Duration::seconds(300),
        notify_min_interval: chrono::Duration::zero(),
        record_all: false,
        execution_enabled: false,
    }
}

/// Engine over `universe` with a recording notifier attached.
pub fn engine(
    settings: EngineSettings,
    universe: Universe,
    filter: FilterConfig,
    now: DateTime<Utc>,
) -> (Engine, RecordingNotifier) {
    let recorder = RecordingNotifier::new();
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(recorder.clone()));
    let engine = Engine::new(
        settings,
        universe,
        ExecEdgeFilter::new(filter),
        registry,
        local_day(now),
    );
    (engine, recorder)
}

/// Gate with no retry delay and the given caps.
pub fn gate(executor: Arc<dyn BasketExecutor>, limits: ExecutionLimits, attempts: u32) -> ExecutionGate {
    ExecutionGate::new(
        executor,
        limits,
        RetryPolicy {
            max_attempts: attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        },
        600,
        dec!(100),
    )
}
