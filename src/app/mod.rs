//! Application layer - configuration, run state, gating and orchestration.

pub mod config;
pub mod dispatch;
pub mod gate;
pub mod guard;
mod orchestrator;
pub mod state;
pub mod store;

pub use config::{
    Config, EvaluationConfig, ExecutionConfig, ExecutionMode, LoggingConfig, MetricsConfig,
    NetworkConfig, NotifyConfig, RunConfig, UniverseConfig, WalletConfig,
};
pub use dispatch::{local_day, Engine, EngineSettings};
pub use gate::{can_execute, ExecutionGate, ExecutionLimits, GateDecision, GateOutcome, RetryPolicy};
pub use guard::{DailyLossGuard, GuardConfig, GuardVerdict, HaltAction};
pub use orchestrator::{App, RunExit};
pub use state::{RunStats, RuntimeState};
pub use store::{PersistedState, StateStore};
