//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with environment variable overrides
//! for sensitive values like `WALLET_PRIVATE_KEY`. Every section is optional;
//! missing fields take the defaults below.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::gate::ExecutionLimits;
use crate::app::guard::GuardConfig;
use crate::domain::FilterConfig;
use crate::error::{ConfigError, Result};
use crate::exchange::ReconnectionConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub universe: UniverseConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub limits: ExecutionLimits,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub reconnection: ReconnectionConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Positions endpoint used by the daily-loss guard.
    #[serde(default = "default_data_api_url")]
    pub data_api_url: String,
    /// Chain ID: 80002 for Amoy testnet, 137 for Polygon mainnet
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

fn default_ws_url() -> String {
    "wss://ws-subscriptions-clob.polymarket.com/ws/market".into()
}

fn default_api_url() -> String {
    "https://clob.polymarket.com".into()
}

fn default_data_api_url() -> String {
    "https://data-api.polymarket.com/".into()
}

/// Default chain ID is Amoy testnet (80002) for safety
const fn default_chain_id() -> u64 {
    80002
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            api_url: default_api_url(),
            data_api_url: default_data_api_url(),
            chain_id: default_chain_id(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Where the basket universe comes from.
#[derive(Debug, Clone, Deserialize)]
pub struct UniverseConfig {
    #[serde(default = "default_universe_path")]
    pub path: PathBuf,
    /// Reject universes with more baskets than this. 0 = unlimited.
    #[serde(default)]
    pub max_baskets: usize,
    /// Reject universes subscribing to more contracts than this. 0 = unlimited.
    #[serde(default)]
    pub max_tokens: usize,
}

fn default_universe_path() -> PathBuf {
    PathBuf::from("data/universe.json")
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            path: default_universe_path(),
            max_baskets: 0,
            max_tokens: 0,
        }
    }
}

/// Candidate evaluation and alert throttling.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_shares_per_leg")]
    pub shares_per_leg: Decimal,
    /// Fraction of payout lost to fees (e.g., 0.02 = 2%).
    #[serde(default)]
    pub fee_rate: Decimal,
    /// Flat cost per basket (gas, transfer).
    #[serde(default)]
    pub fixed_cost: Decimal,
    /// Net edge a candidate needs before it alerts or executes.
    #[serde(default = "default_min_edge")]
    pub min_edge: Decimal,
    /// Per-basket minimum time between evaluations.
    #[serde(default = "default_min_eval_interval_ms")]
    pub min_eval_interval_ms: u64,
    /// Re-alert an unchanged candidate after this long.
    #[serde(default = "default_alert_cooldown_secs")]
    pub alert_cooldown_secs: u64,
}

fn default_shares_per_leg() -> Decimal {
    dec!(10)
}

fn default_min_edge() -> Decimal {
    dec!(0.05)
}

const fn default_min_eval_interval_ms() -> u64 {
    250
}

const fn default_alert_cooldown_secs() -> u64 {
    300
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            shares_per_leg: default_shares_per_leg(),
            fee_rate: Decimal::ZERO,
            fixed_cost: Decimal::ZERO,
            min_edge: default_min_edge(),
            min_eval_interval_ms: default_min_eval_interval_ms(),
            alert_cooldown_secs: default_alert_cooldown_secs(),
        }
    }
}

/// Notification delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Global minimum gap between candidate alerts.
    #[serde(default = "default_notify_min_interval_secs")]
    pub observe_notify_min_interval_secs: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Forward candidate alerts to the webhook (executions and halts always go).
    #[serde(default = "default_true")]
    pub notify_alerts: bool,
    /// Overridden by `WEBHOOK_URL`.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

const fn default_notify_min_interval_secs() -> u64 {
    30
}

const fn default_queue_capacity() -> usize {
    256
}

const fn default_true() -> bool {
    true
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            observe_notify_min_interval_secs: default_notify_min_interval_secs(),
            queue_capacity: default_queue_capacity(),
            notify_alerts: true,
            webhook_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub path: PathBuf,
    /// Record every candidate, not only those clearing `min_edge`.
    #[serde(default)]
    pub record_all: bool,
}

fn default_metrics_path() -> PathBuf {
    PathBuf::from("data/metrics.jsonl")
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
            record_all: false,
        }
    }
}

/// Which executor backs execution mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Paper,
    Live,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Observe-only unless set (or `--execute`).
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Per-basket gap between executions.
    #[serde(default = "default_exec_cooldown_secs")]
    pub exec_cooldown_secs: u64,
    /// Allowed drift of a leg's ask from the evaluated price.
    #[serde(default = "default_max_slippage_bps")]
    pub max_slippage_bps: Decimal,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

const fn default_exec_cooldown_secs() -> u64 {
    600
}

fn default_max_slippage_bps() -> Decimal {
    dec!(50)
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_retry_base_delay_ms() -> u64 {
    500
}

const fn default_retry_max_delay_ms() -> u64 {
    5000
}

fn default_state_path() -> PathBuf {
    PathBuf::from("data/state.json")
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: ExecutionMode::default(),
            exec_cooldown_secs: default_exec_cooldown_secs(),
            max_slippage_bps: default_max_slippage_bps(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            state_path: default_state_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Stop after this long. 0 = run until interrupted.
    #[serde(default)]
    pub max_runtime_secs: u64,
    /// Log a heartbeat when the feed is quiet this long.
    #[serde(default = "default_recv_timeout_secs")]
    pub recv_timeout_secs: u64,
    /// Summary notification interval. 0 = disabled.
    #[serde(default = "default_summary_interval_secs")]
    pub summary_interval_secs: u64,
}

const fn default_recv_timeout_secs() -> u64 {
    30
}

const fn default_summary_interval_secs() -> u64 {
    3600
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_runtime_secs: 0,
            recv_timeout_secs: default_recv_timeout_secs(),
            summary_interval_secs: default_summary_interval_secs(),
        }
    }
}

/// Wallet configuration for signing orders.
/// Private key is loaded from `WALLET_PRIVATE_KEY` env var at runtime (never from config file).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    #[serde(skip)]
    pub private_key: Option<String>,
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load from a TOML file, apply env overrides and validate.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config = Self::parse(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without touching the environment.
    #[allow(clippy::result_large_err)]
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content).map_err(ConfigError::Parse)?)
    }

    /// Pull secrets and addresses from the environment.
    pub fn apply_env(&mut self) {
        // Load private key from environment variable (never from config file for security)
        self.wallet.private_key = non_empty_env("WALLET_PRIVATE_KEY");
        if let Some(url) = non_empty_env("WEBHOOK_URL") {
            self.notify.webhook_url = Some(url);
        }
        if let Some(address) = non_empty_env("ACCOUNT_ADDRESS") {
            self.guard.account_address = Some(address);
        }
    }

    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.network.ws_url.is_empty() {
            return Err(ConfigError::MissingField { field: "ws_url" }.into());
        }
        if self.network.api_url.is_empty() {
            return Err(ConfigError::MissingField { field: "api_url" }.into());
        }
        if self.evaluation.shares_per_leg <= Decimal::ZERO {
            return Err(invalid("shares_per_leg", "must be positive"));
        }
        if self.evaluation.fee_rate < Decimal::ZERO || self.evaluation.fee_rate >= Decimal::ONE {
            return Err(invalid("fee_rate", "must be in [0, 1)"));
        }
        if self.filter.strike_limit == 0 {
            return Err(invalid("filter.strike_limit", "must be at least 1"));
        }
        if self.run.recv_timeout_secs == 0 {
            return Err(invalid("recv_timeout_secs", "must be positive"));
        }
        if self.execution.max_attempts == 0 {
            return Err(invalid("max_attempts", "must be at least 1"));
        }
        if self.execution.max_slippage_bps < Decimal::ZERO {
            return Err(invalid("max_slippage_bps", "must not be negative"));
        }
        if self.limits.max_notional_per_day < Decimal::ZERO {
            return Err(invalid("max_notional_per_day", "must not be negative"));
        }
        if self.guard.enabled && self.guard.account_address.is_none() {
            return Err(ConfigError::MissingField {
                field: "ACCOUNT_ADDRESS",
            }
            .into());
        }
        if self.execution.enabled
            && self.execution.mode == ExecutionMode::Live
            && self.wallet.private_key.is_none()
        {
            return Err(ConfigError::MissingField {
                field: "WALLET_PRIVATE_KEY",
            }
            .into());
        }
        Ok(())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}
