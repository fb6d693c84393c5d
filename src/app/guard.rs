//! Daily loss guard.
//!
//! Polls the account PnL and halts execution once today's drawdown exceeds
//! the configured limit. The first successful check of a day anchors the
//! starting PnL.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::app::state::RuntimeState;
use crate::exchange::AccountSource;

/// What the run does once the guard halts execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaltAction {
    /// Flush state and stop the process.
    Exit,
    /// Keep evaluating and alerting, without executing, until the day rolls.
    #[default]
    Idle,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default)]
    pub halt_action: HaltAction,
    /// Overridden by `ACCOUNT_ADDRESS`.
    #[serde(default)]
    pub account_address: Option<String>,
}

fn default_max_daily_loss() -> Decimal {
    dec!(50)
}

const fn default_check_interval_secs() -> u64 {
    60
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_daily_loss: default_max_daily_loss(),
            check_interval_secs: default_check_interval_secs(),
            halt_action: HaltAction::default(),
            account_address: None,
        }
    }
}

/// Result of one guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    /// Account could not be read; nothing changed.
    Skipped,
    /// Within the limit.
    Healthy { drawdown: Decimal },
    /// This check tripped the halt.
    Halted { reason: String },
    /// Execution was already halted earlier today.
    AlreadyHalted,
}

pub struct DailyLossGuard {
    source: Arc<dyn AccountSource>,
    max_daily_loss: Decimal,
    action: HaltAction,
}

impl DailyLossGuard {
    #[must_use]
    pub fn new(source: Arc<dyn AccountSource>, max_daily_loss: Decimal, action: HaltAction) -> Self {
        Self {
            source,
            max_daily_loss,
            action,
        }
    }

    #[must_use]
    pub const fn action(&self) -> HaltAction {
        self.action
    }

    /// Poll the account and update `state`. The caller persists and
    /// notifies when the verdict is `Halted`.
    pub async fn check(&self, state: &mut RuntimeState) -> GuardVerdict {
        if state.halted {
            return GuardVerdict::AlreadyHalted;
        }

        let snapshot = match self.source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Account snapshot failed, skipping loss check");
                return GuardVerdict::Skipped;
            }
        };

        let pnl = snapshot.total_pnl;
        state.last_pnl = Some(pnl);
        let start = *state.start_pnl.get_or_insert_with(|| {
            info!(start_pnl = %pnl, "Daily PnL anchored");
            pnl
        });

        let drawdown = start - pnl;
        debug!(
            pnl = %pnl,
            drawdown = %drawdown,
            open_positions = snapshot.open_positions,
            open_orders = snapshot.open_orders,
            "Loss check"
        );

        if drawdown > self.max_daily_loss {
            let reason = format!(
                "daily loss {} exceeds limit {}",
                drawdown.round_dp(2),
                self.max_daily_loss
            );
            warn!(reason = %reason, "Halting execution");
            state.halt(reason.clone());
            return GuardVerdict::Halted { reason };
        }
        GuardVerdict::Healthy { drawdown }
    }
}
