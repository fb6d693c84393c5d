//! Notification system for alerts and events.
//!
//! The `Notifier` trait defines the interface for notification handlers.
//! Multiple notifiers can be registered with the `NotifierRegistry`.
//! Notifiers must never block the caller: remote delivery happens on a
//! background task.

mod webhook;

pub use webhook::{WebhookConfig, WebhookNotifier};

use std::fmt::Write as _;

use rust_decimal::Decimal;
use tracing::info;

use crate::domain::{Candidate, Strategy};

/// Events that can trigger notifications.
#[derive(Debug, Clone)]
pub enum Event {
    /// A basket cleared the alert threshold.
    CandidateAlert(AlertEvent),
    /// An execution attempt finished (success or exhausted retries).
    ExecutionCompleted(ExecutionEvent),
    /// Daily loss guard halted execution.
    Halted { reason: String },
    /// Periodic run summary.
    Summary(SummaryEvent),
    /// The run is shutting down on its own.
    RunFinished { reason: String },
}

/// Candidate alert payload.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub basket_key: String,
    pub title: String,
    pub strategy: Strategy,
    pub shares_per_leg: Decimal,
    pub cost: Decimal,
    pub payout: Decimal,
    pub edge: Decimal,
    pub edge_pct: Decimal,
    pub exec_edge: Option<Decimal>,
    /// `(label, ask)` per leg.
    pub legs: Vec<(String, Decimal)>,
}

impl AlertEvent {
    #[must_use]
    pub fn new(candidate: &Candidate, exec_edge: Option<Decimal>) -> Self {
        Self {
            basket_key: candidate.basket_key().to_string(),
            title: candidate.title().to_string(),
            strategy: candidate.strategy(),
            shares_per_leg: candidate.shares_per_leg(),
            cost: candidate.cost(),
            payout: candidate.payout(),
            edge: candidate.edge(),
            edge_pct: candidate.edge_pct(),
            exec_edge,
            legs: candidate
                .legs()
                .iter()
                .map(|l| (l.label.clone(), l.ask))
                .collect(),
        }
    }
}

/// Execution result event.
#[derive(Debug, Clone)]
pub struct ExecutionEvent {
    pub basket_key: String,
    pub success: bool,
    pub attempts: u32,
    pub details: String,
}

/// Periodic summary event.
#[derive(Debug, Clone, Default)]
pub struct SummaryEvent {
    pub window_secs: u64,
    pub candidates_total: u64,
    pub candidates_window: u64,
    pub alerts: u64,
    pub filtered: u64,
    pub executions: u64,
    pub execution_failures: u64,
    /// `(basket key, edge)` of the best candidate in the window.
    pub best_window: Option<(String, Decimal)>,
    pub best_overall: Option<(String, Decimal)>,
}

fn pct(fraction: Decimal) -> Decimal {
    (fraction * Decimal::ONE_HUNDRED).round_dp(2)
}

impl Event {
    /// Plain-text rendering for chat sinks.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::CandidateAlert(e) => {
                let mut text = format!(
                    "Arb candidate [{}] {}\nkey: {}\nshares/leg: {} cost: {} payout: {}\nedge: {} ({}%)",
                    e.strategy,
                    e.title,
                    e.basket_key,
                    e.shares_per_leg,
                    e.cost.round_dp(4),
                    e.payout.round_dp(4),
                    e.edge.round_dp(4),
                    pct(e.edge_pct),
                );
                if let Some(exec_edge) = e.exec_edge {
                    let _ = write!(text, " exec edge: {}", exec_edge.round_dp(4));
                }
                for (label, ask) in &e.legs {
                    let _ = write!(text, "\n- {label} @ {ask}");
                }
                text
            }
            Self::ExecutionCompleted(e) => format!(
                "Execution {} for {} after {} attempt(s): {}",
                if e.success { "filled" } else { "failed" },
                e.basket_key,
                e.attempts,
                e.details
            ),
            Self::Halted { reason } => format!("EXECUTION HALTED: {reason}"),
            Self::Summary(e) => {
                let mut text = format!(
                    "Summary (last {}s): {} candidates ({} total), {} alerts, {} filtered, {} executions, {} failures",
                    e.window_secs,
                    e.candidates_window,
                    e.candidates_total,
                    e.alerts,
                    e.filtered,
                    e.executions,
                    e.execution_failures
                );
                if let Some((key, edge)) = &e.best_window {
                    let _ = write!(text, "\nbest in window: {key} edge {}", edge.round_dp(4));
                }
                if let Some((key, edge)) = &e.best_overall {
                    let _ = write!(text, "\nbest overall: {key} edge {}", edge.round_dp(4));
                }
                text
            }
            Self::RunFinished { reason } => format!("Run finished: {reason}"),
        }
    }
}

/// Trait for notification handlers.
///
/// Notifications are fire-and-forget: implementations must return
/// immediately and swallow their own delivery errors.
pub trait Notifier: Send + Sync {
    /// Handle an event.
    fn notify(&self, event: Event);
}

/// Registry of notifiers.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Notify all registered notifiers.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    /// Number of registered notifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A logging notifier that logs events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        match &event {
            Event::CandidateAlert(e) => {
                info!(
                    basket = %e.basket_key,
                    strategy = %e.strategy,
                    edge = %e.edge,
                    edge_pct = %e.edge_pct,
                    exec_edge = ?e.exec_edge,
                    "Candidate alert"
                );
            }
            Event::ExecutionCompleted(e) => {
                info!(
                    basket = %e.basket_key,
                    success = e.success,
                    attempts = e.attempts,
                    details = %e.details,
                    "Execution completed"
                );
            }
            Event::Halted { reason } => {
                info!(reason = %reason, "Execution halted");
            }
            Event::Summary(_) | Event::RunFinished { .. } => {
                info!("{}", event.message());
            }
        }
    }
}
