//! Implementations of the exchange traits and outbound sinks.

pub mod metrics;
pub mod notifier;
pub mod paper;
pub mod polymarket;
pub mod universe;
