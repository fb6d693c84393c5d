//! Basketwatch - basket arbitrage monitoring and gated execution.
//!
//! Watches a prediction-market order-book feed, evaluates groups of related
//! contracts ("baskets") whose combined payout is guaranteed, and alerts on
//! or executes the ones that can be bought for less than they pay.
//!
//! # Modules
//!
//! - [`domain`] - Exchange-agnostic types: books, baskets, candidates, the exec-edge filter
//! - [`error`] - Error types for the crate
//! - [`exchange`] - Trait definitions for feeds, executors and account sources
//! - [`adapter`] - Polymarket feed and executor, paper executor, notifiers, metrics, universe loading
//! - [`app`] - Configuration, execution gate, loss guard, dispatch and the run loop
//!
//! # Features
//!
//! - `polymarket` - Live order submission through the Polymarket CLOB client
//!
//! # Example
//!
//! ```no_run
//! use basketwatch::domain::{evaluate, BookCache, Universe};
//! use rust_decimal_macros::dec;
//!
//! let universe = Universe::default();
//! let books = BookCache::new();
//! for basket in universe.iter() {
//!     if let Some(candidate) = evaluate(basket, &books, dec!(10), dec!(0), dec!(0)) {
//!         println!("{} edge {}", candidate.basket_key(), candidate.edge());
//!     }
//! }
//! ```

pub mod adapter;
pub mod app;
pub mod domain;
pub mod error;
pub mod exchange;
