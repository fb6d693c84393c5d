//! Exchange-agnostic domain logic.
//!
//! Everything in here is pure: no I/O, no clocks (callers pass `now`), no
//! locking. The dispatch loop in [`crate::app`] owns every mutable value.

pub(crate) mod basket;
mod book;
mod cache;
mod candidate;
mod filter;
mod id;
mod money;
mod time;
mod universe;

pub mod error;

pub use basket::{BasketRuntime, EventBasket, Leg, MarketMeta, Side, Strategy};
pub use book::{BookUpdate, LocalBook, PriceLevel};
pub use cache::BookCache;
pub use candidate::{evaluate, signature, Candidate, LegCost};
pub use filter::{
    DepthWalkEstimator, ExecCostEstimator, ExecEdgeFilter, FilterConfig, FilterDecision,
    FilterReason,
};
pub use id::{BasketKey, ConditionId, TokenId};
pub use money::{bps_to_fraction, Price, Volume, BPS_PER_UNIT};
pub use time::{millis, seconds};
pub use universe::{BasketSpec, Universe};
