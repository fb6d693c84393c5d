//! Event baskets: groups of legs whose outcomes jointly cover one event.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{BasketKey, ConditionId, TokenId};
use super::money::Price;

/// Which outcome of a binary market a leg holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => f.write_str("yes"),
            Self::No => f.write_str("no"),
        }
    }
}

/// One tradable contract within a basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub token_id: TokenId,
    pub condition_id: ConditionId,
    /// Venue market id (Gamma id on Polymarket).
    #[serde(default)]
    pub market_id: Option<String>,
    pub label: String,
    pub side: Side,
}

/// Combination rule for a basket, selected once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Buy YES on every mutually exclusive outcome; exactly one pays out.
    BuyAllYes,
    /// Buy the YES and NO contracts of one binary market.
    YesNoPair,
    /// Buy NO on every outcome; all but one pay out.
    BuyAllNo,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Self::BuyAllYes, Self::YesNoPair, Self::BuyAllNo];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuyAllYes => "buy_all_yes",
            Self::YesNoPair => "yes_no_pair",
            Self::BuyAllNo => "buy_all_no",
        }
    }

    /// Guaranteed payout units per share of every leg at settlement.
    #[must_use]
    pub fn payout_units(self, leg_count: usize) -> Decimal {
        match self {
            Self::BuyAllYes | Self::YesNoPair => Decimal::ONE,
            Self::BuyAllNo => Decimal::from(leg_count.saturating_sub(1)),
        }
    }

    fn check_legs(self, key: &BasketKey, legs: &[Leg]) -> Result<(), DomainError> {
        let mismatch = |reason: String| DomainError::LegShapeMismatch {
            key: key.to_string(),
            strategy: self.as_str(),
            reason,
        };
        match self {
            Self::YesNoPair => {
                let yes = legs.iter().filter(|l| l.side == Side::Yes).count();
                if legs.len() != 2 || yes != 1 {
                    return Err(mismatch(format!(
                        "needs one yes and one no leg, got {} legs ({yes} yes)",
                        legs.len()
                    )));
                }
                if legs[0].condition_id != legs[1].condition_id {
                    return Err(mismatch("legs belong to different conditions".into()));
                }
            }
            Self::BuyAllYes | Self::BuyAllNo => {
                let (want, min_legs) = if self == Self::BuyAllYes {
                    (Side::Yes, 1)
                } else {
                    (Side::No, 2)
                };
                if legs.len() < min_legs {
                    return Err(mismatch(format!(
                        "needs at least {min_legs} legs, got {}",
                        legs.len()
                    )));
                }
                if let Some(leg) = legs.iter().find(|l| l.side != want) {
                    return Err(mismatch(format!("leg '{}' is on the {} side", leg.label, leg.side)));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| DomainError::UnknownStrategy { tag: s.to_string() })
    }
}

/// Market metadata carried along for display and order rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketMeta {
    #[serde(default)]
    pub liquidity: Option<Decimal>,
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_tick_size")]
    pub tick_size: Price,
}

fn default_tick_size() -> Price {
    dec!(0.01)
}

impl Default for MarketMeta {
    fn default() -> Self {
        Self {
            liquidity: None,
            volume: None,
            end_date: None,
            tick_size: default_tick_size(),
        }
    }
}

impl MarketMeta {
    /// Time left until the event ends, if known and in the future.
    #[must_use]
    pub fn time_to_end(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.end_date.map(|end| end - now).filter(|d| *d > chrono::Duration::zero())
    }
}

/// Mutable per-basket fields, owned by the dispatch loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketRuntime {
    pub last_alert_ts: Option<DateTime<Utc>>,
    pub last_exec_ts: Option<DateTime<Utc>>,
    pub last_eval_ts: Option<DateTime<Utc>>,
    pub last_signature: Option<String>,
    pub neg_exec_streak: u32,
    pub filtered_until: Option<DateTime<Utc>>,
}

impl BasketRuntime {
    /// Whether the exec-edge filter has this basket muted at `now`.
    #[must_use]
    pub fn is_muted(&self, now: DateTime<Utc>) -> bool {
        self.filtered_until.is_some_and(|until| now < until)
    }
}

/// A set of legs for one real-world event plus its combination rule.
#[derive(Debug, Clone)]
pub struct EventBasket {
    key: BasketKey,
    title: String,
    strategy: Strategy,
    legs: Vec<Leg>,
    meta: MarketMeta,
    pub runtime: BasketRuntime,
}

impl EventBasket {
    /// Build a basket, checking the legs fit the strategy.
    pub fn try_new(
        key: BasketKey,
        title: impl Into<String>,
        strategy: Strategy,
        legs: Vec<Leg>,
        meta: MarketMeta,
    ) -> Result<Self, DomainError> {
        if legs.is_empty() {
            return Err(DomainError::EmptyLegs { key: key.to_string() });
        }
        let mut seen = HashSet::new();
        for leg in &legs {
            if !seen.insert(&leg.token_id) {
                return Err(DomainError::DuplicateLeg {
                    key: key.to_string(),
                    token_id: leg.token_id.to_string(),
                });
            }
        }
        strategy.check_legs(&key, &legs)?;

        Ok(Self {
            key,
            title: title.into(),
            strategy,
            legs,
            meta,
            runtime: BasketRuntime::default(),
        })
    }

    #[must_use]
    pub const fn key(&self) -> &BasketKey {
        &self.key
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    #[must_use]
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    #[must_use]
    pub const fn meta(&self) -> &MarketMeta {
        &self.meta
    }

    /// Contract ids of every leg.
    pub fn token_ids(&self) -> impl Iterator<Item = &TokenId> {
        self.legs.iter().map(|l| &l.token_id)
    }
}
