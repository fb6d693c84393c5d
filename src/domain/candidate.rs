//! Basket candidate evaluation.
//!
//! A [`Candidate`] is the priced snapshot of one basket at one instant:
//! what buying `shares_per_leg` of every leg at the current best asks costs,
//! what it pays out at settlement, and the edge between the two.
//!
//! # Example
//!
//! ```
//! use basketwatch::domain::{evaluate, BookCache, BookUpdate, EventBasket, Leg, MarketMeta,
//!     Side, Strategy, BasketKey, ConditionId, TokenId};
//! use rust_decimal_macros::dec;
//!
//! let legs = vec![
//!     Leg { token_id: "a".into(), condition_id: ConditionId::from("c1"), market_id: None,
//!           label: "A".into(), side: Side::Yes },
//!     Leg { token_id: "b".into(), condition_id: ConditionId::from("c2"), market_id: None,
//!           label: "B".into(), side: Side::Yes },
//! ];
//! let basket = EventBasket::try_new(BasketKey::from("ab"), "A or B", Strategy::BuyAllYes,
//!     legs, MarketMeta::default()).unwrap();
//!
//! let mut books = BookCache::new();
//! let now = chrono::Utc::now();
//! for (token, ask) in [("a", dec!(0.40)), ("b", dec!(0.55))] {
//!     books.update(TokenId::from(token), BookUpdate::Summary { best_bid: None, best_ask: Some(ask) }, now);
//! }
//!
//! let candidate = evaluate(&basket, &books, dec!(10), dec!(0), dec!(0)).unwrap();
//! assert_eq!(candidate.cost(), dec!(9.50));
//! assert_eq!(candidate.edge(), dec!(0.50));
//! ```

use rust_decimal::Decimal;

use super::basket::{EventBasket, Strategy};
use super::cache::BookCache;
use super::id::{BasketKey, TokenId};
use super::money::{Price, Volume};

/// Cost breakdown for one leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegCost {
    pub token_id: TokenId,
    pub label: String,
    pub ask: Price,
    pub shares: Volume,
    pub cost: Decimal,
}

/// Evaluation result for one basket at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    strategy: Strategy,
    basket_key: BasketKey,
    title: String,
    shares_per_leg: Volume,
    cost: Decimal,
    payout: Decimal,
    fixed_cost: Decimal,
    edge: Decimal,
    edge_pct: Decimal,
    legs: Vec<LegCost>,
}

impl Candidate {
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    #[must_use]
    pub const fn basket_key(&self) -> &BasketKey {
        &self.basket_key
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn shares_per_leg(&self) -> Volume {
        self.shares_per_leg
    }

    /// Total acquisition cost across every leg.
    #[must_use]
    pub const fn cost(&self) -> Decimal {
        self.cost
    }

    /// Guaranteed payout after the venue fee.
    #[must_use]
    pub const fn payout(&self) -> Decimal {
        self.payout
    }

    #[must_use]
    pub const fn fixed_cost(&self) -> Decimal {
        self.fixed_cost
    }

    /// Payout minus cost minus fixed cost.
    #[must_use]
    pub const fn edge(&self) -> Decimal {
        self.edge
    }

    /// Edge as a fraction of cost.
    #[must_use]
    pub const fn edge_pct(&self) -> Decimal {
        self.edge_pct
    }

    #[must_use]
    pub fn legs(&self) -> &[LegCost] {
        &self.legs
    }
}

/// Price a basket at the current best asks.
///
/// Returns `None` if any leg has no cached ask: a basket with a missing
/// leg cannot be priced.
#[must_use]
pub fn evaluate(
    basket: &EventBasket,
    books: &BookCache,
    shares_per_leg: Volume,
    fee_rate: Decimal,
    fixed_cost: Decimal,
) -> Option<Candidate> {
    let mut legs = Vec::with_capacity(basket.legs().len());
    let mut cost = Decimal::ZERO;

    for leg in basket.legs() {
        let ask = books.get(&leg.token_id)?.best_ask()?.price();
        let leg_cost = ask * shares_per_leg;
        cost += leg_cost;
        legs.push(LegCost {
            token_id: leg.token_id.clone(),
            label: leg.label.clone(),
            ask,
            shares: shares_per_leg,
            cost: leg_cost,
        });
    }

    let strategy = basket.strategy();
    let payout =
        shares_per_leg * strategy.payout_units(legs.len()) * (Decimal::ONE - fee_rate);
    let edge = payout - cost - fixed_cost;
    let edge_pct = if cost.is_zero() { Decimal::ZERO } else { edge / cost };

    Some(Candidate {
        strategy,
        basket_key: basket.key().clone(),
        title: basket.title().to_string(),
        shares_per_leg,
        cost,
        payout,
        fixed_cost,
        edge,
        edge_pct,
        legs,
    })
}

/// Deduplication key for a candidate.
///
/// Unchanged books give the same string; any leg price change alters the
/// per-leg section even when the totals happen to net out.
#[must_use]
pub fn signature(candidate: &Candidate) -> String {
    let asks: Vec<String> = candidate
        .legs
        .iter()
        .map(|l| l.ask.normalize().to_string())
        .collect();
    format!(
        "{}|{}|{}|{}|{}",
        candidate.strategy,
        candidate.basket_key,
        candidate.cost.round_dp(4),
        candidate.edge.round_dp(4),
        asks.join(",")
    )
}
