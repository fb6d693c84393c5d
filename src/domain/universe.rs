//! The set of baskets tracked in one monitoring run.
//!
//! Baskets live in an arena indexed by key. A reverse index maps each
//! contract to every basket that holds it, so a feed message can be turned
//! into the set of baskets it impacts.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

use super::basket::{EventBasket, Leg, MarketMeta, Strategy};
use super::error::DomainError;
use super::id::{BasketKey, TokenId};

/// Basket description as supplied by the universe builder.
#[derive(Debug, Clone, Deserialize)]
pub struct BasketSpec {
    pub key: String,
    pub title: String,
    /// Strategy tag, parsed with [`Strategy::from_str`](std::str::FromStr).
    pub strategy: String,
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub meta: MarketMeta,
}

impl BasketSpec {
    /// Validate and build the basket.
    pub fn build(self) -> Result<EventBasket, DomainError> {
        let strategy: Strategy = self.strategy.parse()?;
        EventBasket::try_new(
            BasketKey::new(self.key),
            self.title,
            strategy,
            self.legs,
            self.meta,
        )
    }
}

/// Arena of baskets plus the contract -> basket reverse index.
#[derive(Debug, Default)]
pub struct Universe {
    baskets: Vec<EventBasket>,
    by_key: HashMap<BasketKey, usize>,
    by_token: HashMap<TokenId, Vec<BasketKey>>,
}

impl Universe {
    /// Build from already-validated baskets. Keys must be unique.
    pub fn new(baskets: Vec<EventBasket>) -> Result<Self, DomainError> {
        let mut universe = Self::default();
        for basket in baskets {
            universe.insert(basket)?;
        }
        Ok(universe)
    }

    /// Validate and build every spec, failing on the first bad one.
    pub fn from_specs(specs: Vec<BasketSpec>) -> Result<Self, DomainError> {
        let baskets = specs
            .into_iter()
            .map(BasketSpec::build)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(baskets)
    }

    fn insert(&mut self, basket: EventBasket) -> Result<(), DomainError> {
        let key = basket.key().clone();
        if self.by_key.contains_key(&key) {
            return Err(DomainError::DuplicateBasket { key: key.to_string() });
        }
        for token_id in basket.token_ids() {
            self.by_token
                .entry(token_id.clone())
                .or_default()
                .push(key.clone());
        }
        self.by_key.insert(key, self.baskets.len());
        self.baskets.push(basket);
        Ok(())
    }

    /// Keys of every basket holding any of `tokens`, each exactly once.
    #[must_use]
    pub fn impacted<'a>(&self, tokens: impl IntoIterator<Item = &'a TokenId>) -> BTreeSet<BasketKey> {
        tokens
            .into_iter()
            .filter_map(|t| self.by_token.get(t))
            .flatten()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn get(&self, key: &BasketKey) -> Option<&EventBasket> {
        self.by_key.get(key).map(|&i| &self.baskets[i])
    }

    pub fn get_mut(&mut self, key: &BasketKey) -> Option<&mut EventBasket> {
        self.by_key.get(key).map(|&i| &mut self.baskets[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventBasket> {
        self.baskets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EventBasket> {
        self.baskets.iter_mut()
    }

    /// Every distinct contract id to subscribe to, sorted.
    #[must_use]
    pub fn token_ids(&self) -> Vec<TokenId> {
        let mut tokens: Vec<TokenId> = self.by_token.keys().cloned().collect();
        tokens.sort();
        tokens
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.baskets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.baskets.is_empty()
    }
}
