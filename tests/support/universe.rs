use basketwatch::domain::{
    BasketKey, ConditionId, EventBasket, Leg, MarketMeta, Side, Strategy, Universe,
};

pub fn leg(token: &str, condition: &str, side: Side) -> Leg {
    Leg {
        token_id: token.into(),
        condition_id: ConditionId::from(condition),
        market_id: None,
        label: token.to_string(),
        side,
    }
}

pub fn basket(key: &str, strategy: Strategy, legs: Vec<Leg>) -> EventBasket {
    EventBasket::try_new(BasketKey::from(key), key, strategy, legs, MarketMeta::default())
        .expect("valid basket")
}

/// Three-way "who wins" event as a buy-all-yes basket.
pub fn three_way() -> EventBasket {
    basket(
        "three-way",
        Strategy::BuyAllYes,
        vec![
            leg("a-yes", "a", Side::Yes),
            leg("b-yes", "b", Side::Yes),
            leg("c-yes", "c", Side::Yes),
        ],
    )
}

/// Same event as a buy-all-no basket.
pub fn three_way_no() -> EventBasket {
    basket(
        "three-way-no",
        Strategy::BuyAllNo,
        vec![
            leg("a-no", "a", Side::No),
            leg("b-no", "b", Side::No),
            leg("c-no", "c", Side::No),
        ],
    )
}

/// YES/NO pair on condition `a`.
pub fn pair_a() -> EventBasket {
    basket(
        "pair-a",
        Strategy::YesNoPair,
        vec![leg("a-yes", "a", Side::Yes), leg("a-no", "a", Side::No)],
    )
}

pub fn universe(baskets: Vec<EventBasket>) -> Universe {
    Universe::new(baskets).expect("unique keys")
}
