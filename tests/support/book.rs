use basketwatch::domain::{BookUpdate, PriceLevel, TokenId};
use rust_decimal::Decimal;

/// Best-ask summary for one token (synthetic side).
pub fn top_ask(token: &str, ask: Decimal) -> (TokenId, BookUpdate) {
    (
        TokenId::from(token),
        BookUpdate::Summary {
            best_bid: None,
            best_ask: Some(ask),
        },
    )
}

/// Full ask ladder for one token.
pub fn ask_ladder(token: &str, levels: &[(Decimal, Decimal)]) -> (TokenId, BookUpdate) {
    (
        TokenId::from(token),
        BookUpdate::Snapshot {
            bids: vec![],
            asks: levels
                .iter()
                .map(|(price, size)| PriceLevel::new(*price, *size))
                .collect(),
        },
    )
}

/// Top-of-book asks for several tokens in one message.
pub fn top_asks(asks: &[(&str, Decimal)]) -> Vec<(TokenId, BookUpdate)> {
    asks.iter().map(|(t, a)| top_ask(t, *a)).collect()
}
