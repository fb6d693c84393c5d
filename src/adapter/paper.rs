//! Paper executor: fills every leg at its limit price without touching a venue.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use crate::error::ExecutionError;
use crate::exchange::{BasketExecutor, BasketFill, LegFill, LegOrder, OrderId};

/// Simulated executor used for execution-mode dry runs.
#[derive(Default)]
pub struct PaperExecutor {
    submitted: Mutex<Vec<Vec<LegOrder>>>,
}

impl PaperExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every basket submitted so far.
    #[must_use]
    pub fn submissions(&self) -> Vec<Vec<LegOrder>> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl BasketExecutor for PaperExecutor {
    async fn submit(&self, orders: &[LegOrder]) -> Result<BasketFill, ExecutionError> {
        let mut submitted = self.submitted.lock();
        let seq = submitted.len() + 1;
        submitted.push(orders.to_vec());
        drop(submitted);

        let fills: Vec<LegFill> = orders
            .iter()
            .enumerate()
            .map(|(i, order)| LegFill {
                token_id: order.token_id.clone(),
                order_id: OrderId::new(format!("paper-{seq}-{i}")),
                filled: order.size,
                price: order.limit_price(),
            })
            .collect();

        let fill = BasketFill { fills };
        info!(
            legs = orders.len(),
            notional = %fill.notional(),
            "Paper basket filled"
        );
        Ok(fill)
    }

    fn exchange_name(&self) -> &'static str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TokenId;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn fills_every_leg_at_tick_rounded_price() {
        let executor = PaperExecutor::new();
        let orders = vec![
            LegOrder {
                token_id: TokenId::from("a"),
                price: dec!(0.401),
                size: dec!(10),
                tick_size: dec!(0.01),
            },
            LegOrder {
                token_id: TokenId::from("b"),
                price: dec!(0.55),
                size: dec!(10),
                tick_size: dec!(0.01),
            },
        ];

        let fill = executor.submit(&orders).await.unwrap();

        assert_eq!(fill.fills.len(), 2);
        assert_eq!(fill.fills[0].price, dec!(0.41));
        assert_eq!(fill.notional(), dec!(9.60));
        assert_eq!(fill.order_ids(), "paper-1-0, paper-1-1");
        assert_eq!(executor.submissions().len(), 1);
    }
}
