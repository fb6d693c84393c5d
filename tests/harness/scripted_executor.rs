use std::collections::VecDeque;

use async_trait::async_trait;
use basketwatch::error::ExecutionError;
use basketwatch::exchange::{BasketExecutor, BasketFill, LegFill, LegOrder, OrderId};
use parking_lot::Mutex;

/// Executor that replays scripted failures, then fills everything.
#[derive(Default)]
pub struct ScriptedExecutor {
    failures: Mutex<VecDeque<ExecutionError>>,
    calls: Mutex<Vec<Vec<LegOrder>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` submissions.
    pub fn failing(n: usize) -> Self {
        let executor = Self::default();
        for i in 0..n {
            executor
                .failures
                .lock()
                .push_back(ExecutionError::SubmissionFailed(format!("scripted failure {i}")));
        }
        executor
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_orders(&self) -> Option<Vec<LegOrder>> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl BasketExecutor for ScriptedExecutor {
    async fn submit(&self, orders: &[LegOrder]) -> Result<BasketFill, ExecutionError> {
        self.calls.lock().push(orders.to_vec());
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        Ok(BasketFill {
            fills: orders
                .iter()
                .enumerate()
                .map(|(i, order)| LegFill {
                    token_id: order.token_id.clone(),
                    order_id: OrderId::new(format!("scripted-{i}")),
                    filled: order.size,
                    price: order.limit_price(),
                })
                .collect(),
        })
    }

    fn exchange_name(&self) -> &'static str {
        "scripted"
    }
}
