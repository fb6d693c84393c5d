//! Order execution for Polymarket CLOB.

use std::str::FromStr;
use std::sync::Arc;

use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use polymarket_client_sdk::auth::state::Authenticated;
use polymarket_client_sdk::auth::{Normal, Signer};
use polymarket_client_sdk::clob::types::response::PostOrderResponse;
use polymarket_client_sdk::clob::types::{OrderType, Side};
use polymarket_client_sdk::clob::{Client, Config as ClobConfig};
use polymarket_client_sdk::types::U256;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::{ConfigError, ExecutionError, Result};
use crate::exchange::{BasketExecutor, BasketFill, LegFill, LegOrder, OrderId};

type AuthenticatedClient = Client<Authenticated<Normal>>;

/// Every leg is all-or-nothing at the venue.
const LEG_ORDER_TYPE: OrderType = OrderType::FOK;

/// Submits basket legs as fill-or-kill limit buys on the Polymarket CLOB.
///
/// An accepted FOK order has filled in full; anything else comes back as an
/// error from the venue, so a leg is never left resting on the book.
pub struct LiveExecutor {
    client: Arc<AuthenticatedClient>,
    signer: Arc<PrivateKeySigner>,
}

impl LiveExecutor {
    /// Authenticate against the CLOB with the given private key.
    pub async fn new(api_url: &str, chain_id: u64, private_key: &str) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(private_key)
            .map_err(|e| ConfigError::InvalidValue {
                field: "WALLET_PRIVATE_KEY",
                reason: e.to_string(),
            })?
            .with_chain_id(Some(chain_id));

        info!(
            chain_id = chain_id,
            address = %signer.address(),
            "Creating CLOB client"
        );

        let client = Client::new(api_url, ClobConfig::default())
            .map_err(|e| ExecutionError::AuthFailed(format!("Failed to create CLOB client: {e}")))?
            .authentication_builder(&signer)
            .authenticate()
            .await
            .map_err(|e| ExecutionError::AuthFailed(e.to_string()))?;

        info!("CLOB client authenticated successfully");

        Ok(Self {
            client: Arc::new(client),
            signer: Arc::new(signer),
        })
    }

    async fn submit_order(
        &self,
        token_id: &str,
        size: Decimal,
        price: Decimal,
    ) -> std::result::Result<PostOrderResponse, ExecutionError> {
        let token_id_u256 =
            U256::from_str(token_id).map_err(|e| ExecutionError::InvalidTokenId {
                token_id: token_id.to_string(),
                reason: e.to_string(),
            })?;

        let order = self
            .client
            .limit_order()
            .token_id(token_id_u256)
            .order_type(LEG_ORDER_TYPE)
            .side(Side::Buy)
            .price(price)
            .size(size)
            .build()
            .await
            .map_err(|e| ExecutionError::OrderBuildFailed(e.to_string()))?;

        let signed_order = self
            .client
            .sign(self.signer.as_ref(), order)
            .await
            .map_err(|e| ExecutionError::SigningFailed(e.to_string()))?;

        let response = self
            .client
            .post_order(signed_order)
            .await
            .map_err(|e| ExecutionError::SubmissionFailed(e.to_string()))?;

        info!(
            order_id = %response.order_id,
            token_id = token_id,
            size = %size,
            price = %price,
            "Order submitted"
        );

        Ok(response)
    }

    /// Best-effort cancel of legs that went through when others did not.
    ///
    /// FOK legs are already matched by the time they are acknowledged; the
    /// cancel only catches orders the venue kept open despite the order type.
    async fn unwind(&self, fills: &[LegFill]) {
        for fill in fills {
            match self.client.cancel_order(fill.order_id.as_str()).await {
                Ok(response) => {
                    if let Some(reason) = response.not_canceled.get(fill.order_id.as_str()) {
                        warn!(order_id = %fill.order_id, reason = %reason, "Leg not cancelled");
                    } else {
                        info!(order_id = %fill.order_id, "Leg cancelled");
                    }
                }
                Err(e) => warn!(order_id = %fill.order_id, error = %e, "Cancel failed"),
            }
        }
    }
}

#[async_trait]
impl BasketExecutor for LiveExecutor {
    async fn submit(&self, orders: &[LegOrder]) -> std::result::Result<BasketFill, ExecutionError> {
        let futures: Vec<_> = orders
            .iter()
            .map(|order| {
                let price = order.limit_price();
                async move {
                    let result = self
                        .submit_order(order.token_id.as_str(), order.size, price)
                        .await;
                    (order, price, result)
                }
            })
            .collect();

        let results = futures_util::future::join_all(futures).await;

        let mut fills = Vec::new();
        let mut first_error = None;
        for (order, price, result) in results {
            match result {
                Ok(resp) => fills.push(LegFill {
                    token_id: order.token_id.clone(),
                    order_id: OrderId::new(resp.order_id),
                    filled: order.size,
                    price,
                }),
                Err(e) => {
                    warn!(token_id = %order.token_id, error = %e, "Leg failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => Ok(BasketFill { fills }),
            Some(e) if fills.is_empty() => Err(e),
            Some(_) => {
                let filled = fills.len();
                self.unwind(&fills).await;
                Err(ExecutionError::PartialFill {
                    filled,
                    total: orders.len(),
                })
            }
        }
    }

    fn exchange_name(&self) -> &'static str {
        "Polymarket"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legs_are_fill_or_kill() {
        assert!(matches!(LEG_ORDER_TYPE, OrderType::FOK));
    }
}
