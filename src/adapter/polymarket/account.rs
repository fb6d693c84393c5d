//! Account PnL from the Polymarket data API.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::message::WireDecimal;
use crate::error::{Error, Result};
use crate::exchange::{AccountSnapshot, AccountSource};

/// One row of `GET /positions?user=<address>`.
#[derive(Debug, Deserialize)]
pub struct PositionRow {
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub size: Option<WireDecimal>,
    #[serde(rename = "cashPnl", default)]
    pub cash_pnl: Option<WireDecimal>,
    #[serde(rename = "realizedPnl", default)]
    pub realized_pnl: Option<WireDecimal>,
}

fn value_or_zero(v: Option<&WireDecimal>) -> Decimal {
    v.and_then(WireDecimal::value).unwrap_or_default()
}

/// Sum PnL over position rows. Rows with no open size still count toward
/// realized PnL.
#[must_use]
pub fn summarize(rows: &[PositionRow]) -> AccountSnapshot {
    let total_pnl = rows
        .iter()
        .map(|r| value_or_zero(r.cash_pnl.as_ref()) + value_or_zero(r.realized_pnl.as_ref()))
        .sum();
    let open_positions = rows
        .iter()
        .filter(|r| value_or_zero(r.size.as_ref()) > Decimal::ZERO)
        .count();
    AccountSnapshot {
        total_pnl,
        open_positions,
        open_orders: 0,
    }
}

/// Account source backed by the public data API.
pub struct DataApiAccount {
    client: Client,
    positions_url: Url,
}

impl DataApiAccount {
    /// `base_url` is the data API root, `user` the proxy wallet address.
    pub fn new(base_url: &str, user: &str) -> Result<Self> {
        let mut positions_url = Url::parse(base_url)?.join("positions")?;
        positions_url.query_pairs_mut().append_pair("user", user);
        Ok(Self {
            client: Client::new(),
            positions_url,
        })
    }
}

#[async_trait]
impl AccountSource for DataApiAccount {
    async fn snapshot(&self) -> Result<AccountSnapshot> {
        let response = self.client.get(self.positions_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Account(format!("positions request returned {status}")));
        }
        let rows: Vec<PositionRow> = response.json().await?;
        let snapshot = summarize(&rows);
        debug!(
            pnl = %snapshot.total_pnl,
            positions = snapshot.open_positions,
            "Fetched account snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sums_cash_and_realized_pnl() {
        let rows: Vec<PositionRow> = serde_json::from_str(
            r#"[
                {"asset":"a","size":10,"cashPnl":-1.5,"realizedPnl":0.25},
                {"asset":"b","size":"0","cashPnl":"0","realizedPnl":"2"},
                {"asset":"c"}
            ]"#,
        )
        .unwrap();

        let snapshot = summarize(&rows);
        assert_eq!(snapshot.total_pnl, dec!(0.75));
        assert_eq!(snapshot.open_positions, 1);
    }

    #[test]
    fn builds_positions_url() {
        let account = DataApiAccount::new("https://data-api.polymarket.com/", "0xabc").unwrap();
        assert_eq!(
            account.positions_url.as_str(),
            "https://data-api.polymarket.com/positions?user=0xabc"
        );
    }
}
