//! Kraken Futures.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::api::error::{ApiError, ApiResult};
use crate::api::kraken::KrakenClient;
use crate::auth::Credentials;
use crate::exchange::order::await_completion;
use crate::exchange::{
    decimal, field, Exchange, Fees, OrderProgress, OrderRequest, OrderResult, TradeRecord,
};
use crate::shared::decimal::{rfc3339_to_secs, secs_to_rfc3339};
use crate::shared::{Params, Venue};

/// Kraken Futures venue. Fee rates are the published defaults
/// (0.02 % maker, 0.05 % taker).
#[derive(Debug, Clone)]
pub struct KrakenFutures {
    client: KrakenClient,
}

impl KrakenFutures {
    pub fn new(credentials: Credentials) -> ApiResult<Self> {
        Self::from_client(KrakenClient::new(credentials)?)
    }

    pub fn from_client(client: KrakenClient) -> ApiResult<Self> {
        if client.venue() != Venue::KrakenFutures {
            return Err(ApiError::InvalidParameter(format!(
                "KrakenFutures needs a futures client, got {}",
                client.venue()
            )));
        }
        Ok(Self { client })
    }

    pub fn client(&self) -> &KrakenClient {
        &self.client
    }

    async fn is_filled(&self, order_id: &str) -> ApiResult<bool> {
        let response = self.client.query_method("fills").await?;
        let fills = field(&response, "fills", "fills")?
            .as_array()
            .ok_or_else(|| ApiError::missing("fills"))?;
        Ok(fills
            .iter()
            .any(|fill| fill["order_id"].as_str() == Some(order_id)))
    }
}

fn trade_time(trade: &Value) -> ApiResult<f64> {
    trade["time"]
        .as_str()
        .and_then(rfc3339_to_secs)
        .ok_or_else(|| ApiError::missing("trade time"))
}

#[async_trait]
impl Exchange for KrakenFutures {
    fn name(&self) -> &'static str {
        "kraken_futures"
    }

    async fn server_time(&self) -> ApiResult<f64> {
        let response = self.client.query_method("instruments").await?;
        response["serverTime"]
            .as_str()
            .and_then(rfc3339_to_secs)
            .ok_or_else(|| ApiError::missing("serverTime"))
    }

    async fn market_price(&self, pair: &str) -> ApiResult<Decimal> {
        let response = self.client.query_method("tickers").await?;
        let ticker = field(&response, "tickers", "tickers")?
            .as_array()
            .and_then(|tickers| {
                tickers
                    .iter()
                    .find(|t| t["symbol"].as_str().is_some_and(|s| s.eq_ignore_ascii_case(pair)))
            })
            .ok_or_else(|| ApiError::missing(format!("ticker for {}", pair)))?;
        decimal(&ticker["last"], "last price")
    }

    async fn fees(&self) -> ApiResult<Fees> {
        Ok(Fees::from_percent(Decimal::new(2, 2), Decimal::new(5, 2)))
    }

    async fn place_order(
        &self,
        order: &OrderRequest,
        fees: Fees,
        progress: &OrderProgress,
    ) -> ApiResult<OrderResult> {
        let payload = Params::new()
            .with("orderType", "lmt")
            .with("symbol", &order.pair)
            .with("side", order.side.as_str())
            .with("limitPrice", order.price_str())
            .with("size", order.volume_str());
        let response = self.client.query("sendorder", payload).await?;

        let status = &response["sendStatus"];
        if status["status"].as_str() != Some("placed") {
            let reason = status["status"].as_str().unwrap_or("no send status");
            progress.rejected(reason);
            return Ok(OrderResult::rejected());
        }
        let order_id = status["order_id"]
            .as_str()
            .ok_or_else(|| ApiError::missing("sendStatus.order_id"))?
            .to_string();
        progress.submitted(&order_id);

        let id = order_id.as_str();
        await_completion(&order_id, progress, move || async move {
            Ok(self.is_filled(id).await?.then_some(()))
        })
        .await?;

        let fee = fees.fee_for(order);
        progress.filled(&order_id, fee);
        Ok(OrderResult::placed(fee))
    }

    /// Walks `history` backwards from `until`, one page per request.
    async fn trades(&self, pair: &str, since: f64, until: f64) -> ApiResult<Vec<TradeRecord>> {
        let mut cursor = until;
        let mut data = Vec::new();

        while since < cursor {
            let last_time = secs_to_rfc3339(cursor)
                .ok_or_else(|| ApiError::InvalidParameter(format!("invalid time {}", cursor)))?;
            let response = self
                .client
                .query(
                    "history",
                    Params::new().with("symbol", pair).with("lastTime", last_time),
                )
                .await?;
            let page = field(&response, "history", "history")?
                .as_array()
                .ok_or_else(|| ApiError::missing("history"))?;
            if page.is_empty() {
                break;
            }

            let mut oldest = cursor;
            for trade in page {
                let timestamp = trade_time(trade)?;
                oldest = oldest.min(timestamp);
                data.push(TradeRecord::new(timestamp, decimal(&trade["price"], "trade price")?));
            }

            tracing::debug!(pair, cursor, oldest, page = page.len(), "Kraken Futures history page");
            if oldest >= cursor {
                break;
            }
            cursor = oldest;
        }

        data.retain(|t| t.timestamp >= since && t.timestamp <= until);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fixed_fees() {
        let venue = KrakenFutures::new(Credentials::public(Venue::KrakenFutures)).unwrap();
        let fees = venue.fees().await.unwrap();
        assert_eq!(fees.maker, Decimal::new(2, 4));
        assert_eq!(fees.taker, Decimal::new(5, 4));
    }

    #[test]
    fn test_trade_time() {
        let trade = json!({"time": "2019-02-14T09:32:17.282Z", "price": 3574.5});
        assert_eq!(trade_time(&trade).unwrap(), 1550136737.282);
        assert!(trade_time(&json!({})).is_err());
    }
}
