//! Binance spot.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::api::binance::BinanceClient;
use crate::api::error::{ApiError, ApiResult};
use crate::api::transport::HttpVerb;
use crate::auth::Credentials;
use crate::exchange::order::await_completion;
use crate::exchange::{
    decimal, field, level_prices, Exchange, Fees, OrderBook, OrderProgress, OrderRequest,
    OrderResult, TradeRecord,
};
use crate::shared::{f64_from_value, Params};

/// Trades requested per page.
const TRADE_PAGE_LIMIT: i64 = 1000;

/// Binance spot venue. Fee rates are the 0.1 % base tier.
#[derive(Debug, Clone)]
pub struct Binance {
    client: BinanceClient,
}

impl Binance {
    pub fn new(credentials: Credentials) -> ApiResult<Self> {
        Ok(Self::from_client(BinanceClient::new(credentials)?))
    }

    pub fn from_client(client: BinanceClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &BinanceClient {
        &self.client
    }

    /// Last price of every symbol.
    pub async fn market_prices(&self) -> ApiResult<BTreeMap<String, Decimal>> {
        let response = self.client.get("ticker/price").await?;
        response
            .as_array()
            .ok_or_else(|| ApiError::missing("price list"))?
            .iter()
            .map(|tick| {
                let symbol = tick["symbol"]
                    .as_str()
                    .ok_or_else(|| ApiError::missing("symbol"))?;
                Ok((symbol.to_string(), decimal(&tick["price"], "price")?))
            })
            .collect()
    }

    async fn order_status(&self, pair: &str, client_order_id: &str) -> ApiResult<String> {
        let payload = Params::new()
            .with("symbol", pair)
            .with("origClientOrderId", client_order_id);
        let response = self.client.query(HttpVerb::Get, "order", payload).await?;
        Ok(response["status"].as_str().unwrap_or_default().to_string())
    }
}

fn parse_trades(page: &Value) -> ApiResult<Vec<(i64, TradeRecord)>> {
    page.as_array()
        .ok_or_else(|| ApiError::missing("trade list"))?
        .iter()
        .map(|trade| {
            let id = trade["id"].as_i64().ok_or_else(|| ApiError::missing("trade id"))?;
            let millis = f64_from_value(&trade["time"]).ok_or_else(|| ApiError::missing("trade time"))?;
            Ok((id, TradeRecord::new(millis / 1000.0, decimal(&trade["price"], "trade price")?)))
        })
        .collect()
}

#[async_trait]
impl Exchange for Binance {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn server_time(&self) -> ApiResult<f64> {
        let response = self.client.get("time").await?;
        let millis = f64_from_value(field(&response, "serverTime", "serverTime")?)
            .ok_or_else(|| ApiError::missing("serverTime"))?;
        Ok(millis / 1000.0)
    }

    async fn market_price(&self, pair: &str) -> ApiResult<Decimal> {
        let response = self
            .client
            .query(HttpVerb::Get, "ticker/price", Params::new().with("symbol", pair))
            .await?;
        decimal(&response["price"], "price")
    }

    async fn order_book(&self, pair: &str, depth: u32) -> ApiResult<OrderBook> {
        let payload = Params::new().with("symbol", pair).with("limit", depth);
        let response = self.client.query(HttpVerb::Get, "depth", payload).await?;
        Ok(OrderBook {
            asks: level_prices(&response["asks"], "asks")?,
            bids: level_prices(&response["bids"], "bids")?,
        })
    }

    async fn fees(&self) -> ApiResult<Fees> {
        let base = Decimal::new(1, 1);
        Ok(Fees::from_percent(base, base))
    }

    async fn place_order(
        &self,
        order: &OrderRequest,
        fees: Fees,
        progress: &OrderProgress,
    ) -> ApiResult<OrderResult> {
        let payload = Params::new()
            .with("symbol", &order.pair)
            .with("side", order.side.as_upper_str())
            .with("type", "LIMIT")
            .with("timeInForce", "GTC")
            .with("price", order.price_str())
            .with("quantity", order.volume_str());
        let response = self.client.query(HttpVerb::Post, "order", payload).await?;

        let client_order_id = match response["clientOrderId"].as_str() {
            Some(id) => id.to_string(),
            None => {
                progress.rejected(response.to_string());
                return Ok(OrderResult::rejected());
            }
        };
        progress.submitted(&client_order_id);

        let (pair, id) = (order.pair.as_str(), client_order_id.as_str());
        await_completion(&client_order_id, progress, move || async move {
            let status = self.order_status(pair, id).await?;
            Ok((status == "FILLED").then_some(()))
        })
        .await?;

        let fee = fees.fee_for(order);
        progress.filled(&client_order_id, fee);
        Ok(OrderResult::placed(fee))
    }

    /// Latest page from `trades`, then older pages from `historicalTrades`
    /// by trade id until `since` or trade id 0 is reached. Older pages need
    /// an API key.
    async fn trades(&self, pair: &str, since: f64, until: f64) -> ApiResult<Vec<TradeRecord>> {
        let recent = self
            .client
            .query(
                HttpVerb::Get,
                "trades",
                Params::new().with("symbol", pair).with("limit", TRADE_PAGE_LIMIT),
            )
            .await?;
        let page = parse_trades(&recent)?;
        let (mut first_id, mut oldest) = match page.first() {
            Some((id, trade)) => (*id, trade.timestamp),
            None => return Ok(Vec::new()),
        };
        let mut data: Vec<TradeRecord> = page.into_iter().map(|(_, t)| t).collect();

        // ids at or above `first_id` are already collected
        while since < oldest && first_id > 0 {
            let from_id = (first_id - TRADE_PAGE_LIMIT).max(0);
            let response = self
                .client
                .query(
                    HttpVerb::Get,
                    "historicalTrades",
                    Params::new()
                        .with("symbol", pair)
                        .with("fromId", from_id)
                        .with("limit", TRADE_PAGE_LIMIT),
                )
                .await?;
            let page: Vec<_> = parse_trades(&response)?
                .into_iter()
                .filter(|(id, _)| *id < first_id)
                .collect();
            tracing::debug!(pair, from_id, page = page.len(), "Binance historical trades page");

            if page.is_empty() {
                break;
            }
            let done = page.len() <= 1;
            first_id = from_id;
            oldest = page.iter().fold(oldest, |acc, (_, t)| acc.min(t.timestamp));
            data.extend(page.into_iter().map(|(_, t)| t));
            if done {
                break;
            }
        }

        data.retain(|t| t.timestamp >= since && t.timestamp <= until);
        Ok(data)
    }
}
