//! Kraken spot.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;

use crate::api::error::{ApiError, ApiResult};
use crate::api::kraken::KrakenClient;
use crate::auth::Credentials;
use crate::exchange::order::await_completion;
use crate::exchange::{
    decimal, field, level_prices, Candle, Exchange, Fees, OrderBook, OrderProgress, OrderRequest,
    OrderResult, TradeRecord,
};
use crate::shared::{f64_from_value, Params, Venue};

/// Pair whose fee tier is read from `TradeVolume`.
pub const DEFAULT_FEE_REFERENCE_PAIR: &str = "XXRPZEUR";

/// Maker/taker percentages used when `TradeVolume` is unavailable.
const FALLBACK_FEES_PERCENT: (i64, i64) = (16, 26);

/// Kraken spot venue.
#[derive(Debug, Clone)]
pub struct Kraken {
    client: KrakenClient,
    fee_reference_pair: String,
}

impl Kraken {
    pub fn new(credentials: Credentials) -> ApiResult<Self> {
        Self::from_client(KrakenClient::new(credentials)?)
    }

    /// Wrap a configured spot client.
    pub fn from_client(client: KrakenClient) -> ApiResult<Self> {
        if client.venue() != Venue::Kraken {
            return Err(ApiError::InvalidParameter(format!(
                "Kraken needs a spot client, got {}",
                client.venue()
            )));
        }
        Ok(Self {
            client,
            fee_reference_pair: DEFAULT_FEE_REFERENCE_PAIR.to_string(),
        })
    }

    /// Read the fee tier from another pair.
    pub fn with_fee_reference_pair(mut self, pair: impl Into<String>) -> Self {
        self.fee_reference_pair = pair.into();
        self
    }

    pub fn client(&self) -> &KrakenClient {
        &self.client
    }

    fn fallback_fees() -> Fees {
        let (maker, taker) = FALLBACK_FEES_PERCENT;
        Fees::from_percent(Decimal::new(maker, 2), Decimal::new(taker, 2))
    }

    async fn closed_order_fee(&self, txid: &str) -> ApiResult<Option<Decimal>> {
        let response = self.client.query_method("ClosedOrders").await?;
        let closed = field(&response["result"], "closed", "result.closed")?;
        match closed.get(txid) {
            Some(order) => Ok(Some(decimal(&order["fee"], "closed order fee")?)),
            None => Ok(None),
        }
    }
}

/// `result[pair]`, tolerating Kraken's renaming of pairs in responses
/// (`XRPEUR` is answered as `XXRPZEUR`).
fn pair_entry<'a>(result: &'a Value, pair: &str) -> ApiResult<&'a Value> {
    if let Some(entry) = result.get(pair) {
        return Ok(entry);
    }
    result
        .as_object()
        .and_then(|map| map.iter().find(|(key, _)| key.as_str() != "last"))
        .map(|(_, entry)| entry)
        .ok_or_else(|| ApiError::missing(format!("result for pair {}", pair)))
}

/// Nanosecond cursor as returned in `result.last`.
fn cursor_ns(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

#[async_trait]
impl Exchange for Kraken {
    fn name(&self) -> &'static str {
        "kraken"
    }

    async fn server_time(&self) -> ApiResult<f64> {
        let response = self.client.query_method("Time").await?;
        f64_from_value(&response["result"]["unixtime"]).ok_or_else(|| ApiError::missing("result.unixtime"))
    }

    async fn market_price(&self, pair: &str) -> ApiResult<Decimal> {
        let response = self
            .client
            .query("Ticker", Params::new().with("pair", pair))
            .await?;
        let ticker = pair_entry(&response["result"], pair)?;
        decimal(&ticker["c"][0], "last trade price")
    }

    async fn order_book(&self, pair: &str, depth: u32) -> ApiResult<OrderBook> {
        let response = self
            .client
            .query("Depth", Params::new().with("pair", pair).with("count", depth))
            .await?;
        let book = pair_entry(&response["result"], pair)?;
        Ok(OrderBook {
            asks: level_prices(&book["asks"], "asks")?,
            bids: level_prices(&book["bids"], "bids")?,
        })
    }

    async fn fees(&self) -> ApiResult<Fees> {
        let pair = self.fee_reference_pair.as_str();
        let response = match self
            .client
            .query("TradeVolume", Params::new().with("pair", pair))
            .await
        {
            Ok(response) => response,
            Err(e @ (ApiError::Auth(_) | ApiError::Connection { .. })) => {
                let fees = Self::fallback_fees();
                tracing::warn!(error = %e, maker = %fees.maker, taker = %fees.taker, "Using default Kraken fees");
                return Ok(fees);
            }
            Err(e) => return Err(e),
        };

        let result = &response["result"];
        let maker = decimal(&result["fees_maker"][pair]["fee"], "maker fee")?;
        let taker = decimal(&result["fees"][pair]["fee"], "taker fee")?;
        Ok(Fees::from_percent(maker, taker))
    }

    async fn place_order(
        &self,
        order: &OrderRequest,
        _fees: Fees,
        progress: &OrderProgress,
    ) -> ApiResult<OrderResult> {
        let payload = Params::new()
            .with("pair", &order.pair)
            .with("type", order.side.as_str())
            .with("ordertype", "limit")
            .with("price", order.price_str())
            .with("volume", order.volume_str());
        let response = self.client.query("AddOrder", payload).await?;

        let txid = match response["result"]["txid"][0].as_str() {
            Some(txid) => txid.to_string(),
            None => {
                progress.rejected(response.to_string());
                return Ok(OrderResult::rejected());
            }
        };
        progress.submitted(&txid);

        let txid_ref = txid.as_str();
        let fee = await_completion(&txid, progress, move || async move {
            self.closed_order_fee(txid_ref).await
        })
        .await?;

        progress.filled(&txid, fee);
        Ok(OrderResult::placed(fee))
    }

    async fn trades(&self, pair: &str, since: f64, until: f64) -> ApiResult<Vec<TradeRecord>> {
        let until_ns = until * 1e9;
        let mut cursor = (since * 1e9) as u64;
        let mut data = Vec::new();

        while (cursor as f64) < until_ns {
            let response = self
                .client
                .query("Trades", Params::new().with("pair", pair).with("since", cursor))
                .await?;
            let result = &response["result"];
            let trades = pair_entry(result, pair)?
                .as_array()
                .ok_or_else(|| ApiError::missing("trades"))?;

            for trade in trades {
                let timestamp =
                    f64_from_value(&trade[2]).ok_or_else(|| ApiError::missing("trade time"))?;
                data.push(TradeRecord::new(timestamp, decimal(&trade[0], "trade price")?));
            }

            let next = cursor_ns(field(result, "last", "result.last")?)
                .ok_or_else(|| ApiError::missing("result.last"))?;
            tracing::debug!(pair, cursor, next, page = trades.len(), "Kraken trades page");
            if trades.len() <= 1 || next <= cursor {
                break;
            }
            cursor = next;
        }

        data.retain(|t| t.timestamp >= since && t.timestamp <= until);
        Ok(data)
    }

    async fn native_ohlc(
        &self,
        pair: &str,
        interval_minutes: u32,
        since: Option<f64>,
    ) -> ApiResult<Option<Vec<Candle>>> {
        let payload = Params::new()
            .with("pair", pair)
            .with("interval", interval_minutes)
            .with_opt("since", since.map(|s| s as i64));
        let response = self.client.query("OHLC", payload).await?;

        let rows = pair_entry(&response["result"], pair)?
            .as_array()
            .ok_or_else(|| ApiError::missing("OHLC rows"))?;

        let mut candles = rows
            .iter()
            .map(|row| {
                let period_start = row[0]
                    .as_i64()
                    .or_else(|| f64_from_value(&row[0]).and_then(|t| i64::from_f64(t.floor())))
                    .ok_or_else(|| ApiError::missing("OHLC time"))?;
                Ok(Candle {
                    period_start,
                    open: decimal(&row[1], "OHLC open")?,
                    high: decimal(&row[2], "OHLC high")?,
                    low: decimal(&row[3], "OHLC low")?,
                    close: decimal(&row[4], "OHLC close")?,
                })
            })
            .collect::<ApiResult<Vec<_>>>()?;
        candles.sort_by_key(|c| c.period_start);

        Ok(Some(candles))
    }
}
