//! Unified trading layer over the venue clients.
//!
//! An [`Exchange`] implementation maps one venue's endpoints onto a common
//! capability set. [`ExchangeSession`] adds the shared behaviour: simulated
//! or live buys and sells, fee bookkeeping and OHLC data.
//!
//! # Example
//!
//! ```rust,ignore
//! use kestrel::exchange::{ExchangeSession, Kraken};
//! use rust_decimal_macros::dec;
//!
//! let kraken = Kraken::new(Credentials::from_env(Venue::Kraken))?;
//! let mut session = ExchangeSession::connect(kraken, false).await?;
//!
//! let price = session.market_price("XXRPZEUR").await?;
//! session.buy("XXRPZEUR", dec!(50), price).await?;
//! println!("fees so far: {}", session.total_fee());
//! ```

pub mod binance;
pub mod kraken;
pub mod kraken_futures;
pub mod ohlc;
pub mod order;

pub use binance::Binance;
pub use kraken::{Kraken, DEFAULT_FEE_REFERENCE_PAIR};
pub use kraken_futures::KrakenFutures;
pub use ohlc::{aggregate, check_interval, Candle, TradeRecord, MAX_CANDLES};
pub use order::{
    await_completion, Fees, OrderEvent, OrderProgress, OrderRequest, OrderResult, POLL_INTERVAL,
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::api::error::{ApiError, ApiResult};
use crate::shared::Side;

/// Default window for [`ExchangeSession::ohlc_from_trades`] (seconds).
pub const DEFAULT_TRADES_WINDOW_SECS: f64 = 12.0 * 3600.0;

/// Top of an order book, prices only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub asks: Vec<Decimal>,
    pub bids: Vec<Decimal>,
}

impl OrderBook {
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().copied()
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().copied()
    }
}

/// Venue capabilities used by [`ExchangeSession`].
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Short venue name used in logs and events.
    fn name(&self) -> &'static str;

    /// Server time, Unix seconds.
    async fn server_time(&self) -> ApiResult<f64>;

    /// Last traded price of `pair`.
    async fn market_price(&self, pair: &str) -> ApiResult<Decimal>;

    /// Maker and taker rates for the account.
    async fn fees(&self) -> ApiResult<Fees>;

    /// Place a limit order and wait until the venue reports it complete.
    async fn place_order(
        &self,
        order: &OrderRequest,
        fees: Fees,
        progress: &OrderProgress,
    ) -> ApiResult<OrderResult>;

    /// Trades between `since` and `until` (Unix seconds), in any order.
    async fn trades(&self, pair: &str, since: f64, until: f64) -> ApiResult<Vec<TradeRecord>>;

    /// Top `depth` levels of the book.
    async fn order_book(&self, _pair: &str, _depth: u32) -> ApiResult<OrderBook> {
        Err(ApiError::Unsupported {
            venue: self.name(),
            operation: "order_book",
        })
    }

    /// Candles from a venue endpoint, or `None` when the venue has none.
    async fn native_ohlc(
        &self,
        _pair: &str,
        _interval_minutes: u32,
        _since: Option<f64>,
    ) -> ApiResult<Option<Vec<Candle>>> {
        Ok(None)
    }
}

/// Trading session over one venue.
///
/// Tracks the fees paid and the number of completed buys and sells. When not
/// live, orders are simulated locally and never reach the venue.
#[derive(Debug)]
pub struct ExchangeSession<E: Exchange> {
    exchange: E,
    live: bool,
    fees: Fees,
    total_fee: Decimal,
    buy_count: u32,
    sell_count: u32,
    events: Option<mpsc::UnboundedSender<OrderEvent>>,
}

impl<E: Exchange> ExchangeSession<E> {
    /// Open a session, fetching the fee schedule from the venue.
    pub async fn connect(exchange: E, live: bool) -> ApiResult<Self> {
        let fees = exchange.fees().await?;
        tracing::debug!(
            venue = exchange.name(),
            live,
            maker = %fees.maker,
            taker = %fees.taker,
            "Session opened"
        );
        Ok(Self::with_fees(exchange, live, fees))
    }

    /// Open a session with known fee rates, without contacting the venue.
    pub fn with_fees(exchange: E, live: bool, fees: Fees) -> Self {
        Self {
            exchange,
            live,
            fees,
            total_fee: Decimal::ZERO,
            buy_count: 0,
            sell_count: 0,
            events: None,
        }
    }

    /// Receive [`OrderEvent`]s for live orders placed from now on.
    ///
    /// A later call replaces the previous subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<OrderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn fees(&self) -> Fees {
        self.fees
    }

    pub fn maker_fee(&self) -> Decimal {
        self.fees.maker
    }

    pub fn taker_fee(&self) -> Decimal {
        self.fees.taker
    }

    /// Fees paid over the session.
    pub fn total_fee(&self) -> Decimal {
        self.total_fee
    }

    pub fn buy_count(&self) -> u32 {
        self.buy_count
    }

    pub fn sell_count(&self) -> u32 {
        self.sell_count
    }

    /// Zero the fee total. Counters are kept.
    pub fn reset_total_fee(&mut self) {
        self.total_fee = Decimal::ZERO;
    }

    /// Buy `volume` of `pair` at limit `price`.
    pub async fn buy(&mut self, pair: &str, volume: Decimal, price: Decimal) -> ApiResult<OrderResult> {
        self.order(OrderRequest::new(pair, Side::Buy, volume, price)).await
    }

    /// Sell `volume` of `pair` at limit `price`.
    pub async fn sell(&mut self, pair: &str, volume: Decimal, price: Decimal) -> ApiResult<OrderResult> {
        self.order(OrderRequest::new(pair, Side::Sell, volume, price)).await
    }

    async fn order(&mut self, request: OrderRequest) -> ApiResult<OrderResult> {
        tracing::info!(
            venue = self.exchange.name(),
            side = %request.side,
            pair = %request.pair,
            volume = %request.volume,
            price = %request.price,
            notional = %request.notional(),
            live = self.live,
            "Placing order"
        );

        let result = if self.live {
            let progress = OrderProgress::new(self.exchange.name(), self.events.clone());
            self.exchange.place_order(&request, self.fees, &progress).await?
        } else {
            OrderResult::placed(self.fees.fee_for(&request))
        };

        if result.placed {
            self.total_fee += result.fee.unwrap_or(Decimal::ZERO);
            match request.side {
                Side::Buy => self.buy_count += 1,
                Side::Sell => self.sell_count += 1,
            }
        }

        Ok(result)
    }

    pub async fn server_time(&self) -> ApiResult<f64> {
        self.exchange.server_time().await
    }

    pub async fn market_price(&self, pair: &str) -> ApiResult<Decimal> {
        self.exchange.market_price(pair).await
    }

    pub async fn order_book(&self, pair: &str, depth: u32) -> ApiResult<OrderBook> {
        self.exchange.order_book(pair, depth).await
    }

    /// Trades between `since` and `until`, sorted by ascending timestamp.
    pub async fn trade_history(&self, pair: &str, since: f64, until: f64) -> ApiResult<Vec<TradeRecord>> {
        let mut trades = self.exchange.trades(pair, since, until).await?;
        trades.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(trades)
    }

    /// Candles from the venue's own endpoint when it has one, else built from trades.
    pub async fn ohlc(
        &self,
        pair: &str,
        interval_minutes: u32,
        since: Option<f64>,
    ) -> ApiResult<Vec<Candle>> {
        check_interval(interval_minutes)?;
        if let Some(candles) = self
            .exchange
            .native_ohlc(pair, interval_minutes, since)
            .await?
        {
            return Ok(candles);
        }
        self.ohlc_from_trades(pair, interval_minutes, since, None).await
    }

    /// Candles built from raw trades.
    ///
    /// `until` defaults to the server time and `since` to twelve hours before
    /// `until`. Slow over long windows since every trade is fetched.
    pub async fn ohlc_from_trades(
        &self,
        pair: &str,
        interval_minutes: u32,
        since: Option<f64>,
        until: Option<f64>,
    ) -> ApiResult<Vec<Candle>> {
        check_interval(interval_minutes)?;
        let until = match until {
            Some(until) => until,
            None => self.exchange.server_time().await?,
        };
        let since = since.unwrap_or(until - DEFAULT_TRADES_WINDOW_SECS);

        let trades = self.trade_history(pair, since, until).await?;
        tracing::debug!(venue = self.exchange.name(), pair, count = trades.len(), "Aggregating trades");
        aggregate(&trades, interval_minutes)
    }

    /// End the session, releasing the venue client and its connection pool.
    pub fn close(self) {
        tracing::debug!(
            venue = self.exchange.name(),
            total_fee = %self.total_fee,
            buys = self.buy_count,
            sells = self.sell_count,
            "Session closed"
        );
    }
}

// ============================================================================
// Response helpers shared by the venue implementations
// ============================================================================

/// `value[key]`, or an [`ApiError::UnexpectedResponse`] naming `what`.
pub(crate) fn field<'a>(value: &'a serde_json::Value, key: &str, what: &str) -> ApiResult<&'a serde_json::Value> {
    value.get(key).ok_or_else(|| ApiError::missing(what))
}

/// Decimal from a JSON string or number.
pub(crate) fn decimal(value: &serde_json::Value, what: &str) -> ApiResult<Decimal> {
    crate::shared::decimal_from_value(value).ok_or_else(|| ApiError::missing(what))
}

/// First-column prices of `[[price, volume, ...], ...]` book levels.
pub(crate) fn level_prices(levels: &serde_json::Value, what: &str) -> ApiResult<Vec<Decimal>> {
    levels
        .as_array()
        .ok_or_else(|| ApiError::missing(what))?
        .iter()
        .map(|level| decimal(&level[0], what))
        .collect()
}
