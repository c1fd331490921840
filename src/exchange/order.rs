//! Order requests, results, fee rates and order progress reporting.

use std::future::Future;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::api::error::ApiResult;
use crate::shared::Side;

/// Sleep before every completion poll of a live order.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A limit order to place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub pair: String,
    pub side: Side,
    pub volume: Decimal,
    pub price: Decimal,
}

impl OrderRequest {
    pub fn new(pair: impl Into<String>, side: Side, volume: Decimal, price: Decimal) -> Self {
        Self {
            pair: pair.into(),
            side,
            volume,
            price,
        }
    }

    /// `volume * price`, in quote currency.
    pub fn notional(&self) -> Decimal {
        self.volume * self.price
    }

    /// Limit price as sent on the wire (at most 10 decimals).
    pub fn price_str(&self) -> String {
        self.price.round_dp(10).normalize().to_string()
    }

    /// Volume as sent on the wire.
    pub fn volume_str(&self) -> String {
        self.volume.normalize().to_string()
    }
}

/// Outcome of a buy or sell. A rejected order never carries a fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub placed: bool,
    pub fee: Option<Decimal>,
}

impl OrderResult {
    pub fn placed(fee: Decimal) -> Self {
        Self {
            placed: true,
            fee: Some(fee),
        }
    }

    pub fn rejected() -> Self {
        Self {
            placed: false,
            fee: None,
        }
    }
}

/// Maker and taker fee rates as fractions (`0.0026` is 0.26 %).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fees {
    pub maker: Decimal,
    pub taker: Decimal,
}

impl Fees {
    pub fn new(maker: Decimal, taker: Decimal) -> Self {
        Self { maker, taker }
    }

    /// Build from percentages as venues report them (`0.26` is 0.26 %).
    pub fn from_percent(maker: Decimal, taker: Decimal) -> Self {
        let hundred = Decimal::ONE_HUNDRED;
        Self::new(maker / hundred, taker / hundred)
    }

    /// Rate applied to an order: buys pay taker, sells pay maker.
    pub fn rate(&self, side: Side) -> Decimal {
        match side {
            Side::Buy => self.taker,
            Side::Sell => self.maker,
        }
    }

    /// Fee for `order` at these rates.
    pub fn fee_for(&self, order: &OrderRequest) -> Decimal {
        order.notional() * self.rate(order.side)
    }
}

/// Order lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    /// The venue accepted the order.
    Submitted { venue: &'static str, order_id: String },
    /// The venue refused the order; terminal.
    Rejected { venue: &'static str, reason: String },
    /// A completion poll found the order still open.
    Pending { order_id: String, polls: u32 },
    /// The order completed; terminal.
    Filled { order_id: String, fee: Decimal },
}

/// Sink for [`OrderEvent`]s of one order.
///
/// Every event is also logged; the channel is optional.
#[derive(Debug, Clone)]
pub struct OrderProgress {
    venue: &'static str,
    sender: Option<mpsc::UnboundedSender<OrderEvent>>,
}

impl OrderProgress {
    pub fn new(venue: &'static str, sender: Option<mpsc::UnboundedSender<OrderEvent>>) -> Self {
        Self { venue, sender }
    }

    /// Log-only progress.
    pub fn silent(venue: &'static str) -> Self {
        Self::new(venue, None)
    }

    pub fn venue(&self) -> &'static str {
        self.venue
    }

    fn emit(&self, event: OrderEvent) {
        if let Some(sender) = &self.sender {
            // a dropped receiver just means nobody is listening
            let _ = sender.send(event);
        }
    }

    pub fn submitted(&self, order_id: &str) {
        tracing::info!(venue = self.venue, order_id, "Order submitted");
        self.emit(OrderEvent::Submitted {
            venue: self.venue,
            order_id: order_id.to_string(),
        });
    }

    pub fn rejected(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(venue = self.venue, reason = %reason, "Cannot place order");
        self.emit(OrderEvent::Rejected {
            venue: self.venue,
            reason,
        });
    }

    pub fn pending(&self, order_id: &str, polls: u32) {
        tracing::debug!(venue = self.venue, order_id, polls, "Order not completed yet");
        self.emit(OrderEvent::Pending {
            order_id: order_id.to_string(),
            polls,
        });
    }

    pub fn filled(&self, order_id: &str, fee: Decimal) {
        tracing::info!(venue = self.venue, order_id, fee = %fee, "Order completed");
        self.emit(OrderEvent::Filled {
            order_id: order_id.to_string(),
            fee,
        });
    }
}

/// Poll until `poll` yields a value, sleeping [`POLL_INTERVAL`] before each poll.
///
/// There is no upper bound on the number of polls; drop the future to stop
/// waiting. Errors from `poll` are returned as-is.
pub async fn await_completion<T, F, Fut>(
    order_id: &str,
    progress: &OrderProgress,
    mut poll: F,
) -> ApiResult<T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ApiResult<Option<T>>> + Send,
{
    let mut polls = 0;
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        polls += 1;
        if let Some(done) = poll().await? {
            return Ok(done);
        }
        progress.pending(order_id, polls);
    }
}
