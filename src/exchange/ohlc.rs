//! Trade to candle aggregation.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};

/// One executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Unix time in seconds.
    pub timestamp: f64,
    pub price: Decimal,
}

impl TradeRecord {
    pub fn new(timestamp: f64, price: Decimal) -> Self {
        Self { timestamp, price }
    }
}

/// Open/high/low/close over one fixed-width period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix time in seconds, a multiple of the period width.
    pub period_start: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl Candle {
    /// A candle whose four fields are all `price`.
    pub fn flat(period_start: i64, price: Decimal) -> Self {
        Self {
            period_start,
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    fn update(&mut self, price: Decimal) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }
}

/// Upper bound on the candles one aggregation may produce, gap fill included.
pub const MAX_CANDLES: usize = 1_000_000;

/// Reject a zero-width candle interval.
pub fn check_interval(interval_minutes: u32) -> ApiResult<()> {
    if interval_minutes == 0 {
        return Err(ApiError::InvalidParameter(
            "interval must be at least one minute".to_string(),
        ));
    }
    Ok(())
}

fn out_of_range(timestamp: f64) -> ApiError {
    ApiError::InvalidParameter(format!("trade timestamp {} out of range", timestamp))
}

/// Start of the `width`-second bucket holding `timestamp`.
fn bucket_start(timestamp: f64, width: i64) -> ApiResult<i64> {
    i64::from_f64((timestamp / width as f64).floor())
        .and_then(|index| index.checked_mul(width))
        .ok_or_else(|| out_of_range(timestamp))
}

/// Bucket ascending `trades` into `interval_minutes` candles.
///
/// Periods between the first and last trade that saw no trades are emitted
/// flat at the previous close. Trades are never reordered: out-of-order
/// input is rejected, as is a span needing more than [`MAX_CANDLES`].
pub fn aggregate(trades: &[TradeRecord], interval_minutes: u32) -> ApiResult<Vec<Candle>> {
    check_interval(interval_minutes)?;
    if let Some(bad) = trades.iter().find(|t| !t.timestamp.is_finite()) {
        return Err(ApiError::InvalidParameter(format!(
            "invalid trade timestamp {}",
            bad.timestamp
        )));
    }
    if trades.windows(2).any(|w| w[1].timestamp < w[0].timestamp) {
        return Err(ApiError::InvalidParameter(
            "trades must be sorted by ascending timestamp".to_string(),
        ));
    }

    let width = i64::from(interval_minutes) * 60;
    let mut candles: Vec<Candle> = Vec::new();

    for trade in trades {
        let start = bucket_start(trade.timestamp, width)?;

        match candles.last().map(|c| (c.period_start, c.close)) {
            Some((current, _)) if current == start => {
                if let Some(candle) = candles.last_mut() {
                    candle.update(trade.price);
                }
            }
            Some((current, close)) => {
                let buckets = start
                    .checked_sub(current)
                    .map(|span| span / width)
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| out_of_range(trade.timestamp))?;
                if candles.len().saturating_add(buckets) > MAX_CANDLES {
                    return Err(ApiError::InvalidParameter(format!(
                        "more than {} candles of {} minutes",
                        MAX_CANDLES, interval_minutes
                    )));
                }
                // start - current fits in i64, so every gap start does too
                let mut gap = current + width;
                while gap < start {
                    candles.push(Candle::flat(gap, close));
                    gap += width;
                }
                candles.push(Candle::flat(start, trade.price));
            }
            None => candles.push(Candle::flat(start, trade.price)),
        }
    }

    Ok(candles)
}
