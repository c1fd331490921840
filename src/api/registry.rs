//! Per-venue method allow-lists.

use crate::api::error::ApiError;

/// Which allow-list a method belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodCategory {
    /// No authentication.
    Public,
    /// Authenticated, read-only (sent as GET on Kraken).
    PrivateRead,
    /// Authenticated, signed POST (Kraken) or state-changing (Binance).
    PrivateWrite,
}

impl MethodCategory {
    pub fn is_private(&self) -> bool {
        !matches!(self, MethodCategory::Public)
    }
}

/// Three disjoint sets of method names for one venue.
#[derive(Debug, Clone, Copy)]
pub struct MethodRegistry {
    pub public: &'static [&'static str],
    pub private_read: &'static [&'static str],
    pub private_write: &'static [&'static str],
}

impl MethodRegistry {
    /// Category of `method`, if it is known.
    pub fn category(&self, method: &str) -> Option<MethodCategory> {
        if self.public.contains(&method) {
            Some(MethodCategory::Public)
        } else if self.private_read.contains(&method) {
            Some(MethodCategory::PrivateRead)
        } else if self.private_write.contains(&method) {
            Some(MethodCategory::PrivateWrite)
        } else {
            None
        }
    }

    /// Like [`category`](Self::category) but fails with [`ApiError::InvalidMethod`].
    pub fn resolve(&self, method: &str) -> Result<MethodCategory, ApiError> {
        self.category(method).ok_or_else(|| ApiError::InvalidMethod {
            method: method.to_string(),
            valid: self.all(),
        })
    }

    /// Every known method name, sorted.
    pub fn all(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .public
            .iter()
            .chain(self.private_read)
            .chain(self.private_write)
            .map(|m| m.to_string())
            .collect();
        all.sort();
        all
    }
}

/// Kraken spot and Kraken Futures methods. Futures names are lowercase.
pub const KRAKEN_METHODS: MethodRegistry = MethodRegistry {
    public: &[
        "Time",
        "Assets",
        "AssetPairs",
        "Ticker",
        "OHLC",
        "Depth",
        "Trades",
        "Spread",
        // Futures
        "instruments",
        "tickers",
        "orderbook",
        "history",
    ],
    private_read: &[
        // Futures
        "accounts",
        "openorders",
        "fills",
        "openpositions",
        "transfers",
        "notifications",
        "historicorders",
        "recentorders",
    ],
    private_write: &[
        "Balance",
        "BalanceEx",
        "TradeBalance",
        "OpenOrders",
        "ClosedOrders",
        "QueryOrders",
        "TradesHistory",
        "QueryTrades",
        "OpenPositions",
        "Ledgers",
        "QueryLedgers",
        "TradeVolume",
        "AddExport",
        "ExportStatus",
        "RetrieveExport",
        "RemoveExport",
        "GetWebSocketsToken",
        "AddOrder",
        "CancelOrder",
        "CancelAll",
        // Futures
        "transfer",
        "sendorder",
        "cancelorder",
        "cancelallorders",
        "cancelallordersafter",
        "batchorder",
        "withdrawal",
    ],
};

/// Binance spot endpoints.
pub const BINANCE_METHODS: MethodRegistry = MethodRegistry {
    public: &[
        "ping",
        "time",
        "exchangeInfo",
        "depth",
        "trades",
        "aggTrades",
        "avgPrice",
        "ticker/24hr",
        "ticker/price",
        "ticker/bookTicker",
    ],
    private_read: &["historicalTrades", "openOrders", "allOrders"],
    private_write: &["order/test", "order"],
};

/// Binance endpoints that take the API key header but no signature.
pub const BINANCE_KEY_ONLY: &[&str] = &["historicalTrades"];
