//! Shared type definitions used by the API clients and the exchange layer.

use serde::{Deserialize, Serialize};

use crate::network::{
    BINANCE_API_URL, KRAKEN_API_URL, KRAKEN_API_VERSION, KRAKEN_FUTURES_API_URL, V3_API_VERSION,
};

// ============================================================================
// Venue
// ============================================================================

/// A supported trading venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    /// Kraken spot.
    Kraken,
    /// Kraken Futures (derivatives).
    KrakenFutures,
    /// Binance spot.
    Binance,
}

impl Venue {
    /// Default REST base URL.
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Kraken => KRAKEN_API_URL,
            Self::KrakenFutures => KRAKEN_FUTURES_API_URL,
            Self::Binance => BINANCE_API_URL,
        }
    }

    /// Versioned path prefix, including leading and trailing slashes.
    pub fn api_version(&self) -> &'static str {
        match self {
            Self::Kraken => KRAKEN_API_VERSION,
            Self::KrakenFutures | Self::Binance => V3_API_VERSION,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kraken => "kraken",
            Self::KrakenFutures => "kraken_futures",
            Self::Binance => "binance",
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Side
// ============================================================================

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Lowercase wire form used by Kraken and Kraken Futures.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// Uppercase wire form used by Binance.
    pub fn as_upper_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
