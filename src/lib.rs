//! # Kestrel
//!
//! A Rust SDK for the Kraken, Kraken Futures and Binance REST APIs.
//!
//! ## Modules
//!
//! - [`api`]: low-level clients (method allow-lists, signing, retries)
//! - [`exchange`]: a unified trading layer with simulated or live orders,
//!   fee bookkeeping and OHLC candles
//! - [`auth`]: credentials and request signing
//!
//! Plus a shared module:
//! - [`shared`]: shared utilities, types, and constants
//!
//! ## Quick Start - Low-Level Client
//!
//! ```rust,ignore
//! use kestrel::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = KrakenClient::new(Credentials::from_env(Venue::Kraken))?;
//!
//!     let balance = client.query_method("Balance").await?;
//!     println!("{}", balance["result"]);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Quick Start - Trading Session
//!
//! ```rust,ignore
//! use kestrel::prelude::*;
//! use rust_decimal_macros::dec;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let binance = Binance::new(Credentials::from_env(Venue::Binance))?;
//!     let mut session = ExchangeSession::connect(binance, true).await?;
//!     let mut events = session.subscribe();
//!     tokio::spawn(async move {
//!         while let Some(event) = events.recv().await {
//!             println!("{:?}", event);
//!         }
//!     });
//!
//!     let price = session.market_price("XRPEUR").await?;
//!     let result = session.buy("XRPEUR", dec!(20), price).await?;
//!     println!("placed: {}, fee: {:?}", result.placed, result.fee);
//!
//!     let candles = session.ohlc("XRPEUR", 5, None).await?;
//!     println!("{} candles", candles.len());
//!
//!     Ok(())
//! }
//! ```

// ============================================================================
// MODULES
// ============================================================================

/// Shared utilities, types, and constants.
/// Used across all SDK modules.
pub mod shared;

/// Network URL constants.
pub mod network;

/// Credentials, clocks and request signing.
pub mod auth;

/// Low-level REST clients.
pub mod api;

/// Unified trading layer.
pub mod exchange;

// ============================================================================
// PRELUDE
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use kestrel::prelude::*;
/// ```
pub mod prelude {
    // API module exports
    pub use crate::api::{
        ApiError, ApiResult, BinanceClient, BinanceClientBuilder, HttpVerb, KrakenClient,
        KrakenClientBuilder, RetryConfig, Transport,
    };

    // Exchange module exports
    pub use crate::exchange::{
        Binance, Candle, Exchange, ExchangeSession, Fees, Kraken, KrakenFutures, OrderBook,
        OrderEvent, OrderRequest, OrderResult, TradeRecord,
    };

    // Auth module exports
    pub use crate::auth::{AuthError, AuthResult, Clock, Credentials, FixedClock, SystemClock};

    // Network constants
    pub use crate::network::{BINANCE_API_URL, KRAKEN_API_URL, KRAKEN_FUTURES_API_URL};

    // Shared types
    pub use crate::shared::{Params, Side, Venue};
}
