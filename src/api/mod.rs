//! Low-level REST clients for Kraken, Kraken Futures and Binance.
//!
//! Each client validates method names against a per-venue allow-list,
//! signs private requests and runs them through a [`RequestExecutor`] that
//! retries business errors on a fixed schedule.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use kestrel::api::{KrakenClient, BinanceClient, HttpVerb};
//! use kestrel::auth::Credentials;
//! use kestrel::shared::{Params, Venue};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let kraken = KrakenClient::new(Credentials::public(Venue::Kraken))?;
//!     let ticker = kraken
//!         .query("Ticker", Params::new().with("pair", "XXRPZEUR"))
//!         .await?;
//!     println!("{}", ticker["result"]["XXRPZEUR"]["c"][0]);
//!
//!     let binance = BinanceClient::new(Credentials::public(Venue::Binance))?;
//!     let time = binance.query(HttpVerb::Get, "time", Params::new()).await?;
//!     println!("{}", time["serverTime"]);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All methods return `ApiResult<T>`, an alias for `Result<T, ApiError>`:
//!
//! ```rust,ignore
//! use kestrel::api::ApiError;
//!
//! match kraken.query_method("Balance").await {
//!     Ok(balance) => println!("{}", balance),
//!     Err(ApiError::Auth(e)) => println!("Not authenticated: {}", e),
//!     Err(ApiError::Connection { attempts, error, .. }) => {
//!         println!("Gave up after {} attempts: {}", attempts, error)
//!     }
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```

pub mod binance;
pub mod client;
pub mod error;
pub mod executor;
pub mod kraken;
pub mod registry;
pub mod retry;
pub mod transport;

// Re-export main types for convenience
pub use binance::{BinanceClient, BinanceClientBuilder};
pub use client::{BuildClient, ClientBuilder, ClientParts};
pub use error::{ApiError, ApiResult};
pub use executor::{ErrorConvention, RequestExecutor, ACCEPTED_STATUSES};
pub use kraken::{KrakenClient, KrakenClientBuilder};
pub use registry::{MethodCategory, MethodRegistry, BINANCE_KEY_ONLY, BINANCE_METHODS, KRAKEN_METHODS};
pub use retry::{backoff_for_attempt, RetryConfig, BACKOFF_SCHEDULE, MAX_API_ATTEMPTS};
pub use transport::{HttpRequest, HttpResponse, HttpVerb, Transport};

#[cfg(feature = "http")]
pub use transport::ReqwestTransport;
