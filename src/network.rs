//! Network URL constants for the supported venues.

/// Kraken spot REST API base URL.
pub const KRAKEN_API_URL: &str = "https://api.kraken.com";

/// Kraken Futures REST API base URL.
pub const KRAKEN_FUTURES_API_URL: &str = "https://futures.kraken.com/derivatives";

/// Binance spot REST API base URL.
pub const BINANCE_API_URL: &str = "https://api.binance.com";

/// Path prefix for Kraken spot endpoints.
pub const KRAKEN_API_VERSION: &str = "/0/";

/// Path prefix shared by Kraken Futures and Binance endpoints.
pub const V3_API_VERSION: &str = "/api/v3/";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("kestrel/", env!("CARGO_PKG_VERSION"));
