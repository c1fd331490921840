//! Binance spot REST client.

use std::sync::Arc;

use serde_json::Value;

use crate::api::client::{ensure_venue, BuildClient, ClientBuilder, ClientParts};
use crate::api::error::{ApiError, ApiResult};
use crate::api::executor::{ErrorConvention, RequestExecutor};
use crate::api::registry::{BINANCE_KEY_ONLY, BINANCE_METHODS};
use crate::api::transport::HttpVerb;
use crate::auth::{binance_key_header, sign_binance, AuthError, Clock, Credentials};
use crate::shared::{Params, Venue};

/// Builder alias for [`BinanceClient`].
pub type BinanceClientBuilder = ClientBuilder<BinanceClient>;

/// Low-level client for Binance spot.
///
/// Signed requests on one client (and its clones) are serialized so that
/// timestamps reach the server in the order they were generated.
#[derive(Debug, Clone)]
pub struct BinanceClient {
    base_url: String,
    credentials: Credentials,
    executor: RequestExecutor,
    clock: Arc<dyn Clock>,
}

impl BuildClient for BinanceClient {
    fn from_parts(parts: ClientParts) -> ApiResult<Self> {
        ensure_venue(&parts.credentials, &[Venue::Binance], "BinanceClient")?;

        Ok(Self {
            base_url: parts.base_url,
            credentials: parts.credentials,
            executor: RequestExecutor::new(parts.transport, ErrorConvention::Binance)
                .with_nonce_lock(),
            clock: parts.clock,
        })
    }
}

impl BinanceClient {
    /// Create a client with default settings.
    pub fn new(credentials: Credentials) -> ApiResult<Self> {
        Self::builder(credentials).build()
    }

    /// Create a new client builder for custom configuration.
    pub fn builder(credentials: Credentials) -> BinanceClientBuilder {
        ClientBuilder::new(credentials)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.has_keys()
    }

    /// Perform an API query against `/api/v3/<endpoint>`.
    ///
    /// Key-only endpoints carry the `X-MBX-APIKEY` header; signed endpoints
    /// additionally get `recvWindow`, `timestamp` and `signature`, regenerated
    /// on every attempt. `data` itself is never modified.
    pub async fn query(&self, verb: HttpVerb, endpoint: &str, data: Params) -> ApiResult<Value> {
        let category = BINANCE_METHODS.resolve(endpoint)?;
        if category.is_private() && !self.credentials.has_keys() {
            return Err(ApiError::Auth(AuthError::MissingCredentials));
        }

        let url = format!("{}{}{}", self.base_url, Venue::Binance.api_version(), endpoint);
        let key_only = BINANCE_KEY_ONLY.contains(&endpoint);

        tracing::debug!(endpoint, verb = %verb, signed = category.is_private() && !key_only, "Binance query");

        let credentials = &self.credentials;
        let clock = self.clock.as_ref();

        self.executor
            .execute(verb, &url, || {
                if !category.is_private() {
                    return Ok((data.clone(), Vec::new()));
                }
                let headers = binance_key_header(credentials)?;
                if key_only {
                    Ok((data.clone(), headers))
                } else {
                    Ok((sign_binance(&data, credentials, clock)?, headers))
                }
            })
            .await
    }

    /// GET without parameters.
    pub async fn get(&self, endpoint: &str) -> ApiResult<Value> {
        self.query(HttpVerb::Get, endpoint, Params::new()).await
    }
}
