//! Kraken spot and Kraken Futures REST client.
//!
//! Both venues share one method registry. Spot splits paths into
//! `/0/public/<method>` and `/0/private/<method>`; Futures uses a flat
//! `/api/v3/<method>` namespace and distinguishes reads from writes by verb.

use std::sync::Arc;

use serde_json::Value;

use crate::api::client::{ensure_venue, BuildClient, ClientBuilder, ClientParts};
use crate::api::error::{ApiError, ApiResult};
use crate::api::executor::{ErrorConvention, RequestExecutor};
use crate::api::registry::{MethodCategory, KRAKEN_METHODS};
use crate::api::transport::HttpVerb;
use crate::auth::{sign_kraken, sign_kraken_futures, AuthError, Clock, Credentials};
use crate::shared::{Params, Venue};

/// Builder alias for [`KrakenClient`].
pub type KrakenClientBuilder = ClientBuilder<KrakenClient>;

/// Low-level client for Kraken and Kraken Futures.
///
/// Without a key/secret pair only public methods can be called.
#[derive(Debug, Clone)]
pub struct KrakenClient {
    base_url: String,
    credentials: Credentials,
    executor: RequestExecutor,
    clock: Arc<dyn Clock>,
}

impl BuildClient for KrakenClient {
    fn from_parts(parts: ClientParts) -> ApiResult<Self> {
        ensure_venue(
            &parts.credentials,
            &[Venue::Kraken, Venue::KrakenFutures],
            "KrakenClient",
        )?;

        let convention = match parts.credentials.venue {
            Venue::KrakenFutures => ErrorConvention::KrakenFutures,
            _ => ErrorConvention::KrakenSpot,
        };

        Ok(Self {
            base_url: parts.base_url,
            credentials: parts.credentials,
            executor: RequestExecutor::new(parts.transport, convention),
            clock: parts.clock,
        })
    }
}

impl KrakenClient {
    /// Create a client with default settings.
    pub fn new(credentials: Credentials) -> ApiResult<Self> {
        Self::builder(credentials).build()
    }

    /// Create a new client builder for custom configuration.
    pub fn builder(credentials: Credentials) -> KrakenClientBuilder {
        ClientBuilder::new(credentials)
    }

    pub fn venue(&self) -> Venue {
        self.credentials.venue
    }

    pub fn is_futures(&self) -> bool {
        self.credentials.venue == Venue::KrakenFutures
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.has_keys()
    }

    /// URL path (sans host) for a method of the given category.
    pub fn endpoint_path(&self, method: &str, category: MethodCategory) -> String {
        let version = self.venue().api_version();
        if self.is_futures() {
            return format!("{}{}", version, method);
        }
        match category {
            MethodCategory::Public => format!("{}public/{}", version, method),
            _ => format!("{}private/{}", version, method),
        }
    }

    /// Perform an API query.
    ///
    /// Private methods are signed; spot requests get a fresh `nonce`
    /// parameter on every attempt.
    pub async fn query(&self, method: &str, data: Params) -> ApiResult<Value> {
        let category = KRAKEN_METHODS.resolve(method)?;
        if category.is_private() && !self.credentials.has_keys() {
            return Err(ApiError::Auth(AuthError::MissingCredentials));
        }

        let path = self.endpoint_path(method, category);
        let url = format!("{}{}", self.base_url, path);
        let verb = match category {
            MethodCategory::PrivateWrite => HttpVerb::Post,
            _ => HttpVerb::Get,
        };

        tracing::debug!(venue = %self.venue(), method, verb = %verb, "Kraken query");

        let futures = self.is_futures();
        let credentials = &self.credentials;
        let clock = self.clock.as_ref();
        let mut data = data;

        self.executor
            .execute(verb, &url, || {
                let headers = match (category.is_private(), futures) {
                    (false, _) => Vec::new(),
                    (true, true) => sign_kraken_futures(&data, &path, credentials, clock)?,
                    (true, false) => sign_kraken(&mut data, &path, credentials, clock)?,
                };
                Ok((data.clone(), headers))
            })
            .await
    }

    /// Query without parameters.
    pub async fn query_method(&self, method: &str) -> ApiResult<Value> {
        self.query(method, Params::new()).await
    }
}
