//! Shared client configuration and builder.
//!
//! # Example
//!
//! ```rust,ignore
//! use kestrel::api::KrakenClient;
//! use kestrel::auth::Credentials;
//! use kestrel::shared::Venue;
//! use std::time::Duration;
//!
//! let client = KrakenClient::builder(Credentials::from_env(Venue::Kraken))
//!     .timeout(Duration::from_secs(20))
//!     .build()?;
//! ```

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::api::error::{ApiError, ApiResult};
use crate::api::retry::RetryConfig;
use crate::api::transport::Transport;
use crate::auth::{Clock, Credentials, SystemClock};
use crate::network::{DEFAULT_TIMEOUT_SECS, USER_AGENT};

/// Everything a concrete client needs once configuration is resolved.
#[derive(Debug, Clone)]
pub struct ClientParts {
    pub base_url: String,
    pub credentials: Credentials,
    pub transport: Arc<dyn Transport>,
    pub clock: Arc<dyn Clock>,
}

/// A client type constructible from a [`ClientBuilder`].
pub trait BuildClient: Sized {
    fn from_parts(parts: ClientParts) -> ApiResult<Self>;
}

/// Builder for configuring a venue client.
#[derive(Debug, Clone)]
pub struct ClientBuilder<C> {
    credentials: Credentials,
    base_url: Option<String>,
    timeout: Duration,
    user_agent: String,
    retry_config: RetryConfig,
    transport: Option<Arc<dyn Transport>>,
    clock: Arc<dyn Clock>,
    _client: PhantomData<fn() -> C>,
}

impl<C: BuildClient> ClientBuilder<C> {
    /// Create a new builder for the given credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
            retry_config: RetryConfig::default(),
            transport: None,
            clock: Arc::new(SystemClock),
            _client: PhantomData,
        }
    }

    /// Override the venue's default base URL (e.g. a conformance environment).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Transport-level retry policy (ignored when a custom transport is set).
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Use a custom transport instead of the default `reqwest` one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Source of nonces and timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn into_parts(self) -> ApiResult<ClientParts> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport(self.timeout, &self.user_agent, self.retry_config)?,
        };

        Ok(ClientParts {
            base_url: self
                .base_url
                .unwrap_or_else(|| self.credentials.venue.base_url().to_string()),
            credentials: self.credentials,
            transport,
            clock: self.clock,
        })
    }

    /// Build the client.
    pub fn build(self) -> ApiResult<C> {
        C::from_parts(self.into_parts()?)
    }
}

#[cfg(feature = "http")]
fn default_transport(
    timeout: Duration,
    user_agent: &str,
    retry_config: RetryConfig,
) -> ApiResult<Arc<dyn Transport>> {
    let transport = crate::api::transport::ReqwestTransport::new(timeout, user_agent, retry_config)?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "http"))]
fn default_transport(
    _timeout: Duration,
    _user_agent: &str,
    _retry_config: RetryConfig,
) -> ApiResult<Arc<dyn Transport>> {
    Err(ApiError::InvalidParameter(
        "no transport configured; enable the `http` feature or pass one to the builder".to_string(),
    ))
}

/// Reject credentials meant for another venue family.
pub(crate) fn ensure_venue(
    credentials: &Credentials,
    accepted: &[crate::shared::Venue],
    client: &str,
) -> ApiResult<()> {
    if accepted.contains(&credentials.venue) {
        Ok(())
    } else {
        Err(ApiError::InvalidParameter(format!(
            "{} cannot be built for venue {}",
            client, credentials.venue
        )))
    }
}
