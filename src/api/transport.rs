//! Outbound HTTP seam.
//!
//! The executor talks to a [`Transport`]; production code uses
//! [`ReqwestTransport`], tests can substitute a scripted implementation.

use std::fmt;

use async_trait::async_trait;

use crate::api::error::ApiResult;
use crate::auth::Headers;
use crate::shared::Params;

/// HTTP verb. GET sends parameters in the query string; the others send a
/// form-encoded body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Whether parameters travel in the query string.
    pub fn uses_query(&self) -> bool {
        matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully prepared request (already signed when private).
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub verb: HttpVerb,
    pub url: String,
    pub params: Params,
    pub headers: Headers,
}

impl HttpRequest {
    /// URL including the query string for GET requests.
    pub fn full_url(&self) -> String {
        if self.verb.uses_query() && !self.params.is_empty() {
            format!("{}?{}", self.url, self.params.encode())
        } else {
            self.url.clone()
        }
    }

    /// Form body for non-GET requests.
    pub fn body(&self) -> Option<String> {
        if self.verb.uses_query() {
            None
        } else {
            Some(self.params.encode())
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }
}

/// Sends one prepared request and returns the raw response.
///
/// Non-2xx statuses are returned as responses, not errors; classification is
/// the executor's job.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse>;
}

#[cfg(feature = "http")]
pub use reqwest_transport::ReqwestTransport;

#[cfg(feature = "http")]
mod reqwest_transport {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
    use reqwest::{Client, Method};

    use super::{HttpRequest, HttpResponse, HttpVerb, Transport};
    use crate::api::error::{ApiError, ApiResult};
    use crate::api::retry::RetryConfig;

    /// [`Transport`] over a pooled `reqwest` client with transport-level retries.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: Client,
        retry_config: RetryConfig,
    }

    impl ReqwestTransport {
        /// Build a transport with the given timeout, user agent and retry policy.
        pub fn new(timeout: Duration, user_agent: &str, retry_config: RetryConfig) -> ApiResult<Self> {
            let mut headers = HeaderMap::new();
            let agent = HeaderValue::from_str(user_agent).map_err(|e| {
                ApiError::InvalidParameter(format!("Invalid user agent '{}': {}", user_agent, e))
            })?;
            headers.insert(USER_AGENT, agent);

            let client = Client::builder()
                .timeout(timeout)
                .pool_max_idle_per_host(10)
                .default_headers(headers)
                .build()?;

            Ok(Self {
                client,
                retry_config,
            })
        }

        fn method(verb: HttpVerb) -> Method {
            match verb {
                HttpVerb::Get => Method::GET,
                HttpVerb::Post => Method::POST,
                HttpVerb::Put => Method::PUT,
                HttpVerb::Delete => Method::DELETE,
            }
        }

        fn build(&self, request: &HttpRequest) -> ApiResult<reqwest::RequestBuilder> {
            let mut builder = self
                .client
                .request(Self::method(request.verb), request.full_url());

            for (name, value) in &request.headers {
                let header_name = HeaderName::try_from(name.as_str()).map_err(|e| {
                    ApiError::InvalidParameter(format!("Invalid header name '{}': {}", name, e))
                })?;
                let header_value = HeaderValue::from_str(value).map_err(|e| {
                    ApiError::InvalidParameter(format!("Invalid header value for '{}': {}", name, e))
                })?;
                builder = builder.header(header_name, header_value);
            }

            if let Some(body) = request.body() {
                builder = builder
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(body);
            }

            Ok(builder)
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
            let mut attempt = 0;

            loop {
                let result = self.build(&request)?.send().await;

                match result {
                    Ok(response) => {
                        let status = response.status().as_u16();

                        if attempt < self.retry_config.max_retries
                            && self.retry_config.is_retryable_status(status)
                        {
                            let delay = self.retry_config.delay_for_attempt(attempt);
                            tracing::debug!(
                                attempt = attempt + 1,
                                max_retries = self.retry_config.max_retries,
                                delay_ms = delay.as_millis() as u64,
                                status,
                                url = %request.url,
                                "Retrying request after gateway error"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            continue;
                        }

                        let body = response.text().await?;
                        return Ok(HttpResponse { status, body });
                    }
                    Err(e) => {
                        let is_retryable = e.is_connect() || e.is_timeout();

                        if attempt < self.retry_config.max_retries && is_retryable {
                            let delay = self.retry_config.delay_for_attempt(attempt);
                            tracing::debug!(
                                attempt = attempt + 1,
                                max_retries = self.retry_config.max_retries,
                                delay_ms = delay.as_millis() as u64,
                                error = %e,
                                "Retrying request after network error"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            continue;
                        }

                        return Err(ApiError::Http(e));
                    }
                }
            }
        }
    }

}
