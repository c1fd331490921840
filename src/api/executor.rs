//! Request executor: one logical API call with business-error retries.
//!
//! Each attempt rebuilds (and re-signs) the request through a `prepare`
//! closure, so nonces and timestamps are always taken at send time.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::api::error::{ApiError, ApiResult};
use crate::api::retry::{backoff_for_attempt, MAX_API_ATTEMPTS};
use crate::api::transport::{HttpRequest, HttpVerb, Transport};
use crate::auth::Headers;
use crate::shared::Params;

/// Statuses treated as success once the body carries no business error.
pub const ACCEPTED_STATUSES: [u16; 3] = [200, 201, 202];

/// How a venue reports errors inside a JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorConvention {
    /// `{"error": [...], "result": ...}`; a non-empty `error` array is a failure.
    KrakenSpot,
    /// `{"result": "success" | "error", "error": "..."}`.
    KrakenFutures,
    /// `{"code": -1121, "msg": "..."}` on failure.
    Binance,
}

impl ErrorConvention {
    /// The error message carried by `body`, if any.
    pub fn classify(&self, body: &Value) -> Option<String> {
        match self {
            ErrorConvention::KrakenSpot => match body.get("error") {
                Some(Value::Array(errors)) if !errors.is_empty() => Some(
                    errors
                        .iter()
                        .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
                _ => None,
            },
            ErrorConvention::KrakenFutures => {
                if body.get("result").and_then(Value::as_str) == Some("success") {
                    return None;
                }
                Some(match body.get("error") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => format!("unsuccessful result: {}", body),
                })
            }
            ErrorConvention::Binance => {
                let code = body.get("code")?;
                Some(match body.get("msg").and_then(Value::as_str) {
                    Some(msg) => format!("{} (code {})", msg, code),
                    None => format!("code {}", code),
                })
            }
        }
    }
}

/// Sends prepared requests through a [`Transport`] and applies the retry schedule.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    convention: ErrorConvention,
    nonce_lock: Option<Arc<Mutex<()>>>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, convention: ErrorConvention) -> Self {
        Self {
            transport,
            convention,
            nonce_lock: None,
        }
    }

    /// Serialize sign-and-dispatch across callers sharing this executor.
    ///
    /// The lock is held from signing until the response body is read, so
    /// the server observes nonces in the order they were generated.
    pub fn with_nonce_lock(mut self) -> Self {
        self.nonce_lock = Some(Arc::new(Mutex::new(())));
        self
    }

    pub fn convention(&self) -> ErrorConvention {
        self.convention
    }

    /// Execute one API call.
    ///
    /// `prepare` is invoked once per attempt and returns the final
    /// parameters and headers for that attempt.
    pub async fn execute<F>(&self, verb: HttpVerb, url: &str, mut prepare: F) -> ApiResult<Value>
    where
        F: FnMut() -> ApiResult<(Params, Headers)> + Send,
    {
        let mut attempt = 0;
        let mut last_error = String::new();
        let mut last_params = Params::new();

        while attempt < MAX_API_ATTEMPTS {
            let response = {
                let _guard = match &self.nonce_lock {
                    Some(lock) => Some(lock.lock().await),
                    None => None,
                };
                let (params, headers) = prepare()?;
                last_params = params.clone();
                let request = HttpRequest {
                    verb,
                    url: url.to_string(),
                    params,
                    headers,
                };
                self.transport.send(request).await?
            };

            let body: Value = match serde_json::from_str(&response.body) {
                Ok(body) => body,
                Err(e) if ACCEPTED_STATUSES.contains(&response.status) => {
                    return Err(ApiError::Deserialize(format!(
                        "Failed to deserialize response: {}",
                        e
                    )));
                }
                Err(_) => {
                    return Err(ApiError::HttpStatus {
                        status: response.status,
                        body: response.body,
                    });
                }
            };

            if let Some(error) = self.convention.classify(&body) {
                let delay = backoff_for_attempt(attempt);
                tracing::debug!(
                    attempt = attempt + 1,
                    max_attempts = MAX_API_ATTEMPTS,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    url,
                    "Retrying request after API error"
                );
                tokio::time::sleep(delay).await;
                last_error = error;
                attempt += 1;
                continue;
            }

            if !ACCEPTED_STATUSES.contains(&response.status) {
                return Err(ApiError::HttpStatus {
                    status: response.status,
                    body: response.body,
                });
            }

            return Ok(body);
        }

        tracing::warn!(attempts = attempt, error = %last_error, url, "API retries exhausted");
        Err(ApiError::Connection {
            attempts: attempt,
            error: last_error,
            url: url.to_string(),
            params: last_params.to_string(),
        })
    }
}
