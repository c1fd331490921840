//! Request authentication for the supported venues.
//!
//! # Signing schemes
//!
//! - **Kraken spot**: a millisecond nonce is written into the request
//!   parameters, then `HMAC-SHA512(path || SHA256(nonce || body))` keyed with
//!   the base64-decoded secret. Headers `API-Key` / `API-Sign`.
//! - **Kraken Futures**: `HMAC-SHA512(SHA256(body || nonce || path))`, nonce
//!   travels in a header. Headers `APIKey` / `Nonce` / `Authent`.
//! - **Binance**: `recvWindow` and `timestamp` are appended to a *copy* of the
//!   parameters, then a hex `HMAC-SHA256(query, secret)` is appended as
//!   `signature`. Header `X-MBX-APIKEY`.
//!
//! The Kraken spot signer mutates the caller's parameters because the nonce
//! must appear identically in the signature and the request body. The Binance
//! signer never does.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

use crate::shared::{Params, Venue};

/// Environment variable holding the API key for [`Credentials::from_env`].
pub const API_KEY_ENV: &str = "KESTREL_API_KEY";

/// Environment variable holding the API secret for [`Credentials::from_env`].
pub const API_SECRET_ENV: &str = "KESTREL_API_SECRET";

/// Binance receive window added to signed requests that do not set one (ms).
pub const BINANCE_RECV_WINDOW_MS: u64 = 5000;

/// Authentication-specific errors
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// A private method was called on a client without key/secret
    #[error("Need API keys to connect")]
    MissingCredentials,

    /// The secret could not be decoded or used as an HMAC key
    #[error("Invalid API secret: {0}")]
    InvalidSecret(String),

    /// System time error (before UNIX epoch)
    #[error("System time error: {0}")]
    SystemTime(String),
}

/// Result type alias for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Header list produced by a signer.
pub type Headers = Vec<(String, String)>;

// ============================================================================
// Credentials
// ============================================================================

/// API credentials for one client instance.
///
/// Without a key/secret pair only public methods can be called.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub venue: Venue,
}

impl Credentials {
    /// Public-only credentials for a venue.
    pub fn public(venue: Venue) -> Self {
        Self {
            api_key: None,
            api_secret: None,
            venue,
        }
    }

    /// Credentials with a key/secret pair.
    pub fn new(venue: Venue, api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            api_secret: Some(api_secret.into()),
            venue,
        }
    }

    /// Read `KESTREL_API_KEY` / `KESTREL_API_SECRET` from the environment.
    ///
    /// Missing or empty variables leave the corresponding field unset.
    pub fn from_env(venue: Venue) -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            api_key: read(API_KEY_ENV),
            api_secret: read(API_SECRET_ENV),
            venue,
        }
    }

    /// Whether both key and secret are present.
    pub fn has_keys(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }

    /// Key and secret, or [`AuthError::MissingCredentials`].
    pub fn keys(&self) -> AuthResult<(&str, &str)> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => Ok((key, secret)),
            _ => Err(AuthError::MissingCredentials),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("venue", &self.venue)
            .finish()
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Source of nonces and timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current Unix time in milliseconds.
    fn now_millis(&self) -> AuthResult<u64>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> AuthResult<u64> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthError::SystemTime("System time before UNIX epoch".to_string()))?;
        Ok(elapsed.as_millis() as u64)
    }
}

/// A clock frozen at a given instant, for reproducible signatures.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> AuthResult<u64> {
        Ok(self.0)
    }
}

// ============================================================================
// Kraken
// ============================================================================

/// Raw Kraken signature over an already-encoded body.
///
/// `message` is the byte string hashed with SHA-256 before HMAC-SHA512;
/// `prefix` is prepended to the digest (the URL path on spot, empty on Futures).
fn kraken_hmac(prefix: &[u8], message: &[u8], secret: &str) -> AuthResult<String> {
    let key = BASE64
        .decode(secret)
        .map_err(|e| AuthError::InvalidSecret(e.to_string()))?;

    let digest = Sha256::digest(message);
    let mut mac = Hmac::<Sha512>::new_from_slice(&key)
        .map_err(|e| AuthError::InvalidSecret(e.to_string()))?;
    mac.update(prefix);
    mac.update(&digest);

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Kraken spot `API-Sign` value for a path, nonce and encoded POST body.
pub fn kraken_signature(path: &str, nonce: u64, postdata: &str, secret: &str) -> AuthResult<String> {
    let message = format!("{}{}", nonce, postdata);
    kraken_hmac(path.as_bytes(), message.as_bytes(), secret)
}

/// Kraken Futures `Authent` value for an encoded body, nonce and path.
pub fn kraken_futures_signature(
    postdata: &str,
    nonce: u64,
    path: &str,
    secret: &str,
) -> AuthResult<String> {
    let message = format!("{}{}{}", postdata, nonce, path);
    kraken_hmac(&[], message.as_bytes(), secret)
}

/// Sign a Kraken spot request.
///
/// Writes the fresh nonce into `params` and returns the auth headers. The
/// same `params` must be sent as the request body.
pub fn sign_kraken(
    params: &mut Params,
    path: &str,
    credentials: &Credentials,
    clock: &dyn Clock,
) -> AuthResult<Headers> {
    let (key, secret) = credentials.keys()?;
    let nonce = clock.now_millis()?;
    params.insert("nonce", nonce);

    let signature = kraken_signature(path, nonce, &params.encode(), secret)?;

    Ok(vec![
        ("API-Key".to_string(), key.to_string()),
        ("API-Sign".to_string(), signature),
    ])
}

/// Sign a Kraken Futures request. `params` is left untouched.
pub fn sign_kraken_futures(
    params: &Params,
    path: &str,
    credentials: &Credentials,
    clock: &dyn Clock,
) -> AuthResult<Headers> {
    let (key, secret) = credentials.keys()?;
    let nonce = clock.now_millis()?;

    let signature = kraken_futures_signature(&params.encode(), nonce, path, secret)?;

    Ok(vec![
        ("APIKey".to_string(), key.to_string()),
        ("Nonce".to_string(), nonce.to_string()),
        ("Authent".to_string(), signature),
    ])
}

// ============================================================================
// Binance
// ============================================================================

/// Hex `HMAC-SHA256(message, secret)`.
pub fn binance_signature(message: &str, secret: &str) -> AuthResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| AuthError::InvalidSecret(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// `X-MBX-APIKEY` header for key-only and signed Binance endpoints.
pub fn binance_key_header(credentials: &Credentials) -> AuthResult<Headers> {
    let (key, _) = credentials.keys()?;
    Ok(vec![("X-MBX-APIKEY".to_string(), key.to_string())])
}

/// Sign a Binance request, returning the extended copy of `params`.
pub fn sign_binance(
    params: &Params,
    credentials: &Credentials,
    clock: &dyn Clock,
) -> AuthResult<Params> {
    let (_, secret) = credentials.keys()?;

    let mut signed = params.clone();
    if !signed.contains_key("recvWindow") {
        signed.insert("recvWindow", BINANCE_RECV_WINDOW_MS);
    }
    signed.insert("timestamp", clock.now_millis()?);

    let signature = binance_signature(&signed.encode(), secret)?;
    signed.insert("signature", signature);

    Ok(signed)
}
