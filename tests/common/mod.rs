//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kestrel::api::{ApiError, ApiResult, BinanceClient, HttpRequest, HttpResponse, KrakenClient, Transport};
use kestrel::auth::{AuthResult, Clock, Credentials, FixedClock};
use kestrel::shared::Venue;
use serde_json::Value;

pub const NOW_MS: u64 = 1_616_492_376_594;

// Documented example secrets (Kraken REST guide, Binance API docs).
pub const KRAKEN_SECRET: &str =
    "kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==";
pub const BINANCE_KEY: &str = "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A";
pub const BINANCE_SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";

/// Replays queued responses in order, then `fallback` forever if set.
///
/// With a `latency`, `send` sleeps before answering so that concurrent
/// callers interleave. Dispatch and completion are written to the journal.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    fallback: Option<HttpResponse>,
    latency: Option<Duration>,
    requests: Mutex<Vec<HttpRequest>>,
    journal: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every request with `body`.
    pub fn always(body: Value) -> Arc<Self> {
        Arc::new(Self {
            fallback: Some(HttpResponse::ok(body.to_string())),
            ..Default::default()
        })
    }

    /// Answer every request with `body` after `latency`.
    pub fn slow(body: Value, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            fallback: Some(HttpResponse::ok(body.to_string())),
            latency: Some(latency),
            ..Default::default()
        })
    }

    pub fn push(&self, status: u16, body: impl Into<String>) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(HttpResponse::new(status, body));
        self
    }

    pub fn push_json(&self, body: Value) -> &Self {
        self.push(200, body.to_string())
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request sent")
    }

    pub fn note(&self, entry: impl Into<String>) {
        self.journal.lock().unwrap().push(entry.into());
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    /// Most requests ever awaiting a response at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        self.note(format!("send {}", request.url));
        self.requests.lock().unwrap().push(request);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.note("done");

        let next = self.responses.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| ApiError::Transport("no scripted response left".to_string()))
    }
}

/// Clock that advances one millisecond per reading.
#[derive(Debug)]
pub struct TickingClock(pub AtomicU64);

impl TickingClock {
    pub fn starting_at(ms: u64) -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(ms)))
    }
}

impl Clock for TickingClock {
    fn now_millis(&self) -> AuthResult<u64> {
        Ok(self.0.fetch_add(1, Ordering::SeqCst))
    }
}

/// Ticking clock that writes every reading to a transport's journal.
#[derive(Debug)]
pub struct JournalClock {
    ticks: AtomicU64,
    transport: Arc<MockTransport>,
}

impl JournalClock {
    pub fn new(transport: &Arc<MockTransport>, ms: u64) -> Arc<Self> {
        Arc::new(Self {
            ticks: AtomicU64::new(ms),
            transport: transport.clone(),
        })
    }
}

impl Clock for JournalClock {
    fn now_millis(&self) -> AuthResult<u64> {
        let now = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.transport.note(format!("sign {}", now));
        Ok(now)
    }
}

pub fn kraken_credentials() -> Credentials {
    Credentials::new(Venue::Kraken, "kraken-key", KRAKEN_SECRET)
}

pub fn futures_credentials() -> Credentials {
    Credentials::new(Venue::KrakenFutures, "futures-key", KRAKEN_SECRET)
}

pub fn binance_credentials() -> Credentials {
    Credentials::new(Venue::Binance, BINANCE_KEY, BINANCE_SECRET)
}

pub fn kraken_client(mock: &Arc<MockTransport>, credentials: Credentials) -> KrakenClient {
    KrakenClient::builder(credentials)
        .transport(mock.clone())
        .clock(Arc::new(FixedClock(NOW_MS)))
        .build()
        .unwrap()
}

pub fn binance_client(mock: &Arc<MockTransport>, credentials: Credentials) -> BinanceClient {
    BinanceClient::builder(credentials)
        .transport(mock.clone())
        .clock(Arc::new(FixedClock(NOW_MS)))
        .build()
        .unwrap()
}
