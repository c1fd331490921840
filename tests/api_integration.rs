//! Integration tests for the venue REST clients.
//!
//! Requests go through a scripted in-memory transport. For live API tests,
//! enable the `live_tests` feature.

mod common;

use std::time::Duration;

use common::*;
use kestrel::api::*;
use kestrel::auth::{binance_signature, kraken_signature, AuthError, Credentials};
use kestrel::shared::{Params, Venue};
use serde_json::json;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

// =============================================================================
// Validation (no network)
// =============================================================================

mod validation {
    use super::*;

    #[test]
    fn test_unknown_method_lists_registry() {
        let mock = MockTransport::new();
        let client = kraken_client(&mock, kraken_credentials());

        let err = assert_err!(tokio_test::block_on(client.query_method("toto")));
        let message = err.to_string();
        assert!(message.starts_with("Method toto does not exist. Can only be one of: "));
        assert!(message.contains("AddOrder"));
        assert!(message.contains("sendorder"));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_private_methods_need_keys_before_network() {
        let mock = MockTransport::new();
        let kraken = kraken_client(&mock, Credentials::public(Venue::Kraken));
        let futures = kraken_client(&mock, Credentials::public(Venue::KrakenFutures));
        let binance = binance_client(&mock, Credentials::public(Venue::Binance));

        for method in ["Balance", "TradeVolume", "AddOrder", "ClosedOrders"] {
            let err = kraken.query_method(method).await.unwrap_err();
            assert!(matches!(err, ApiError::Auth(AuthError::MissingCredentials)), "{}", method);
        }
        for method in ["fills", "sendorder", "openpositions"] {
            let err = futures.query_method(method).await.unwrap_err();
            assert!(matches!(err, ApiError::Auth(AuthError::MissingCredentials)), "{}", method);
        }
        for endpoint in ["order", "openOrders", "historicalTrades"] {
            let err = binance.get(endpoint).await.unwrap_err();
            assert!(matches!(err, ApiError::Auth(AuthError::MissingCredentials)), "{}", endpoint);
        }

        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_builder_without_transport_uses_reqwest() {
        let client = KrakenClient::builder(Credentials::public(Venue::Kraken))
            .timeout_secs(30)
            .user_agent("kestrel-tests")
            .with_retry(RetryConfig::disabled())
            .build();
        assert_ok!(client);
    }

    #[test]
    fn test_clients_are_shareable() {
        fn check<T: Send + Sync + Clone>() {}
        check::<KrakenClient>();
        check::<BinanceClient>();
    }
}

// =============================================================================
// Kraken spot
// =============================================================================

mod kraken_spot {
    use super::*;

    #[tokio::test]
    async fn test_public_query_is_unsigned_get() {
        let mock = MockTransport::new();
        mock.push_json(json!({"error": [], "result": {"XXRPZEUR": {"c": ["0.51200", "25.0"]}}}));
        let client = kraken_client(&mock, kraken_credentials());

        let response = client
            .query("Ticker", Params::new().with("pair", "XXRPZEUR"))
            .await
            .unwrap();
        assert_eq!(response["result"]["XXRPZEUR"]["c"][0], "0.51200");

        let request = mock.last_request();
        assert_eq!(request.verb, HttpVerb::Get);
        assert_eq!(request.full_url(), "https://api.kraken.com/0/public/Ticker?pair=XXRPZEUR");
        assert!(request.headers.is_empty());
    }

    #[tokio::test]
    async fn test_private_query_is_signed_post_with_nonce() {
        let mock = MockTransport::new();
        mock.push_json(json!({"error": [], "result": {"ZEUR": "100.0"}}));
        let client = kraken_client(&mock, kraken_credentials());

        client
            .query("Balance", Params::new().with("asset", "ZEUR"))
            .await
            .unwrap();

        let request = mock.last_request();
        assert_eq!(request.verb, HttpVerb::Post);
        assert_eq!(request.url, "https://api.kraken.com/0/private/Balance");
        assert_eq!(request.params.get("nonce"), Some(NOW_MS.to_string().as_str()));

        let body = request.body().unwrap();
        assert_eq!(body, format!("asset=ZEUR&nonce={}", NOW_MS));
        let expected = kraken_signature("/0/private/Balance", NOW_MS, &body, KRAKEN_SECRET).unwrap();
        assert_eq!(request.header("API-Key"), Some("kraken-key"));
        assert_eq!(request.header("API-Sign"), Some(expected.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_after_four_attempts() {
        let mock = MockTransport::always(json!({"error": ["EAPI:Rate limit exceeded"]}));
        let client = kraken_client(&mock, kraken_credentials());
        let start = Instant::now();

        let err = client
            .query("Ticker", Params::new().with("pair", "XXRPZEUR"))
            .await
            .unwrap_err();

        assert_eq!(mock.request_count(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(6));
        match err {
            ApiError::Connection { attempts, error, url, params } => {
                assert_eq!(attempts, 4);
                assert_eq!(error, "EAPI:Rate limit exceeded");
                assert_eq!(url, "https://api.kraken.com/0/public/Ticker");
                assert_eq!(params, "{pair: XXRPZEUR}");
            }
            other => panic!("expected Connection, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_errors() {
        let mock = MockTransport::new();
        mock.push_json(json!({"error": ["EGeneral:Temporary lockout"]}))
            .push_json(json!({"error": ["EAPI:Rate limit exceeded"]}))
            .push_json(json!({"error": [], "result": {"unixtime": 1616492376}}));
        let client = kraken_client(&mock, kraken_credentials());
        let start = Instant::now();

        let response = client.query_method("Time").await.unwrap();

        assert_eq!(response["result"]["unixtime"], 1616492376);
        assert_eq!(mock.request_count(), 3);
        // 0 s after the first failure, 2 s after the second
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_gets_a_fresh_nonce() {
        let mock = MockTransport::new();
        mock.push_json(json!({"error": ["EAPI:Invalid nonce"]}))
            .push_json(json!({"error": [], "result": {}}));
        let client = KrakenClient::builder(kraken_credentials())
            .transport(mock.clone())
            .clock(TickingClock::starting_at(1000))
            .build()
            .unwrap();

        client.query_method("Balance").await.unwrap();

        let nonces: Vec<String> = mock
            .requests()
            .iter()
            .map(|r| r.params.get("nonce").unwrap().to_string())
            .collect();
        assert_eq!(nonces, ["1000", "1001"]);
        // the nonce is replaced in place, not appended twice
        assert_eq!(mock.requests()[1].params.len(), 1);
    }

    #[tokio::test]
    async fn test_http_status_is_not_retried() {
        let mock = MockTransport::new();
        mock.push(503, "<html>Service Unavailable</html>");
        let client = kraken_client(&mock, kraken_credentials());

        let err = client.query_method("Time").await.unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(mock.request_count(), 1);

        mock.push(404, r#"{"error": []}"#);
        let err = client.query_method("Time").await.unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus { status: 404, .. }));
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_json_on_success_status() {
        let mock = MockTransport::new();
        mock.push(200, "not json");
        let client = kraken_client(&mock, kraken_credentials());

        let err = client.query_method("Time").await.unwrap_err();
        assert!(matches!(err, ApiError::Deserialize(_)));
    }

    #[tokio::test]
    async fn test_invalid_secret_fails_before_network() {
        let mock = MockTransport::new();
        let client = kraken_client(&mock, Credentials::new(Venue::Kraken, "key", "%%%"));

        let err = client.query_method("Balance").await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::InvalidSecret(_))));
        assert_eq!(mock.request_count(), 0);
    }
}

// =============================================================================
// Kraken Futures
// =============================================================================

mod futures_client {
    use super::*;

    #[tokio::test]
    async fn test_signed_write_uses_flat_namespace_and_header_nonce() {
        let mock = MockTransport::new();
        mock.push_json(json!({"result": "success", "sendStatus": {"status": "placed"}}));
        let client = kraken_client(&mock, futures_credentials());

        client
            .query("sendorder", Params::new().with("symbol", "pi_xrpusd"))
            .await
            .unwrap();

        let request = mock.last_request();
        assert_eq!(request.verb, HttpVerb::Post);
        assert_eq!(
            request.url,
            "https://futures.kraken.com/derivatives/api/v3/sendorder"
        );
        assert!(!request.params.contains_key("nonce"));
        assert_eq!(request.header("APIKey"), Some("futures-key"));
        assert_eq!(request.header("Nonce"), Some(NOW_MS.to_string().as_str()));
        assert!(request.header("Authent").is_some());
    }

    #[tokio::test]
    async fn test_private_read_is_signed_get() {
        let mock = MockTransport::new();
        mock.push_json(json!({"result": "success", "fills": []}));
        let client = kraken_client(&mock, futures_credentials());

        client.query_method("fills").await.unwrap();

        let request = mock.last_request();
        assert_eq!(request.verb, HttpVerb::Get);
        assert_eq!(request.url, "https://futures.kraken.com/derivatives/api/v3/fills");
        assert!(request.header("Authent").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsuccessful_result_is_retried() {
        let mock = MockTransport::always(json!({"result": "error", "error": "apiLimitExceeded"}));
        let client = kraken_client(&mock, futures_credentials());

        let err = client.query_method("tickers").await.unwrap_err();
        assert!(err.is_connection());
        assert!(err.to_string().starts_with("apiLimitExceeded"));
        assert_eq!(mock.request_count(), 4);
    }
}

// =============================================================================
// Binance
// =============================================================================

mod binance_spot {
    use super::*;

    #[tokio::test]
    async fn test_signed_order_carries_timestamp_and_signature() {
        let mock = MockTransport::new();
        mock.push_json(json!({"symbol": "LTCBTC", "clientOrderId": "6gCrw2kRUAF9CvJDGP16IP"}));
        let client = binance_client(&mock, binance_credentials());

        let params = Params::new()
            .with("symbol", "LTCBTC")
            .with("side", "BUY")
            .with("type", "LIMIT")
            .with("timeInForce", "GTC")
            .with("quantity", 1)
            .with("price", "0.1");
        client.query(HttpVerb::Post, "order", params.clone()).await.unwrap();

        let request = mock.last_request();
        assert_eq!(request.url, "https://api.binance.com/api/v3/order");
        assert_eq!(request.header("X-MBX-APIKEY"), Some(BINANCE_KEY));
        assert_eq!(request.params.get("recvWindow"), Some("5000"));
        assert_eq!(request.params.get("timestamp"), Some(NOW_MS.to_string().as_str()));

        let unsigned: Params = request
            .params
            .iter()
            .filter(|(k, _)| *k != "signature")
            .collect();
        let expected = binance_signature(&unsigned.encode(), BINANCE_SECRET).unwrap();
        assert_eq!(request.params.get("signature"), Some(expected.as_str()));
        assert_eq!(params.len(), 6);
    }

    #[tokio::test]
    async fn test_key_only_endpoint_is_not_signed() {
        let mock = MockTransport::new();
        mock.push_json(json!([]));
        let client = binance_client(&mock, binance_credentials());

        client
            .query(
                HttpVerb::Get,
                "historicalTrades",
                Params::new().with("symbol", "XRPEUR").with("fromId", 10),
            )
            .await
            .unwrap();

        let request = mock.last_request();
        assert_eq!(request.header("X-MBX-APIKEY"), Some(BINANCE_KEY));
        assert!(!request.params.contains_key("signature"));
        assert!(!request.params.contains_key("timestamp"));
        assert_eq!(
            request.full_url(),
            "https://api.binance.com/api/v3/historicalTrades?symbol=XRPEUR&fromId=10"
        );
    }

    #[tokio::test]
    async fn test_public_endpoint_has_no_auth() {
        let mock = MockTransport::new();
        mock.push_json(json!({"serverTime": 1499827319559u64}));
        let client = binance_client(&mock, binance_credentials());

        let response = client.get("time").await.unwrap();
        assert_eq!(response["serverTime"], 1499827319559u64);
        assert!(mock.last_request().headers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_code_is_retried() {
        let mock = MockTransport::new();
        mock.push_json(json!({"code": -1003, "msg": "Too many requests."}))
            .push_json(json!({"symbol": "XRPEUR", "price": "0.51"}));
        let client = binance_client(&mock, binance_credentials());

        let response = client
            .query(HttpVerb::Get, "ticker/price", Params::new().with("symbol", "XRPEUR"))
            .await
            .unwrap();
        assert_eq!(response["price"], "0.51");
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_signed_requests_are_serialized() {
        let mock = MockTransport::slow(json!([]), Duration::from_millis(250));
        let client = BinanceClient::builder(binance_credentials())
            .transport(mock.clone())
            .clock(JournalClock::new(&mock, NOW_MS))
            .build()
            .unwrap();

        let (a, b) = (client.clone(), client.clone());
        let (ra, rb) = tokio::join!(
            a.query(HttpVerb::Get, "openOrders", Params::new()),
            b.query(HttpVerb::Get, "allOrders", Params::new().with("symbol", "XRPEUR")),
        );
        assert_ok!(ra);
        assert_ok!(rb);

        assert_eq!(mock.max_in_flight(), 1);
        assert_eq!(
            mock.journal(),
            vec![
                format!("sign {}", NOW_MS),
                "send https://api.binance.com/api/v3/openOrders".to_string(),
                "done".to_string(),
                format!("sign {}", NOW_MS + 1),
                "send https://api.binance.com/api/v3/allOrders".to_string(),
                "done".to_string(),
            ]
        );

        let timestamps: Vec<String> = mock
            .requests()
            .iter()
            .map(|r| r.params.get("timestamp").unwrap().to_string())
            .collect();
        assert_eq!(timestamps, [NOW_MS.to_string(), (NOW_MS + 1).to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_kraken_requests_may_overlap() {
        let mock = MockTransport::slow(json!({"error": [], "result": {}}), Duration::from_millis(250));
        let client = kraken_client(&mock, kraken_credentials());

        let (ra, rb) = tokio::join!(client.query_method("Time"), client.query_method("Assets"));
        assert_ok!(ra);
        assert_ok!(rb);
        assert_eq!(mock.max_in_flight(), 2);
    }
}

// =============================================================================
// Live API Tests
// =============================================================================

#[cfg(feature = "live_tests")]
mod live_tests {
    use super::*;

    #[tokio::test]
    async fn test_live_kraken_time() {
        let client = KrakenClient::new(Credentials::public(Venue::Kraken)).unwrap();
        let result = client.query_method("Time").await;
        assert!(result.is_ok(), "Time failed: {:?}", result);
    }

    #[tokio::test]
    async fn test_live_binance_time() {
        let client = BinanceClient::new(Credentials::public(Venue::Binance)).unwrap();
        let result = client.get("time").await;
        assert!(result.is_ok(), "time failed: {:?}", result);
    }

    #[tokio::test]
    async fn test_live_kraken_balance() {
        let credentials = Credentials::from_env(Venue::Kraken);
        if !credentials.has_keys() {
            println!("Skipping live test: KESTREL_API_KEY / KESTREL_API_SECRET not set");
            return;
        }
        let client = KrakenClient::new(credentials).unwrap();
        let result = client.query_method("Balance").await;
        assert!(result.is_ok(), "Balance failed: {:?}", result);
    }
}
