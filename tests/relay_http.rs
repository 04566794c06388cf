//! end-to-end tests against a real relay bound to a loopback port

use altimeter_relay::client::{ClientError, RelayClient, UploadQueue};
use altimeter_relay::domain::epoch_ms;
use altimeter_relay::{server, AppState, AuthGate, IngestToken, LatestReadingStore, Reading};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const TOKEN: &str = "test-ingest-token";

async fn spawn_relay() -> String {
    let state = AppState::new(
        Arc::new(LatestReadingStore::new()),
        AuthGate::new(IngestToken::new(TOKEN).unwrap()),
    );
    let router = server::build_router(state, Duration::from_secs(5));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(server::serve(listener, router, std::future::pending()));
    format!("http://{}", addr)
}

fn reading(seq: i64) -> Reading {
    Reading {
        device_id: "d1".to_string(),
        timestamp_ms: 1000 * seq,
        relative_altitude_m: 1.2,
        pressure_kpa: 101.3,
        vertical_gain_m: 0.5,
        net_change_m: 0.1,
        seq,
        battery_level: None,
        is_charging: None,
        app_version: None,
    }
}

fn scenario_body(seq: i64) -> Value {
    json!({
        "device_id": "d1",
        "timestamp_ms": 1000,
        "relative_altitude_m": 1.2,
        "pressure_kpa": 101.3,
        "vertical_gain_m": 0.5,
        "net_change_m": 0.1,
        "seq": seq
    })
}

async fn post_raw(
    base: &str,
    auth: Option<&str>,
    content_type: &str,
    body: &str,
) -> reqwest::Response {
    let mut request = reqwest::Client::new()
        .post(format!("{}/ingest", base))
        .header("content-type", content_type)
        .body(body.to_string());
    if let Some(auth) = auth {
        request = request.header("authorization", auth);
    }
    request.send().await.unwrap()
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let base = spawn_relay().await;
    let http = reqwest::Client::new();

    // 1) health before any write
    let r = http.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(r.status(), 200);
    let body: Value = r.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "ok": true, "has_data": false, "last_received_at_ms": null })
    );

    let r = http.get(format!("{}/latest", base)).send().await.unwrap();
    assert_eq!(r.status(), 204);
    assert!(r.bytes().await.unwrap().is_empty());

    // 2) valid ingest
    let r = http
        .post(format!("{}/ingest", base))
        .bearer_auth(TOKEN)
        .json(&scenario_body(1))
        .send()
        .await
        .unwrap();
    assert_eq!(r.status(), 200);
    assert_eq!(r.json::<Value>().await.unwrap(), json!({ "ok": true }));

    // 3) latest carries every field plus receipt metadata
    let r = http.get(format!("{}/latest", base)).send().await.unwrap();
    assert_eq!(r.status(), 200);
    let headers = r.headers().clone();
    assert_eq!(
        headers["cache-control"],
        "no-store, no-cache, must-revalidate, proxy-revalidate"
    );
    assert_eq!(headers["pragma"], "no-cache");
    assert_eq!(headers["expires"], "0");
    let first: Value = r.json().await.unwrap();
    for (key, value) in scenario_body(1).as_object().unwrap() {
        assert_eq!(&first[key], value, "field {}", key);
    }
    assert!(first["received_at_ms"].as_u64().unwrap() > 0);
    assert_eq!(first["source_ip"], "127.0.0.1");
    assert!(first["battery_level"].is_null());

    // 4) wrong token is rejected and changes nothing
    let r = http
        .post(format!("{}/ingest", base))
        .bearer_auth("wrong")
        .json(&scenario_body(99))
        .send()
        .await
        .unwrap();
    assert_eq!(r.status(), 401);
    let after_reject: Value = http
        .get(format!("{}/latest", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after_reject, first);

    // 5) a second valid reading fully replaces the first
    let mut second = scenario_body(2);
    second["battery_level"] = json!(0.8);
    let r = http
        .post(format!("{}/ingest", base))
        .bearer_auth(TOKEN)
        .json(&second)
        .send()
        .await
        .unwrap();
    assert_eq!(r.status(), 200);

    let latest: Value = http
        .get(format!("{}/latest", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(latest["seq"], 2);
    assert_eq!(latest["battery_level"], 0.8);

    let health: Value = http
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["has_data"], true);
    assert_eq!(health["last_received_at_ms"], latest["received_at_ms"]);
}

#[tokio::test]
async fn test_unauthorized_variants_leave_store_empty() {
    let base = spawn_relay().await;
    let body = scenario_body(1).to_string();

    for auth in [
        None,
        Some("test-ingest-token"),
        Some("Basic test-ingest-token"),
        Some("bearer test-ingest-token"),
        Some("Bearer wrong"),
        Some("Bearer  test-ingest-token"),
    ] {
        let r = post_raw(&base, auth, "application/json", &body).await;
        assert_eq!(r.status(), 401, "auth header {:?}", auth);
        assert_eq!(
            r.json::<Value>().await.unwrap(),
            json!({ "detail": "Unauthorized" })
        );
    }

    let client = RelayClient::new(&base, TOKEN).unwrap();
    assert!(client.latest().await.unwrap().is_none());
    assert!(!client.health().await.unwrap().has_data);
}

#[tokio::test]
async fn test_auth_is_checked_before_validation() {
    let base = spawn_relay().await;

    let r = post_raw(&base, None, "application/json", "{not json").await;
    assert_eq!(r.status(), 401);

    let r = post_raw(&base, Some("Bearer wrong"), "application/json", "{}").await;
    assert_eq!(r.status(), 401);
}

#[tokio::test]
async fn test_invalid_body_is_422_and_keeps_prior_value() {
    let base = spawn_relay().await;
    let client = RelayClient::new(&base, TOKEN).unwrap();
    client.ingest(&reading(1)).await.unwrap();
    let before = client.latest().await.unwrap().unwrap();

    let auth = format!("Bearer {}", TOKEN);
    let missing_seq = json!({ "device_id": "d1", "timestamp_ms": 1 }).to_string();
    let mut wrong_type = scenario_body(2);
    wrong_type["pressure_kpa"] = json!("high");

    for (content_type, body) in [
        ("application/json", "{not json".to_string()),
        ("application/json", missing_seq),
        ("application/json", wrong_type.to_string()),
        ("text/plain", scenario_body(2).to_string()),
    ] {
        let r = post_raw(&base, Some(&auth), content_type, &body).await;
        assert_eq!(r.status(), 422, "body {}", body);
        let detail: Value = r.json().await.unwrap();
        assert!(detail["detail"].is_string());
    }

    assert_eq!(client.latest().await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn test_received_at_is_server_stamped() {
    let base = spawn_relay().await;

    // a client-supplied received_at_ms is ignored
    let mut body = scenario_body(1);
    body["received_at_ms"] = json!(5);
    body["source_ip"] = json!("6.6.6.6");

    let start = epoch_ms();
    let r = post_raw(
        &base,
        Some(&format!("Bearer {}", TOKEN)),
        "application/json",
        &body.to_string(),
    )
    .await;
    let end = epoch_ms();
    assert_eq!(r.status(), 200);

    let client = RelayClient::new(&base, TOKEN).unwrap();
    let stored = client.latest().await.unwrap().unwrap();
    assert!(stored.received_at_ms >= start && stored.received_at_ms <= end);
    assert_ne!(stored.received_at_ms, 5);
    assert_eq!(stored.source_ip.as_deref(), Some("127.0.0.1"));
}

#[tokio::test]
async fn test_repeated_reads_are_identical() {
    let base = spawn_relay().await;
    let client = RelayClient::new(&base, TOKEN).unwrap();
    client.ingest(&reading(7)).await.unwrap();

    let a = client.latest().await.unwrap();
    let b = client.latest().await.unwrap();
    let c = client.latest().await.unwrap();
    assert_eq!(a, b);
    assert_eq!(b, c);
}

#[tokio::test]
async fn test_cors_allows_any_origin_for_reads() {
    let base = spawn_relay().await;
    let r = reqwest::Client::new()
        .get(format!("{}/health", base))
        .header("origin", "https://example.org")
        .send()
        .await
        .unwrap();
    assert_eq!(r.status(), 200);
    assert_eq!(r.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_concurrent_ingest_never_tears() {
    let base = spawn_relay().await;
    let client = RelayClient::new(&base, TOKEN).unwrap();

    let mut tasks = Vec::new();
    for seq in 1..=20 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let mut r = reading(seq);
            r.device_id = format!("d{}", seq);
            r.relative_altitude_m = seq as f64;
            client.ingest(&r).await.unwrap();
            if let Some(stored) = client.latest().await.unwrap() {
                let s = stored.reading.seq;
                assert_eq!(stored.reading.device_id, format!("d{}", s));
                assert_eq!(stored.reading.relative_altitude_m, s as f64);
                assert_eq!(stored.reading.timestamp_ms, 1000 * s);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let last = client.latest().await.unwrap().unwrap();
    assert!((1..=20).contains(&last.reading.seq));
}

#[tokio::test]
async fn test_upload_queue_drains_in_order() {
    let base = spawn_relay().await;
    let client = RelayClient::new(&base, TOKEN).unwrap();

    let mut queue = UploadQueue::new();
    for seq in 1..=3 {
        queue.push(reading(seq));
    }

    for expected in 1..=3 {
        assert!(queue.flush_one(&client).await.unwrap());
        let stored = client.latest().await.unwrap().unwrap();
        assert_eq!(stored.reading.seq, expected);
    }
    assert!(queue.is_empty());
    assert!(!queue.flush_one(&client).await.unwrap());
}

#[tokio::test]
async fn test_upload_queue_keeps_head_on_rejection() {
    let base = spawn_relay().await;
    let bad_client = RelayClient::new(&base, "not-the-token").unwrap();

    let mut queue = UploadQueue::new();
    queue.push(reading(1));

    let err = queue.flush_one(&bad_client).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.retries(), 1);
    assert_eq!(queue.backoff(), Duration::from_secs(2));

    let good_client = RelayClient::new(&base, TOKEN).unwrap();
    assert!(queue.flush_one(&good_client).await.unwrap());
    assert_eq!(queue.retries(), 0);
    assert!(queue.is_empty());
}
