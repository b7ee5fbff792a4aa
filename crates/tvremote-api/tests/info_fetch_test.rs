// Integration tests for the device-info fetch using wiremock.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tvremote_api::Error;
use tvremote_api::info::fetch_tv_info_at;

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, reqwest::Client, url::Url) {
    let server = MockServer::start().await;
    let url = url::Url::parse(&format!("{}/api/v2/", server.uri())).unwrap();
    (server, reqwest::Client::new(), url)
}

// ── Happy path ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_info_document() {
    let (server, http, url) = setup().await;

    let body = json!({
        "id": "uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73",
        "name": "[TV] Living Room",
        "type": "Samsung SmartTV",
        "isSupport": "{\"remote_available\":\"true\"}",
        "device": {
            "modelName": "UE55AU7100",
            "wifiMac": "AA:BB:CC:DD:EE:FF",
            "TokenAuthSupport": "true"
        }
    });

    Mock::given(method("GET"))
        .and(path("/api/v2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let info = fetch_tv_info_at(&http, &url).await.unwrap();

    assert_eq!(
        info.id.as_deref(),
        Some("uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73")
    );
    assert_eq!(info.name.as_deref(), Some("[TV] Living Room"));
    let device = info.device.unwrap();
    assert_eq!(device.model_name.as_deref(), Some("UE55AU7100"));
    assert_eq!(device.token_auth_support.as_deref(), Some("true"));
}

#[tokio::test]
async fn test_device_id_alone_is_enough() {
    let (server, http, url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "device": { "id": "uuid:7" } })),
        )
        .mount(&server)
        .await;

    let info = fetch_tv_info_at(&http, &url).await.unwrap();
    assert!(info.id.is_none());
    assert_eq!(info.device.unwrap().id.as_deref(), Some("uuid:7"));
}

#[tokio::test]
async fn test_duid_only_document_is_accepted() {
    let (server, http, url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "[TV] Kitchen",
            "device": { "duid": "uuid:5b8e7c2a-1f4d-4e9b-8c3a-7d6e5f4a3b2c" }
        })))
        .mount(&server)
        .await;

    let info = fetch_tv_info_at(&http, &url).await.unwrap();
    assert!(info.id.is_none());
    let device = info.device.unwrap();
    assert!(device.id.is_none());
    assert_eq!(
        device.duid.as_deref(),
        Some("uuid:5b8e7c2a-1f4d-4e9b-8c3a-7d6e5f4a3b2c")
    );
}

#[tokio::test]
async fn test_document_without_any_id_is_still_returned() {
    let (server, http, url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Den" })))
        .mount(&server)
        .await;

    let info = fetch_tv_info_at(&http, &url).await.unwrap();
    assert_eq!(info.name.as_deref(), Some("Den"));
    assert!(info.device.is_none());
}

// ── Error paths ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_error_status() {
    let (server, http, url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = fetch_tv_info_at(&http, &url).await.unwrap_err();
    assert!(
        matches!(err, Error::UnexpectedResponse { ref message, .. } if message.contains("404")),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_non_json_body() {
    let (server, http, url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>router</html>"))
        .mount(&server)
        .await;

    let err = fetch_tv_info_at(&http, &url).await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert!(body.contains("router")),
        other => panic!("expected Deserialization, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let http = reqwest::Client::new();
    // Port 9 (discard) on loopback: nothing listens there.
    let url = url::Url::parse("http://127.0.0.1:9/api/v2/").unwrap();

    let err = fetch_tv_info_at(&http, &url).await.unwrap_err();
    assert!(
        matches!(err, Error::Transport(ref e) if e.is_connect()),
        "expected connect error, got {err:?}"
    );
}
