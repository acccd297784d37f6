// SPDX-License-Identifier: Apache-2.0

//! `ReqwestTransport` against a local mock catalog.

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Server};
use secrecy::SecretString;
use serde_json::json;
use tilewatch_core::{
    CatalogConfig, CatalogEndpoints, FetchRequest, PollError, PollEvent, PollRequest, PollerSettings,
    ReqwestTransport, RetryPolicy, TilePoller, TileTransport,
};

const CONTAINERS: &str = "/apicatalog/api/v1/containers";

fn transport(auth_token: Option<&str>) -> ReqwestTransport {
    let config = CatalogConfig {
        timeout_seconds: 5,
        auth_token: auth_token.map(|t| SecretString::from(t.to_string())),
        ..CatalogConfig::default()
    };
    ReqwestTransport::new(&config).expect("client builds")
}

fn all_tiles_request(base_url: &str) -> FetchRequest {
    let endpoints = CatalogEndpoints::new(base_url).expect("valid url");
    FetchRequest::get(endpoints.containers_url(&PollRequest::all()))
}

#[tokio::test]
async fn test_fetch_all_tiles() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", CONTAINERS)
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([{"id": "apicatalog", "status": "UP"}]).to_string())
        .create_async()
        .await;

    let response = transport(None)
        .fetch(&all_tiles_request(&server.url()))
        .await
        .expect("fetch succeeds");

    assert_eq!(response.status, 200);
    assert_eq!(response.payload[0]["id"], "apicatalog");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_single_tile_sends_auth_cookie() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/apicatalog/api/v1/containers/apicatalog")
        .match_header(
            "cookie",
            Matcher::Regex("apimlAuthenticationToken=token-123".to_string()),
        )
        .with_status(200)
        .with_body(json!({"id": "apicatalog"}).to_string())
        .create_async()
        .await;

    let endpoints = CatalogEndpoints::new(&server.url()).expect("valid url");
    let request =
        FetchRequest::get(endpoints.containers_url(&PollRequest::new(Some("apicatalog"))));
    let response = transport(Some("token-123"))
        .fetch(&request)
        .await
        .expect("fetch succeeds");

    assert_eq!(response.payload["id"], "apicatalog");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_body_is_null_payload() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", CONTAINERS)
        .with_status(200)
        .create_async()
        .await;

    let response = transport(None)
        .fetch(&all_tiles_request(&server.url()))
        .await
        .expect("fetch succeeds");
    assert!(response.payload.is_null());
}

#[tokio::test]
async fn test_error_body_codes_are_collected() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", CONTAINERS)
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"messages": [{
                "messageType": "ERROR",
                "messageNumber": "ZWEAM104E",
                "messageContent": "The endpoint you are looking for 'apicatalog' could not be located"
            }]})
            .to_string(),
        )
        .create_async()
        .await;

    let err = transport(None)
        .fetch(&all_tiles_request(&server.url()))
        .await
        .expect_err("500 is an error");

    assert_eq!(err.http_status, Some(500));
    assert!(err.server_codes.contains("ZWEAM104E"));
    assert!(err.message.contains("could not be located"));
}

#[tokio::test]
async fn test_unauthorized_without_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", CONTAINERS)
        .with_status(401)
        .create_async()
        .await;

    let err = transport(None)
        .fetch(&all_tiles_request(&server.url()))
        .await
        .expect_err("401 is an error");

    assert!(err.is_authentication());
    assert_eq!(err.message, "HTTP 401 Unauthorized");
}

#[tokio::test]
async fn test_invalid_json_keeps_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", CONTAINERS)
        .with_status(200)
        .with_body("<html>login</html>")
        .create_async()
        .await;

    let err = transport(None)
        .fetch(&all_tiles_request(&server.url()))
        .await
        .expect_err("html is not json");
    assert_eq!(err.http_status, Some(200));
    assert!(err.message.contains("Invalid JSON"));
}

#[tokio::test]
async fn test_connection_refused_has_no_status() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let err = transport(None)
        .fetch(&all_tiles_request(&format!("http://127.0.0.1:{port}")))
        .await
        .expect_err("nothing listening");
    assert_eq!(err.http_status, None);
}

#[tokio::test]
async fn test_poller_retries_unregistered_catalog_over_http() {
    let mut server = Server::new_async().await;
    let not_ready = server
        .mock("GET", CONTAINERS)
        .with_status(500)
        .with_body(r#"{"messages":[{"messageNumber":"ZWEAM104E","messageContent":"not registered"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let endpoints = CatalogEndpoints::new(&server.url()).expect("valid url");
    let settings = PollerSettings::builder()
        .update_period(Duration::from_secs(60))
        .debounce_window(Duration::from_millis(10))
        .retry(RetryPolicy {
            max_retries: 3,
            scaling_unit: Duration::from_millis(200),
            ..RetryPolicy::default()
        })
        .build();
    let (poller, mut events) = TilePoller::new(Arc::new(transport(None)), endpoints, settings);

    poller.start(None);
    let first = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event within timeout");
    assert_eq!(
        first,
        Some(PollEvent::Retrying {
            attempt: 1,
            max_retries: 3
        })
    );
    not_ready.assert_async().await;
    not_ready.remove_async().await;

    let ready = server
        .mock("GET", CONTAINERS)
        .with_status(200)
        .with_body(json!([{"id": "apicatalog"}]).to_string())
        .create_async()
        .await;

    let tiles = loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event within timeout");
        match event {
            Some(PollEvent::Success { tiles }) => break tiles,
            Some(PollEvent::Retrying { .. }) => {}
            other => panic!("unexpected event {other:?}"),
        }
    };
    assert_eq!(tiles.len(), 1);
    ready.assert_async().await;
    poller.stop();
}

#[tokio::test]
async fn test_poller_retries_single_message_body_over_http() {
    let mut server = Server::new_async().await;
    let not_ready = server
        .mock("GET", CONTAINERS)
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"messageNumber":"ZWEAM104E","messageContent":"not registered yet"}"#)
        .expect(2)
        .create_async()
        .await;

    let endpoints = CatalogEndpoints::new(&server.url()).expect("valid url");
    let settings = PollerSettings::builder()
        .update_period(Duration::from_secs(60))
        .debounce_window(Duration::from_millis(10))
        .retry(RetryPolicy {
            max_retries: 1,
            scaling_unit: Duration::from_millis(50),
            ..RetryPolicy::default()
        })
        .build();
    let (poller, mut events) = TilePoller::new(Arc::new(transport(None)), endpoints, settings);

    poller.start(None);
    let mut received = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
        let done = event.ends_session();
        received.push(event);
        if done {
            break;
        }
    }

    assert_eq!(
        received.first(),
        Some(&PollEvent::Retrying {
            attempt: 1,
            max_retries: 1
        })
    );
    match received.last() {
        Some(PollEvent::Failure {
            error: PollError::RetriesExhausted { attempts, last },
        }) => {
            assert_eq!(*attempts, 2);
            assert_eq!(last.message, "not registered yet");
            assert!(last.server_codes.contains("ZWEAM104E"));
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }
    not_ready.assert_async().await;
}
