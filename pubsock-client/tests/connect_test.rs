//! Connection and credential-refresh integration tests

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{connect_body, parse_command, reply_frame, MockServer};
use pubsock_client::{Config, Credentials, Error, EventHandler, PubsockClient, Status, SubEventHandler};
use serde_json::json;

fn test_credentials() -> Credentials {
    Credentials::new("u1", "1", "", "tok")
}

#[tokio::test]
async fn connect_then_publish() {
    let server = MockServer::start(|frame| async move {
        let (uid, method, params) = parse_command(&frame);
        match method.as_str() {
            "connect" => {
                assert_eq!(params["user"], "u1");
                assert_eq!(params["token"], "tok");
                Some(reply_frame(&uid, "connect", connect_body("c-1")))
            }
            "subscribe" => Some(reply_frame(
                &uid,
                "subscribe",
                json!({"status": true, "last": "", "messages": [], "recovered": false}),
            )),
            "publish" => {
                assert_eq!(params["channel"], "news");
                assert_eq!(params["data"], "hi");
                Some(reply_frame(&uid, "publish", json!({"status": true})))
            }
            "unsubscribe" => Some(reply_frame(&uid, "unsubscribe", json!({"status": true}))),
            _ => None,
        }
    })
    .await;

    let client = PubsockClient::new(
        server.url(),
        test_credentials(),
        EventHandler::default(),
        Config::default(),
    );

    client.connect().await.unwrap();
    assert_eq!(client.client_id().await, "c-1");
    assert!(client.connected().await);

    let sub = client
        .subscribe("news", SubEventHandler::default())
        .await
        .unwrap();
    assert!(client.subscribed("news").await);

    sub.publish(b"\"hi\"").await.unwrap();

    client.close().await;
    server.shutdown().await;
}

#[tokio::test]
async fn connect_twice_is_rejected() {
    let server = MockServer::start(|frame| async move {
        let (uid, method, _) = parse_command(&frame);
        (method == "connect").then(|| reply_frame(&uid, "connect", connect_body("c-1")))
    })
    .await;

    let client = PubsockClient::new(
        server.url(),
        test_credentials(),
        EventHandler::default(),
        Config::default(),
    );

    client.connect().await.unwrap();
    match client.connect().await {
        Err(Error::ClientStatus) => {}
        other => panic!("expected client status error, got {other:?}"),
    }

    client.close().await;
    server.shutdown().await;
}

#[tokio::test]
async fn connect_after_close_fails() {
    let server = MockServer::start(|_frame| async move { None }).await;

    let client = PubsockClient::new(
        server.url(),
        test_credentials(),
        EventHandler::default(),
        Config::default(),
    );

    client.close().await;
    assert_eq!(client.status().await, Status::Closed);
    match client.connect().await {
        Err(Error::ClientStatus) => {}
        other => panic!("expected client status error, got {other:?}"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn expired_credentials_trigger_refresh() {
    // First connect reports expired credentials; after the refresh handler
    // supplies new ones the second connect succeeds with a 1 second TTL,
    // which must produce a refresh command on the wire when the timer fires.
    let connects = Arc::new(AtomicUsize::new(0));
    let server_connects = connects.clone();

    let mut server = MockServer::start(move |frame| {
        let connects = server_connects.clone();
        async move {
            let (uid, method, params) = parse_command(&frame);
            match method.as_str() {
                "connect" => {
                    if connects.fetch_add(1, Ordering::SeqCst) == 0 {
                        Some(reply_frame(
                            &uid,
                            "connect",
                            json!({"client": "", "expires": true, "expired": true, "ttl": 30}),
                        ))
                    } else {
                        assert_eq!(params["token"], "tok-fresh");
                        Some(reply_frame(
                            &uid,
                            "connect",
                            json!({"client": "c-2", "expires": true, "expired": false, "ttl": 1}),
                        ))
                    }
                }
                "refresh" => {
                    assert_eq!(params["token"], "tok-fresh");
                    Some(reply_frame(
                        &uid,
                        "refresh",
                        json!({"client": "c-2", "expires": false, "expired": false, "ttl": 0}),
                    ))
                }
                _ => None,
            }
        }
    })
    .await;

    let refreshes = Arc::new(AtomicUsize::new(0));
    let handler_refreshes = refreshes.clone();
    let events = EventHandler::default().with_on_refresh(move || {
        let refreshes = handler_refreshes.clone();
        async move {
            refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(Credentials::new("u1", "2", "", "tok-fresh"))
        }
    });

    let client = PubsockClient::new(server.url(), test_credentials(), events, Config::default());

    client.connect().await.unwrap();
    assert_eq!(client.client_id().await, "c-2");
    assert_eq!(connects.load(Ordering::SeqCst), 2);
    // One refresh already happened inline for the expired first connect.
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);

    // The TTL timer must fire roughly a second after connect and send a
    // refresh command.
    let mut saw_refresh = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while tokio::time::Instant::now() < deadline {
        let Some(frame) = server.recv_command().await else {
            break;
        };
        if parse_command(&frame).1 == "refresh" {
            saw_refresh = true;
            break;
        }
    }
    assert!(saw_refresh, "no refresh command observed on the wire");
    assert_eq!(refreshes.load(Ordering::SeqCst), 2);

    client.close().await;
    server.shutdown().await;
}

#[tokio::test]
async fn expired_credentials_without_handler_fail() {
    let server = MockServer::start(|frame| async move {
        let (uid, method, _) = parse_command(&frame);
        (method == "connect").then(|| {
            reply_frame(
                &uid,
                "connect",
                json!({"client": "", "expires": true, "expired": true, "ttl": 30}),
            )
        })
    })
    .await;

    let client = PubsockClient::new(
        server.url(),
        test_credentials(),
        EventHandler::default(),
        Config::default(),
    );

    match client.connect().await {
        Err(Error::Config(_)) => {}
        other => panic!("expected configuration error, got {other:?}"),
    }
    assert_eq!(client.status().await, Status::Disconnected);

    server.shutdown().await;
}

#[tokio::test]
async fn still_expired_after_refresh_fails() {
    let server = MockServer::start(|frame| async move {
        let (uid, method, _) = parse_command(&frame);
        (method == "connect").then(|| {
            reply_frame(
                &uid,
                "connect",
                json!({"client": "", "expires": true, "expired": true, "ttl": 30}),
            )
        })
    })
    .await;

    let events = EventHandler::default()
        .with_on_refresh(|| async { Ok(Credentials::new("u1", "2", "", "tok-fresh")) });
    let client = PubsockClient::new(server.url(), test_credentials(), events, Config::default());

    match client.connect().await {
        Err(Error::ClientExpired) => {}
        other => panic!("expected client expired error, got {other:?}"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn server_error_reply_surfaces() {
    let server = MockServer::start(|frame| async move {
        let (uid, _, _) = parse_command(&frame);
        Some(
            json!({"uid": uid, "method": "connect", "error": "invalid token", "body": {}})
                .to_string(),
        )
    })
    .await;

    let client = PubsockClient::new(
        server.url(),
        test_credentials(),
        EventHandler::default(),
        Config::default(),
    );

    match client.connect().await {
        Err(Error::Server(msg)) => assert_eq!(msg, "invalid token"),
        other => panic!("expected server error, got {other:?}"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn dial_failure_surfaces_as_transport_error() {
    let client = PubsockClient::new(
        // Port 1 is essentially never listening.
        "ws://127.0.0.1:1",
        test_credentials(),
        EventHandler::default(),
        Config::default(),
    );

    match client.connect().await {
        Err(Error::Transport(_)) => {}
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(client.status().await, Status::Disconnected);
}
