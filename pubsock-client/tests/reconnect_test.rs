//! Reconnect strategy integration tests

mod common;

use std::time::{Duration, Instant};

use common::{connect_body, parse_command, reply_frame, MockServer};
use pubsock_client::{
    BackoffReconnect, Config, Credentials, Error, EventHandler, PeriodicReconnect, PubsockClient,
    Status,
};

fn test_credentials() -> Credentials {
    Credentials::new("u1", "1", "", "tok")
}

fn unreachable_client() -> PubsockClient {
    // Port 1 is essentially never listening, so every dial fails fast.
    PubsockClient::new(
        "ws://127.0.0.1:1",
        test_credentials(),
        EventHandler::default(),
        Config::default(),
    )
}

#[tokio::test]
async fn periodic_gives_up_after_cap() {
    let client = unreachable_client();
    let strategy = PeriodicReconnect {
        interval: Duration::from_millis(10),
        num_reconnect: 3,
    };

    let start = Instant::now();
    match client.reconnect(&strategy).await {
        Err(Error::ReconnectFailed) => {}
        other => panic!("expected reconnect failed, got {other:?}"),
    }
    // Three sleeps of 10ms must have happened.
    assert!(start.elapsed() >= Duration::from_millis(30));
    assert_eq!(client.status().await, Status::Reconnecting);
}

#[tokio::test]
async fn backoff_gives_up_after_cap() {
    let client = unreachable_client();
    let strategy = BackoffReconnect {
        num_reconnect: 2,
        min: Duration::from_millis(10),
        max: Duration::from_millis(40),
        factor: 2.0,
        jitter: false,
    };

    match client.reconnect(&strategy).await {
        Err(Error::ReconnectFailed) => {}
        other => panic!("expected reconnect failed, got {other:?}"),
    }
}

#[tokio::test]
async fn reconnect_succeeds_once_server_is_reachable() {
    let server = MockServer::start(|frame| async move {
        let (uid, method, _) = parse_command(&frame);
        (method == "connect").then(|| reply_frame(&uid, "connect", connect_body("c-9")))
    })
    .await;

    let client = PubsockClient::new(
        server.url(),
        test_credentials(),
        EventHandler::default(),
        Config::default(),
    );
    client.connect().await.unwrap();

    server.kick();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.status().await, Status::Disconnected);

    let strategy = PeriodicReconnect {
        interval: Duration::from_millis(20),
        num_reconnect: 10,
    };
    client.reconnect(&strategy).await.unwrap();
    assert_eq!(client.status().await, Status::Connected);
    assert_eq!(client.client_id().await, "c-9");

    client.close().await;
    server.shutdown().await;
}

#[tokio::test]
async fn reconnect_on_closed_client_fails() {
    let client = unreachable_client();
    client.close().await;

    let strategy = PeriodicReconnect {
        interval: Duration::from_millis(10),
        num_reconnect: 1,
    };
    match client.reconnect(&strategy).await {
        Err(Error::ClientStatus) => {}
        other => panic!("expected client status error, got {other:?}"),
    }
}
