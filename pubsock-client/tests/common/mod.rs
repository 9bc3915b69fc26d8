//! Common test utilities for pubsock-client integration tests
//!
//! Provides a scripted mock WebSocket server so client behavior can be
//! tested without a real pubsock server: a handler closure maps each
//! received command frame to an optional reply frame, unsolicited frames
//! can be pushed to live connections, and connections can be dropped
//! server-side to exercise the disconnect/reconnect paths.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

type HandlerFn =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = Option<String>> + Send>> + Send + Sync>;

#[derive(Clone, Debug)]
enum Push {
    Frame(String),
    Kick,
}

/// Mock pubsock server over WebSocket.
///
/// Accepts any number of sequential connections, so reconnect scenarios
/// work against the same instance.
pub struct MockServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    message_rx: mpsc::Receiver<String>,
    push_tx: broadcast::Sender<Push>,
}

impl MockServer {
    /// Start a mock server whose handler maps each received text frame to
    /// an optional reply frame (`None` means stay silent).
    pub async fn start<F, Fut>(handler: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |msg| Box::pin(handler(msg)));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (msg_tx, message_rx) = mpsc::channel::<String>(256);
        let (push_tx, _) = broadcast::channel::<Push>(64);
        let conn_push = push_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { break };
                        let handler = handler.clone();
                        let msg_tx = msg_tx.clone();
                        let push_rx = conn_push.subscribe();
                        tokio::spawn(serve_connection(stream, handler, msg_tx, push_rx));
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            message_rx,
            push_tx,
        }
    }

    /// WebSocket URL for connecting to this server.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Push an unsolicited frame to every live connection.
    pub fn push(&self, frame: String) {
        let _ = self.push_tx.send(Push::Frame(frame));
    }

    /// Close every live connection server-side.
    pub fn kick(&self) {
        let _ = self.push_tx.send(Push::Kick);
    }

    /// Next command frame received by the server, waiting up to 5 seconds.
    pub async fn recv_command(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.message_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Command frame received by the server, if any arrived already.
    pub fn try_recv_command(&mut self) -> Option<String> {
        self.message_rx.try_recv().ok()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    handler: HandlerFn,
    msg_tx: mpsc::Sender<String>,
    mut push_rx: broadcast::Receiver<Push>,
) {
    let Ok(ws) = accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            inbound = read.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let _ = msg_tx.send(text.clone()).await;
                        if let Some(response) = handler(text).await {
                            if write.send(Message::Text(response)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    Some(Ok(_)) => {}
                }
            }
            pushed = push_rx.recv() => {
                match pushed {
                    Ok(Push::Frame(frame)) => {
                        if write.send(Message::Text(frame)).await.is_err() {
                            return;
                        }
                    }
                    Ok(Push::Kick) => {
                        let _ = write.send(Message::Close(None)).await;
                        return;
                    }
                    Err(_) => return,
                }
            }
        }
    }
}

/// Build a reply frame answering the command with the given uid.
pub fn reply_frame(uid: &str, method: &str, body: serde_json::Value) -> String {
    serde_json::json!({
        "uid": uid,
        "method": method,
        "error": "",
        "body": body
    })
    .to_string()
}

/// Build an async event frame (empty uid).
pub fn event_frame(method: &str, body: serde_json::Value) -> String {
    serde_json::json!({
        "uid": "",
        "method": method,
        "error": "",
        "body": body
    })
    .to_string()
}

/// Split a received command frame into (uid, method, params).
pub fn parse_command(frame: &str) -> (String, String, serde_json::Value) {
    let value: serde_json::Value = serde_json::from_str(frame).unwrap();
    (
        value["uid"].as_str().unwrap_or_default().to_string(),
        value["method"].as_str().unwrap_or_default().to_string(),
        value["params"].clone(),
    )
}

/// Standard connect reply body for tests that don't exercise expiry.
pub fn connect_body(client_id: &str) -> serde_json::Value {
    serde_json::json!({
        "client": client_id,
        "expires": false,
        "expired": false,
        "ttl": 0
    })
}
