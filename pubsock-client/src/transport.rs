//! WebSocket transport adapter
//!
//! Thin wrapper over `tokio-tungstenite`: dial the server URL, verify the
//! protocol-upgrade acknowledgment and hand back the split sink/stream
//! halves. Everything above this module deals in text frames only.

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use pubsock_core::{Error, Result};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = futures::stream::SplitSink<WsStream, Message>;
pub(crate) type WsSource = futures::stream::SplitStream<WsStream>;

/// Dial the server and split the connection.
///
/// The dial only succeeds on an HTTP 101 upgrade acknowledgment; any other
/// response status is a transport error.
pub(crate) async fn dial(url: &str) -> Result<(WsSink, WsSource)> {
    let (ws_stream, response) = connect_async(url)
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    if response.status() != StatusCode::SWITCHING_PROTOCOLS {
        return Err(Error::Transport(format!(
            "unexpected status code {} while connecting to server",
            response.status()
        )));
    }
    Ok(ws_stream.split())
}
