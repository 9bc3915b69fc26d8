//! Error types for pubsock
//!
//! A single `Error` enum serves the whole workspace. Protocol-level failure
//! kinds (timeouts, bad command statuses, lifecycle violations) each get
//! their own variant with a stable message; transport and serialization
//! failures are carried as strings so the enum stays `Clone` and can be
//! handed to user callbacks.

use thiserror::Error;

/// Result type used across the pubsock crates.
pub type Result<T> = std::result::Result<T, Error>;

/// All error conditions surfaced by the pubsock client.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A synchronous command received no reply within the configured
    /// request timeout.
    #[error("timed out")]
    Timeout,

    /// A reply waiter with the same correlation uid is already registered.
    /// Should not occur while command uids come from the monotonic counter,
    /// but the registry enforces it anyway.
    #[error("waiter with uid already exists")]
    DuplicateWaiter,

    /// The reply waiter was cancelled before a reply arrived, typically
    /// because the connection was torn down.
    #[error("waiter closed")]
    WaiterClosed,

    /// The operation is not valid for the client's current status, e.g.
    /// connecting an already-connected client or using a closed one.
    #[error("wrong client status to make operation")]
    ClientStatus,

    /// The connection dropped while the operation was in flight, or the
    /// client is not connected at all.
    #[error("client disconnected")]
    ClientDisconnected,

    /// Credentials are expired and could not be refreshed.
    #[error("client expired")]
    ClientExpired,

    /// The reconnect strategy exhausted its attempts without success.
    #[error("reconnect failed")]
    ReconnectFailed,

    /// The server rejected a subscribe command (`status: false`).
    #[error("bad subscribe status")]
    BadSubscribeStatus,

    /// The server rejected an unsubscribe command (`status: false`).
    #[error("bad unsubscribe status")]
    BadUnsubscribeStatus,

    /// The server rejected a publish command (`status: false`).
    #[error("bad publish status")]
    BadPublishStatus,

    /// A subscription for the channel already exists on this client.
    #[error("already subscribed on channel {0}")]
    AlreadySubscribed(String),

    /// WebSocket-level failure: dial, handshake, read or write.
    #[error("transport error: {0}")]
    Transport(String),

    /// JSON encode/decode failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A reply carried a non-empty `error` field from the server.
    #[error("server error: {0}")]
    Server(String),

    /// An inbound frame violated the wire format.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A required host handler is missing, e.g. no refresh handler while
    /// credentials expire or no signing handler for a private channel.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
