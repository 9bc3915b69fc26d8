//! WebSocket client for the pubsock protocol
//!
//! This crate provides a full client for a pubsock server: it authenticates
//! a user over a single WebSocket connection, multiplexes synchronous
//! commands over it, subscribes to named channels, receives broadcast and
//! join/leave events, refreshes expiring credentials on schedule, and
//! reconnects with message recovery.
//!
//! # Core Features
//!
//! - **Request multiplexing**: every synchronous command is correlated to
//!   its reply by uid, so many commands can be in flight at once
//! - **Subscriptions**: per-channel event callbacks with the last seen
//!   message id tracked for recovery
//! - **Credential refresh**: a connect reply carrying a TTL arms a one-shot
//!   timer that refreshes credentials through a host callback
//! - **Reconnection**: periodic or exponential-backoff strategies that
//!   re-authorize and resubscribe, replaying missed messages
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pubsock_client::{Config, Credentials, EventHandler, PubsockClient, SubEventHandler};
//!
//! #[tokio::main]
//! async fn main() -> pubsock_core::Result<()> {
//!     let credentials = Credentials::new("alice", Credentials::timestamp_now(), "", "token");
//!     let client = PubsockClient::new(
//!         "ws://localhost:8000/connection/websocket",
//!         credentials,
//!         EventHandler::default(),
//!         Config::default(),
//!     );
//!     client.connect().await?;
//!
//!     let sub = client
//!         .subscribe(
//!             "news",
//!             SubEventHandler::default().with_on_message(|sub, msg| async move {
//!                 println!("{}: {}", sub.channel(), msg.data);
//!                 Ok(())
//!             }),
//!         )
//!         .await?;
//!
//!     sub.publish(br#"{"text": "hello"}"#).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Reconnecting
//!
//! The client does not reconnect on its own; a disconnect sets the status
//! back to disconnected and invokes the disconnect callback. Drive
//! reconnection explicitly:
//!
//! ```rust,no_run
//! use pubsock_client::BackoffReconnect;
//!
//! # async fn example(client: pubsock_client::PubsockClient) -> pubsock_core::Result<()> {
//! client.reconnect(&BackoffReconnect::default()).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod handlers;
mod reconnect;
mod subscription;
mod transport;
mod waiter;

pub use client::{PubsockClient, Status};
pub use config::{Config, Credentials, DEFAULT_PRIVATE_CHANNEL_PREFIX, DEFAULT_REQUEST_TIMEOUT};
pub use handlers::{EventHandler, PrivateRequest, PrivateSign, SubEventHandler};
pub use reconnect::{BackoffReconnect, PeriodicReconnect, ReconnectStrategy};
pub use subscription::Subscription;

// Re-export the wire types a host needs to handle events and command
// results without depending on pubsock-core directly.
pub use pubsock_core::{ClientInfo, Error, Message, Result};
