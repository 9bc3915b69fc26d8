//! PUBSOCK - JSON pub/sub messaging over WebSocket
//!
//! This is the main convenience crate that re-exports the pubsock sub-crates.
//! Use this crate if you want a single dependency for talking to a pubsock
//! server.
//!
//! # Architecture
//!
//! Pubsock is organized into modular crates:
//!
//! - **pubsock-core**: Wire types, codec, error handling
//! - **pubsock-client**: WebSocket client with subscriptions, credential
//!   refresh and reconnection
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pubsock::{Config, Credentials, EventHandler, PubsockClient, SubEventHandler};
//!
//! #[tokio::main]
//! async fn main() -> pubsock::Result<()> {
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
//!             SubEventHandler::default().with_on_message(|_sub, msg| async move {
//!                 println!("message: {}", msg.data);
//!                 Ok(())
//!             }),
//!         )
//!         .await?;
//!
//!     sub.publish(br#"{"input": "hello"}"#).await?;
//!     Ok(())
//! }
//! ```

// Re-export the public APIs from the sub-crates so users can access
// everything through the `pubsock::` prefix.
pub use pubsock_client as client;
pub use pubsock_core as core;

// Convenience re-exports of the most commonly used types.
pub use pubsock_client::{
    BackoffReconnect, Config, Credentials, EventHandler, PeriodicReconnect, PubsockClient,
    ReconnectStrategy, Status, SubEventHandler, Subscription,
};
pub use pubsock_core::{Error, Result};
