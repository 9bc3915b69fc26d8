//! Core wire types and codec for the pubsock protocol
//!
//! This crate provides the foundational pieces shared by pubsock
//! implementations:
//!
//! - **Types**: command/reply envelopes and the per-method param and body
//!   shapes ([`types`])
//! - **Codec**: text-frame encoding and the single-object-or-batch inbound
//!   decoder ([`codec`])
//! - **Errors**: the workspace-wide [`Error`] enum and [`Result`] alias
//!
//! The crate is transport-agnostic: it handles serialization only. The
//! `pubsock-client` crate builds the WebSocket client on top of it.

pub mod codec;
pub mod error;
pub mod types;

// Re-export the common types so users can write `pubsock_core::Reply`
// instead of `pubsock_core::types::Reply`.
pub use error::{Error, Result};
pub use types::{
    ChannelParams, ClientInfo, Command, ConnectBody, ConnectParams, HistoryBody, JoinLeaveBody,
    Message, PresenceBody, PublishBody, PublishParams, Reply, SubscribeBody, SubscribeParams,
    UnsubscribeBody,
};
