//! Wire types for the pubsock protocol
//!
//! The protocol exchanges UTF-8 JSON text frames. Outbound frames are a
//! single [`Command`] envelope; inbound frames are one [`Reply`] envelope or
//! an array of them. A reply with a non-empty `uid` answers the command
//! issued with the same uid; a reply with an empty `uid` is a
//! server-initiated event (`message`, `join`, `leave`) whose `body` is
//! decoded per method.
//!
//! Reply bodies are decoded leniently: the server may omit fields, so every
//! body field defaults when absent.

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Outbound command envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    pub uid: String,
    pub method: String,
    pub params: Value,
}

impl Command {
    /// Build a command, serializing the method-specific params.
    pub fn new(uid: impl Into<String>, method: impl Into<String>, params: impl Serialize) -> Result<Self> {
        Ok(Self {
            uid: uid.into(),
            method: method.into(),
            params: serde_json::to_value(params)?,
        })
    }
}

/// Inbound reply envelope.
///
/// `uid` correlates a reply to its command; an empty `uid` marks an
/// asynchronous event. A non-empty `error` means the server failed the
/// command and `body` should be ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub body: Value,
}

impl Reply {
    /// True when this reply is a server-initiated event rather than an
    /// answer to a command.
    pub fn is_async(&self) -> bool {
        self.uid.is_empty()
    }

    /// Decode the raw body into the method-specific shape.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone()).map_err(Error::from)
    }
}

/// Params for `connect` and `refresh`. All fields are opaque to the client
/// and handed to the server verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectParams {
    pub user: String,
    pub timestamp: String,
    pub info: String,
    pub token: String,
}

/// Params for `subscribe`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscribeParams {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recover: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,
}

/// Params for `unsubscribe`, `history` and `presence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelParams {
    pub channel: String,
}

/// Params for `publish`. `data` is the raw JSON payload to broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishParams {
    pub channel: String,
    pub data: Value,
}

/// Reply body for `connect` and `refresh`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectBody {
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub expires: bool,
    #[serde(default)]
    pub expired: bool,
    #[serde(default)]
    pub ttl: i64,
}

/// Reply body for `subscribe`.
///
/// When the subscribe asked for recovery, `messages` holds the missed
/// messages newest-first and `recovered` tells whether the server could
/// serve the full gap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscribeBody {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub last: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub recovered: bool,
}

/// Reply body for `unsubscribe`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnsubscribeBody {
    #[serde(default)]
    pub status: bool,
}

/// Reply body for `publish`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishBody {
    #[serde(default)]
    pub status: bool,
}

/// Reply body for `history`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryBody {
    #[serde(default)]
    pub data: Vec<Message>,
}

/// Reply body for `presence`: connection id to client info.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresenceBody {
    #[serde(default)]
    pub data: HashMap<String, ClientInfo>,
}

/// Body of async `join` and `leave` events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinLeaveBody {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub data: ClientInfo,
}

/// A message published into a channel. `uid` is the server-assigned message
/// id used for recovery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<ClientInfo>,
}

/// Information about a connected client, carried in presence maps and
/// join/leave events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_info: Option<Value>,
}
