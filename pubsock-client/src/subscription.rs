//! Channel subscriptions
//!
//! The client keeps one [`SubState`] per channel in its registry: the last
//! seen message id (for recovery across reconnects) and the host's event
//! callbacks. What the host holds is a [`Subscription`] - a lightweight
//! handle naming the channel plus a weak back-reference to the client, so a
//! retained handle never keeps a dropped client alive.

use std::collections::HashMap;
use std::sync::Weak;

use pubsock_core::{ClientInfo, Error, Message, Result};

use crate::client::{ClientInner, PubsockClient};
use crate::handlers::SubEventHandler;

/// Registry-side record for one subscribed channel.
pub(crate) struct SubState {
    pub(crate) last_message_id: Option<String>,
    pub(crate) events: SubEventHandler,
}

/// Handle to a channel subscription.
///
/// Created by [`PubsockClient::subscribe`] and passed into subscription
/// event callbacks. Clones share the same underlying subscription; the
/// registry entry lives until `unsubscribe` or the client is closed.
#[derive(Clone)]
pub struct Subscription {
    channel: String,
    client: Weak<ClientInner>,
}

impl Subscription {
    pub(crate) fn new(channel: impl Into<String>, client: Weak<ClientInner>) -> Self {
        Self {
            channel: channel.into(),
            client,
        }
    }

    /// Name of the subscribed channel.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Publish raw JSON data into the channel.
    pub async fn publish(&self, data: &[u8]) -> Result<()> {
        self.client()?.publish(&self.channel, data).await
    }

    /// Fetch the channel message history.
    pub async fn history(&self) -> Result<Vec<Message>> {
        self.client()?.history(&self.channel).await
    }

    /// Fetch presence information: connection id to client info.
    pub async fn presence(&self) -> Result<HashMap<String, ClientInfo>> {
        self.client()?.presence(&self.channel).await
    }

    /// Unsubscribe from the channel and drop it from the client registry.
    pub async fn unsubscribe(&self) -> Result<()> {
        self.client()?.unsubscribe(&self.channel).await
    }

    fn client(&self) -> Result<PubsockClient> {
        self.client
            .upgrade()
            .map(PubsockClient::from_inner)
            .ok_or(Error::ClientDisconnected)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .finish()
    }
}
