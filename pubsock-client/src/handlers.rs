//! Host callbacks for connection and subscription events
//!
//! Handlers are optional boxed async closures invoked from the client's
//! dispatch task. They must not block that task and must not issue nested
//! synchronous commands and wait for them on the same task; spawn a task for
//! that instead, or the dispatcher can no longer deliver the reply being
//! waited on.
//!
//! Errors returned from message/join/leave handlers are logged by the client
//! but do not change its state - handling them is the host's concern.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use pubsock_core::{ClientInfo, Error, Message, Result};

use crate::client::PubsockClient;
use crate::config::Credentials;
use crate::subscription::Subscription;

type HandlerFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Signature returned by the private-subscription handler.
#[derive(Debug, Clone)]
pub struct PrivateSign {
    pub sign: String,
    pub info: String,
}

/// What the private-subscription handler is asked to sign.
#[derive(Debug, Clone)]
pub struct PrivateRequest {
    pub client_id: String,
    pub channel: String,
}

pub type DisconnectFn = Arc<dyn Fn(PubsockClient) -> HandlerFuture<Result<()>> + Send + Sync>;
pub type PrivateSubFn = Arc<dyn Fn(PrivateRequest) -> HandlerFuture<Result<PrivateSign>> + Send + Sync>;
pub type RefreshFn = Arc<dyn Fn() -> HandlerFuture<Result<Credentials>> + Send + Sync>;
pub type ErrorFn = Arc<dyn Fn(Error) -> HandlerFuture<()> + Send + Sync>;
pub type MessageFn = Arc<dyn Fn(Subscription, Message) -> HandlerFuture<Result<()>> + Send + Sync>;
pub type JoinFn = Arc<dyn Fn(Subscription, ClientInfo) -> HandlerFuture<Result<()>> + Send + Sync>;
pub type LeaveFn = Arc<dyn Fn(Subscription, ClientInfo) -> HandlerFuture<Result<()>> + Send + Sync>;
pub type UnsubscribeFn = Arc<dyn Fn(Subscription) -> HandlerFuture<Result<()>> + Send + Sync>;

/// Connection-level event callbacks.
///
/// All are optional, with two caveats: `on_refresh` is required once
/// credentials can expire, and `on_private_sub` is required to subscribe to
/// private channels. Missing either in those situations is a configuration
/// error.
#[derive(Clone, Default)]
pub struct EventHandler {
    pub(crate) on_disconnect: Option<DisconnectFn>,
    pub(crate) on_private_sub: Option<PrivateSubFn>,
    pub(crate) on_refresh: Option<RefreshFn>,
    pub(crate) on_error: Option<ErrorFn>,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after the connection is lost and the client has transitioned
    /// to disconnected. Reconnecting is left to the host.
    pub fn with_on_disconnect<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PubsockClient) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_disconnect = Some(Arc::new(move |client| Box::pin(f(client))));
        self
    }

    /// Called to sign a subscription to a private channel.
    pub fn with_on_private_sub<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PrivateRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PrivateSign>> + Send + 'static,
    {
        self.on_private_sub = Some(Arc::new(move |req| Box::pin(f(req))));
        self
    }

    /// Called to obtain fresh credentials when the current ones expire.
    pub fn with_on_refresh<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Credentials>> + Send + 'static,
    {
        self.on_refresh = Some(Arc::new(move || Box::pin(f())));
        self
    }

    /// Called with critical errors. When absent the client logs the error
    /// and closes itself.
    pub fn with_on_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |err| Box::pin(f(err))));
        self
    }
}

/// Per-subscription event callbacks.
#[derive(Clone, Default)]
pub struct SubEventHandler {
    pub(crate) on_message: Option<MessageFn>,
    pub(crate) on_join: Option<JoinFn>,
    pub(crate) on_leave: Option<LeaveFn>,
    pub(crate) on_unsubscribe: Option<UnsubscribeFn>,
}

impl SubEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for every message broadcast into the channel, including
    /// messages replayed during recovery.
    pub fn with_on_message<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Subscription, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_message = Some(Arc::new(move |sub, msg| Box::pin(f(sub, msg))));
        self
    }

    pub fn with_on_join<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Subscription, ClientInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_join = Some(Arc::new(move |sub, info| Box::pin(f(sub, info))));
        self
    }

    pub fn with_on_leave<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Subscription, ClientInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_leave = Some(Arc::new(move |sub, info| Box::pin(f(sub, info))));
        self
    }

    /// Called after this client unsubscribes from the channel.
    pub fn with_on_unsubscribe<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Subscription) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_unsubscribe = Some(Arc::new(move |sub| Box::pin(f(sub))));
        self
    }
}
