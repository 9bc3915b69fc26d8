//! Pubsock client
//!
//! This module provides [`PubsockClient`], which owns the connection
//! lifecycle and the command layer on top of it.
//!
//! # Connection lifecycle
//!
//! 1. **Connect**: dial, authorize with the stored credentials
//! 2. **Use**: subscribe to channels, publish, query history/presence
//! 3. **Reconnect** (after a disconnect): re-dial, re-authorize and
//!    resubscribe with message recovery
//! 4. **Close**: terminal; every later operation fails
//!
//! # Cloning
//!
//! `PubsockClient` is cheaply cloneable using `Arc` internally. All clones
//! share the same connection and state, so the client can be used from
//! multiple tasks without extra synchronization.
//!
//! # Tasks
//!
//! Each connection runs three tasks: a read loop feeding inbound frames
//! into a bounded queue, a write loop draining the outbound queue with a
//! per-frame deadline, and a dispatch loop that completes reply waiters and
//! routes async events to subscription callbacks. A watch channel acts as
//! the shutdown signal; every blocking point selects on it so teardown
//! never leaves a task or a caller stuck.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use pubsock_core::{
    codec, ChannelParams, ClientInfo, Command, ConnectBody, ConnectParams, Error, HistoryBody,
    JoinLeaveBody, Message, PresenceBody, PublishBody, PublishParams, Reply, Result,
    SubscribeBody, SubscribeParams, UnsubscribeBody,
};

use crate::config::{Config, Credentials};
use crate::handlers::{EventHandler, PrivateRequest, PrivateSign, SubEventHandler};
use crate::subscription::{SubState, Subscription};
use crate::transport::{self, WsSink, WsSource};
use crate::waiter::WaiterRegistry;

/// Capacity of the inbound and outbound frame queues. Producers block when
/// a queue is full, applying backpressure to the peer or the caller.
const QUEUE_CAPACITY: usize = 64;

/// Connection status.
///
/// A client starts disconnected. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Disconnected,
    Connected,
    Closed,
    Reconnecting,
}

/// Connection-scoped state guarded by the client lock.
struct ConnState {
    status: Status,
    credentials: Credentials,
    client_id: String,
    /// Sender side of the outbound frame queue. `Some` exactly while a
    /// connection (or a reconnect dial) is up.
    write_tx: Option<mpsc::Sender<String>>,
    /// Shutdown signal for the current connection's tasks. Sending `true`
    /// (or dropping the sender) tells every task and blocked caller to
    /// stop. Replaced wholesale on each (re)connect.
    shutdown: Option<watch::Sender<bool>>,
}

pub(crate) struct ClientInner {
    url: String,
    config: Config,
    events: EventHandler,
    msg_id: AtomicU64,
    state: RwLock<ConnState>,
    subs: RwLock<HashMap<String, SubState>>,
    waiters: WaiterRegistry,
}

/// Client connection to a pubsock server.
#[derive(Clone)]
pub struct PubsockClient {
    inner: Arc<ClientInner>,
}

/// Wait until the shutdown signal becomes `true`.
///
/// Equivalent to `shutdown_rx.wait_for(|s| *s)`, but avoids holding the
/// `watch::Ref` across an await point so the enclosing future stays `Send`
/// (required for `tokio::spawn`).
async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}

impl PubsockClient {
    /// Create a client in the disconnected state. Call
    /// [`connect`](Self::connect) to dial and authorize.
    pub fn new(
        url: impl Into<String>,
        credentials: Credentials,
        events: EventHandler,
        config: Config,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                url: url.into(),
                config,
                events,
                msg_id: AtomicU64::new(0),
                state: RwLock::new(ConnState {
                    status: Status::Disconnected,
                    credentials,
                    client_id: String::new(),
                    write_tx: None,
                    shutdown: None,
                }),
                subs: RwLock::new(HashMap::new()),
                waiters: WaiterRegistry::new(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Server URL this client dials.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Current connection status.
    pub async fn status(&self) -> Status {
        self.inner.state.read().await.status
    }

    /// True when the client is currently connected.
    pub async fn connected(&self) -> bool {
        self.status().await == Status::Connected
    }

    /// Server-assigned id of this connection. Empty until the first
    /// successful connect.
    pub async fn client_id(&self) -> String {
        self.inner.state.read().await.client_id.clone()
    }

    /// True when a subscription for `channel` is registered.
    pub async fn subscribed(&self, channel: &str) -> bool {
        self.inner.subs.read().await.contains_key(channel)
    }

    /// Replace the stored credentials, e.g. after the host renewed an
    /// expired token out of band.
    pub async fn set_credentials(&self, credentials: Credentials) {
        self.inner.state.write().await.credentials = credentials;
    }

    fn next_uid(&self) -> String {
        (self.inner.msg_id.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Dial the server and run the authorization round-trip.
    ///
    /// Fails with [`Error::ClientStatus`] when already connected or closed.
    /// On expired credentials the refresh handler is consulted once and the
    /// authorization retried; a second expiry fails with
    /// [`Error::ClientExpired`].
    pub async fn connect(&self) -> Result<()> {
        let mut state = self.inner.state.write().await;
        if state.status == Status::Connected || state.status == Status::Closed {
            return Err(Error::ClientStatus);
        }
        self.connect_locked(&mut state).await?;
        state.status = Status::Connected;
        Ok(())
    }

    /// One reconnect iteration: fresh dial, authorization and resubscribe.
    ///
    /// Used by [`ReconnectStrategy`](crate::ReconnectStrategy)
    /// implementations; hosts normally call
    /// [`reconnect`](Self::reconnect) instead. On any failure the
    /// just-spawned connection tasks are shut down again and the
    /// subscription registry is left untouched so the next iteration can
    /// retry.
    pub async fn reconnect_once(&self) -> Result<()> {
        let mut state = self.inner.state.write().await;
        if state.status == Status::Closed {
            return Err(Error::ClientStatus);
        }
        let (write_tx, shutdown_rx) = self.connect_locked(&mut state).await?;
        let client_id = state.client_id.clone();
        if let Err(e) = self
            .resubscribe_with(&write_tx, &shutdown_rx, &client_id)
            .await
        {
            if let Some(shutdown) = state.shutdown.take() {
                let _ = shutdown.send(true);
            }
            state.write_tx = None;
            return Err(e);
        }
        state.status = Status::Connected;
        Ok(())
    }

    /// Run `strategy` until it reconnects this client or gives up.
    pub async fn reconnect(&self, strategy: &dyn crate::ReconnectStrategy) -> Result<()> {
        {
            let mut state = self.inner.state.write().await;
            if state.status == Status::Closed {
                return Err(Error::ClientStatus);
            }
            state.status = Status::Reconnecting;
        }
        strategy.reconnect(self).await
    }

    /// Close the connection and clean up everything.
    ///
    /// Best-effort unsubscribes every channel while still connected, then
    /// cancels all reply waiters, signals shutdown to the connection tasks
    /// and marks the client closed. Terminal: subsequent operations fail.
    pub async fn close(&self) {
        let (status, channels) = {
            let state = self.inner.state.read().await;
            let subs = self.inner.subs.read().await;
            (state.status, subs.keys().cloned().collect::<Vec<_>>())
        };

        if status == Status::Connected {
            for channel in channels {
                if let Err(e) = self.unsubscribe(&channel).await {
                    tracing::warn!(channel = %channel, error = %e, "unsubscribe failed during close");
                }
            }
        }

        {
            let mut state = self.inner.state.write().await;
            self.inner.waiters.cancel_all().await;
            if let Some(shutdown) = state.shutdown.take() {
                let _ = shutdown.send(true);
            }
            state.write_tx = None;
            state.status = Status::Closed;
        }
        self.inner.subs.write().await.clear();
    }

    /// Dial, spawn the connection tasks and authorize. Called with the
    /// client lock held; does not touch `state.status`.
    async fn connect_locked(
        &self,
        state: &mut ConnState,
    ) -> Result<(mpsc::Sender<String>, watch::Receiver<bool>)> {
        let (sink, stream) = transport::dial(&self.inner.url).await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (write_tx, write_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (receive_tx, receive_rx) = mpsc::channel(QUEUE_CAPACITY);

        tokio::spawn(self.clone().read_loop(stream, receive_tx, shutdown_rx.clone()));
        tokio::spawn(self.clone().write_loop(sink, write_rx, shutdown_rx.clone()));
        tokio::spawn(self.clone().dispatch_loop(receive_rx, shutdown_rx.clone()));

        state.write_tx = Some(write_tx.clone());
        state.shutdown = Some(shutdown_tx);

        match self.authorize(state, &write_tx, &shutdown_rx).await {
            Ok(()) => Ok((write_tx, shutdown_rx)),
            Err(e) => {
                if let Some(shutdown) = state.shutdown.take() {
                    let _ = shutdown.send(true);
                }
                state.write_tx = None;
                Err(e)
            }
        }
    }

    /// The connect round-trip, including the one-shot refresh retry for
    /// expired credentials and scheduling of the TTL refresh timer.
    async fn authorize(
        &self,
        state: &mut ConnState,
        write_tx: &mpsc::Sender<String>,
        shutdown_rx: &watch::Receiver<bool>,
    ) -> Result<()> {
        let mut body = self
            .send_connect(write_tx, shutdown_rx, &state.credentials)
            .await?;

        if body.expires && body.expired {
            state.credentials = self.refresh_credentials().await?;
            body = self
                .send_connect(write_tx, shutdown_rx, &state.credentials)
                .await?;
            if body.expires && body.expired {
                return Err(Error::ClientExpired);
            }
        }

        state.client_id = body.client.clone();
        tracing::debug!(client_id = %body.client, "authorized");

        if body.expires {
            self.spawn_refresh_timer(body.ttl, shutdown_rx.clone());
        }
        Ok(())
    }

    /// Tear down the current connection after a transport failure.
    ///
    /// Only a connected client transitions here; teardown during close or
    /// an in-progress reconnect dial is left to those code paths. Cancels
    /// waiters first so blocked callers return, then signals shutdown and
    /// notifies the host.
    async fn handle_disconnect(&self, err: Error) {
        {
            let mut state = self.inner.state.write().await;
            if state.status != Status::Connected {
                return;
            }
            self.inner.waiters.cancel_all().await;
            if let Some(shutdown) = state.shutdown.take() {
                let _ = shutdown.send(true);
            }
            state.write_tx = None;
            state.status = Status::Disconnected;
        }
        tracing::debug!(error = %err, "connection lost");

        if let Some(on_disconnect) = &self.inner.events.on_disconnect {
            if let Err(e) = on_disconnect(self.clone()).await {
                tracing::warn!(error = %e, "disconnect handler failed");
            }
        }
    }

    /// Route a critical error to the host, or log and close when no error
    /// handler is installed.
    async fn handle_error(&self, err: Error) {
        match &self.inner.events.on_error {
            Some(on_error) => on_error(err).await,
            None => {
                tracing::error!(error = %err, "closing client on unhandled error");
                self.close().await;
            }
        }
    }

    // ---------------------------------------------------------------
    // Connection tasks
    // ---------------------------------------------------------------

    async fn read_loop(
        self,
        mut stream: WsSource,
        receive_tx: mpsc::Sender<String>,
        shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            match stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    if *shutdown_rx.borrow() {
                        return;
                    }
                    if self.inner.config.debug {
                        tracing::debug!(frame = %text, "frame received");
                    }
                    if receive_tx.send(text).await.is_err() {
                        return;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    self.handle_disconnect(Error::Transport(
                        "connection closed by peer".to_string(),
                    ))
                    .await;
                    return;
                }
                Some(Ok(_)) => {} // binary/ping/pong frames are not part of the protocol
                Some(Err(e)) => {
                    self.handle_disconnect(Error::Transport(e.to_string())).await;
                    return;
                }
            }
        }
    }

    async fn write_loop(
        self,
        mut sink: WsSink,
        mut write_rx: mpsc::Receiver<String>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                frame = write_rx.recv() => {
                    let Some(frame) = frame else { return };
                    if self.inner.config.debug {
                        tracing::debug!(frame = %frame, "frame sent");
                    }
                    let deadline = self.inner.config.request_timeout;
                    match tokio::time::timeout(deadline, sink.send(WsMessage::Text(frame))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => self.handle_error(Error::Transport(e.to_string())).await,
                        Err(_) => self.handle_error(Error::Timeout).await,
                    }
                }
                _ = wait_for_shutdown(&mut shutdown_rx) => {
                    // Sole owner of the sink: closing here closes the
                    // transport exactly once.
                    let _ = sink.close().await;
                    return;
                }
            }
        }
    }

    async fn dispatch_loop(
        self,
        mut receive_rx: mpsc::Receiver<String>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                frame = receive_rx.recv() => {
                    let Some(frame) = frame else { return };
                    if let Err(e) = self.handle_frame(&frame).await {
                        self.handle_error(e).await;
                    }
                }
                _ = wait_for_shutdown(&mut shutdown_rx) => return,
            }
        }
    }

    /// Decode one frame and route its replies, preserving batch order.
    async fn handle_frame(&self, frame: &str) -> Result<()> {
        for reply in codec::decode_frame(frame)? {
            if reply.is_async() {
                if let Err(e) = self.handle_async_reply(reply).await {
                    self.handle_error(e).await;
                }
            } else {
                self.inner.waiters.deliver(reply).await;
            }
        }
        Ok(())
    }

    /// Route a server-initiated event by method.
    async fn handle_async_reply(&self, reply: Reply) -> Result<()> {
        if !reply.error.is_empty() {
            // Should never occur in the usual workflow.
            return Err(Error::Server(reply.error));
        }
        match reply.method.as_str() {
            "message" => {
                let msg: Message = reply
                    .decode_body()
                    .map_err(|_| Error::Protocol("malformed message received from server".into()))?;
                let channel = msg.channel.clone();
                match self.sub_events(&channel).await {
                    Some(events) => self.dispatch_message(&channel, &events, msg).await,
                    None => {
                        tracing::warn!(channel = %channel, "message received but client not subscribed on channel");
                    }
                }
            }
            "join" => {
                let Ok(body) = reply.decode_body::<JoinLeaveBody>() else {
                    tracing::warn!("malformed join message");
                    return Ok(());
                };
                match self.sub_events(&body.channel).await {
                    Some(events) => {
                        if let Some(on_join) = &events.on_join {
                            let sub = self.subscription_handle(&body.channel);
                            if let Err(e) = on_join(sub, body.data).await {
                                tracing::debug!(channel = %body.channel, error = %e, "join handler failed");
                            }
                        }
                    }
                    None => {
                        tracing::warn!(channel = %body.channel, "join received but client not subscribed on channel");
                    }
                }
            }
            "leave" => {
                let Ok(body) = reply.decode_body::<JoinLeaveBody>() else {
                    tracing::warn!("malformed leave message");
                    return Ok(());
                };
                match self.sub_events(&body.channel).await {
                    Some(events) => {
                        if let Some(on_leave) = &events.on_leave {
                            let sub = self.subscription_handle(&body.channel);
                            if let Err(e) = on_leave(sub, body.data).await {
                                tracing::debug!(channel = %body.channel, error = %e, "leave handler failed");
                            }
                        }
                    }
                    None => {
                        tracing::warn!(channel = %body.channel, "leave received but client not subscribed on channel");
                    }
                }
            }
            _ => {} // unknown methods are ignored
        }
        Ok(())
    }

    /// Advance the channel's last seen message id, then invoke the message
    /// callback. The registry lock is released before the callback runs.
    async fn dispatch_message(&self, channel: &str, events: &SubEventHandler, msg: Message) {
        {
            let mut subs = self.inner.subs.write().await;
            if let Some(sub) = subs.get_mut(channel) {
                sub.last_message_id = Some(msg.uid.clone());
            }
        }
        if let Some(on_message) = &events.on_message {
            let sub = self.subscription_handle(channel);
            if let Err(e) = on_message(sub, msg).await {
                tracing::debug!(channel = %channel, error = %e, "message handler failed");
            }
        }
    }

    /// Snapshot the event callbacks for a channel: read-lock, clone,
    /// release, so no registry lock is held across handler invocations.
    async fn sub_events(&self, channel: &str) -> Option<SubEventHandler> {
        self.inner
            .subs
            .read()
            .await
            .get(channel)
            .map(|s| s.events.clone())
    }

    fn subscription_handle(&self, channel: &str) -> Subscription {
        Subscription::new(channel, Arc::downgrade(&self.inner))
    }

    // ---------------------------------------------------------------
    // Command layer
    // ---------------------------------------------------------------

    /// Snapshot the outbound queue and shutdown signal of the live
    /// connection, or fail when there is none.
    async fn channel_handles(&self) -> Result<(mpsc::Sender<String>, watch::Receiver<bool>)> {
        let state = self.inner.state.read().await;
        match (&state.write_tx, &state.shutdown) {
            (Some(write_tx), Some(shutdown)) => Ok((write_tx.clone(), shutdown.subscribe())),
            _ => Err(Error::ClientDisconnected),
        }
    }

    /// Issue one synchronous command and wait for its reply.
    async fn request(&self, method: &str, params: impl Serialize) -> Result<Reply> {
        let (write_tx, shutdown_rx) = self.channel_handles().await?;
        self.request_with(&write_tx, &shutdown_rx, method, params)
            .await
    }

    /// Like [`request`](Self::request) with explicit connection handles,
    /// for callers already holding the client lock.
    async fn request_with(
        &self,
        write_tx: &mpsc::Sender<String>,
        shutdown_rx: &watch::Receiver<bool>,
        method: &str,
        params: impl Serialize,
    ) -> Result<Reply> {
        let uid = self.next_uid();
        let cmd = Command::new(uid.clone(), method, params)?;
        let frame = codec::encode_command(&cmd)?;

        let rx = self.inner.waiters.register(&uid).await?;
        let result = self
            .send_and_wait(write_tx, shutdown_rx.clone(), frame, rx)
            .await;
        // The waiter must be gone on every exit path, including timeout
        // and shutdown.
        self.inner.waiters.remove(&uid).await;
        result
    }

    async fn send_and_wait(
        &self,
        write_tx: &mpsc::Sender<String>,
        mut shutdown_rx: watch::Receiver<bool>,
        frame: String,
        mut rx: tokio::sync::oneshot::Receiver<Reply>,
    ) -> Result<Reply> {
        if *shutdown_rx.borrow() {
            return Err(Error::ClientDisconnected);
        }
        write_tx
            .send(frame)
            .await
            .map_err(|_| Error::ClientDisconnected)?;

        tokio::select! {
            reply = &mut rx => reply.map_err(|_| Error::WaiterClosed),
            _ = tokio::time::sleep(self.inner.config.request_timeout) => Err(Error::Timeout),
            _ = wait_for_shutdown(&mut shutdown_rx) => Err(Error::ClientDisconnected),
        }
    }

    /// Issue a command and decode its reply body, surfacing a server-side
    /// `error` string as [`Error::Server`].
    async fn round_trip<B: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: impl Serialize,
    ) -> Result<B> {
        let reply = self.request(method, params).await?;
        if !reply.error.is_empty() {
            return Err(Error::Server(reply.error));
        }
        reply.decode_body()
    }

    async fn send_connect(
        &self,
        write_tx: &mpsc::Sender<String>,
        shutdown_rx: &watch::Receiver<bool>,
        credentials: &Credentials,
    ) -> Result<ConnectBody> {
        let params = ConnectParams {
            user: credentials.user.clone(),
            timestamp: credentials.timestamp.clone(),
            info: credentials.info.clone(),
            token: credentials.token.clone(),
        };
        let reply = self
            .request_with(write_tx, shutdown_rx, "connect", params)
            .await?;
        if !reply.error.is_empty() {
            return Err(Error::Server(reply.error));
        }
        reply.decode_body()
    }

    // ---------------------------------------------------------------
    // Credential refresh
    // ---------------------------------------------------------------

    async fn refresh_credentials(&self) -> Result<Credentials> {
        let Some(on_refresh) = &self.inner.events.on_refresh else {
            return Err(Error::Config(
                "refresh handler must be set to renew expired credentials".into(),
            ));
        };
        on_refresh().await
    }

    /// Arm the single-shot refresh timer for this connection. The timer
    /// selects on the connection's shutdown signal, so a later connection
    /// (with a fresh signal) supersedes it.
    fn spawn_refresh_timer(&self, ttl: i64, mut shutdown_rx: watch::Receiver<bool>) {
        let client = self.clone();
        let ttl = ttl.max(0) as u64;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_secs(ttl)) => {
                    if let Err(e) = client.send_refresh().await {
                        tracing::warn!(error = %e, "credentials refresh failed");
                    }
                }
                _ = wait_for_shutdown(&mut shutdown_rx) => {}
            }
        });
    }

    /// Obtain fresh credentials from the host, store them and run the
    /// refresh round-trip. Reschedules itself while the server keeps
    /// reporting an expiring connection.
    async fn send_refresh(&self) -> Result<()> {
        let credentials = self.refresh_credentials().await?;
        {
            self.inner.state.write().await.credentials = credentials.clone();
        }

        let params = ConnectParams {
            user: credentials.user,
            timestamp: credentials.timestamp,
            info: credentials.info,
            token: credentials.token,
        };
        let body: ConnectBody = self.round_trip("refresh", params).await?;

        if body.expires {
            if body.expired {
                return Err(Error::ClientExpired);
            }
            let shutdown_rx = {
                let state = self.inner.state.read().await;
                match &state.shutdown {
                    Some(shutdown) => shutdown.subscribe(),
                    None => return Err(Error::ClientDisconnected),
                }
            };
            self.spawn_refresh_timer(body.ttl, shutdown_rx);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Subscriptions
    // ---------------------------------------------------------------

    /// Subscribe to a channel.
    ///
    /// The subscription is registered before the command is sent and
    /// removed again on any failure. Subscribing to a channel that already
    /// has a subscription fails with [`Error::AlreadySubscribed`]; the
    /// existing subscription is untouched.
    pub async fn subscribe(&self, channel: &str, events: SubEventHandler) -> Result<Subscription> {
        if !self.connected().await {
            return Err(Error::ClientDisconnected);
        }
        let client_id = self.client_id().await;
        let private_sign = self.private_sign(channel, &client_id).await?;

        {
            let mut subs = self.inner.subs.write().await;
            if subs.contains_key(channel) {
                return Err(Error::AlreadySubscribed(channel.to_string()));
            }
            subs.insert(
                channel.to_string(),
                SubState {
                    last_message_id: None,
                    events: events.clone(),
                },
            );
        }

        let body = match self
            .send_subscribe(None, channel, None, private_sign, &client_id)
            .await
        {
            Ok(body) if body.status => body,
            Ok(_) => {
                self.inner.subs.write().await.remove(channel);
                return Err(Error::BadSubscribeStatus);
            }
            Err(e) => {
                self.inner.subs.write().await.remove(channel);
                return Err(e);
            }
        };

        self.apply_subscribe_body(channel, &events, body).await;
        Ok(self.subscription_handle(channel))
    }

    /// Unsubscribe from a channel. Unknown channels succeed silently
    /// without wire traffic.
    pub async fn unsubscribe(&self, channel: &str) -> Result<()> {
        let events = {
            let subs = self.inner.subs.read().await;
            match subs.get(channel) {
                Some(sub) => sub.events.clone(),
                None => return Ok(()),
            }
        };

        let body: UnsubscribeBody = self
            .round_trip(
                "unsubscribe",
                ChannelParams {
                    channel: channel.to_string(),
                },
            )
            .await?;
        if !body.status {
            return Err(Error::BadUnsubscribeStatus);
        }
        self.inner.subs.write().await.remove(channel);

        if let Some(on_unsubscribe) = &events.on_unsubscribe {
            let sub = self.subscription_handle(channel);
            if let Err(e) = on_unsubscribe(sub).await {
                tracing::debug!(channel = %channel, error = %e, "unsubscribe handler failed");
            }
        }
        Ok(())
    }

    /// Obtain the private-channel signature when the channel name carries
    /// the configured prefix.
    async fn private_sign(&self, channel: &str, client_id: &str) -> Result<Option<PrivateSign>> {
        if !channel.starts_with(&self.inner.config.private_channel_prefix) {
            return Ok(None);
        }
        let Some(on_private_sub) = &self.inner.events.on_private_sub else {
            return Err(Error::Config(
                "private subscription handler must be set to subscribe on private channels".into(),
            ));
        };
        let request = PrivateRequest {
            client_id: client_id.to_string(),
            channel: channel.to_string(),
        };
        on_private_sub(request).await.map(Some)
    }

    async fn send_subscribe(
        &self,
        handles: Option<(&mpsc::Sender<String>, &watch::Receiver<bool>)>,
        channel: &str,
        last_message_id: Option<String>,
        private_sign: Option<PrivateSign>,
        client_id: &str,
    ) -> Result<SubscribeBody> {
        let mut params = SubscribeParams {
            channel: channel.to_string(),
            ..Default::default()
        };
        if let Some(last) = last_message_id {
            params.recover = Some(true);
            params.last = Some(last);
        }
        if let Some(sign) = private_sign {
            params.client = Some(client_id.to_string());
            params.info = Some(sign.info);
            params.sign = Some(sign.sign);
        }

        let reply = match handles {
            Some((write_tx, shutdown_rx)) => {
                self.request_with(write_tx, shutdown_rx, "subscribe", params)
                    .await?
            }
            None => self.request("subscribe", params).await?,
        };
        if !reply.error.is_empty() {
            return Err(Error::Server(reply.error));
        }
        reply.decode_body()
    }

    /// Apply a successful subscribe reply: replay recovered messages
    /// oldest-first (the server returns them newest-first), or take over
    /// the server's last message id when there is nothing to replay.
    async fn apply_subscribe_body(
        &self,
        channel: &str,
        events: &SubEventHandler,
        body: SubscribeBody,
    ) {
        if !body.messages.is_empty() {
            for msg in body.messages.into_iter().rev() {
                self.dispatch_message(channel, events, msg).await;
            }
        } else {
            let mut subs = self.inner.subs.write().await;
            if let Some(sub) = subs.get_mut(channel) {
                sub.last_message_id = Some(body.last);
            }
        }
    }

    /// Re-subscribe every registered channel after a reconnect, asking the
    /// server to recover messages missed since the last seen id. The first
    /// failure aborts and fails the reconnect iteration; the registry is
    /// kept so the next iteration retries.
    async fn resubscribe_with(
        &self,
        write_tx: &mpsc::Sender<String>,
        shutdown_rx: &watch::Receiver<bool>,
        client_id: &str,
    ) -> Result<()> {
        let snapshot: Vec<(String, Option<String>, SubEventHandler)> = {
            let subs = self.inner.subs.read().await;
            subs.iter()
                .map(|(channel, sub)| {
                    (channel.clone(), sub.last_message_id.clone(), sub.events.clone())
                })
                .collect()
        };

        for (channel, last_message_id, events) in snapshot {
            let private_sign = self.private_sign(&channel, client_id).await?;
            let body = self
                .send_subscribe(
                    Some((write_tx, shutdown_rx)),
                    &channel,
                    last_message_id,
                    private_sign,
                    client_id,
                )
                .await?;
            if !body.status {
                return Err(Error::BadSubscribeStatus);
            }
            tracing::debug!(channel = %channel, recovered = body.recovered, "resubscribed");
            self.apply_subscribe_body(&channel, &events, body).await;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Channel commands
    // ---------------------------------------------------------------

    pub(crate) async fn publish(&self, channel: &str, data: &[u8]) -> Result<()> {
        let data: serde_json::Value = serde_json::from_slice(data)?;
        let body: PublishBody = self
            .round_trip(
                "publish",
                PublishParams {
                    channel: channel.to_string(),
                    data,
                },
            )
            .await?;
        if !body.status {
            return Err(Error::BadPublishStatus);
        }
        Ok(())
    }

    pub(crate) async fn history(&self, channel: &str) -> Result<Vec<Message>> {
        let body: HistoryBody = self
            .round_trip(
                "history",
                ChannelParams {
                    channel: channel.to_string(),
                },
            )
            .await?;
        Ok(body.data)
    }

    pub(crate) async fn presence(&self, channel: &str) -> Result<HashMap<String, ClientInfo>> {
        let body: PresenceBody = self
            .round_trip(
                "presence",
                ChannelParams {
                    channel: channel.to_string(),
                },
            )
            .await?;
        Ok(body.data)
    }
}
