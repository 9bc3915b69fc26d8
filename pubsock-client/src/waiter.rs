//! Reply waiter registry
//!
//! Every synchronous command registers a one-shot delivery slot keyed by its
//! correlation uid before the command is written to the wire. The dispatch
//! task completes the slot when the matching reply arrives; teardown cancels
//! every slot at once by dropping the senders, which the waiting side
//! observes as a closed channel.
//!
//! # Slot semantics
//!
//! One writer, one reader, capacity one, closeable - exactly what
//! `tokio::sync::oneshot` provides. A reader receives either the reply or
//! the closed signal, never both.

use std::collections::HashMap;

use tokio::sync::{oneshot, Mutex};

use pubsock_core::{Error, Reply, Result};

/// Registry of pending reply slots keyed by command uid.
#[derive(Default)]
pub(crate) struct WaiterRegistry {
    waiters: Mutex<HashMap<String, oneshot::Sender<Reply>>>,
}

impl WaiterRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a slot for `uid`. Uniqueness is enforced under the registry
    /// lock; a duplicate uid is rejected without touching the existing slot.
    pub(crate) async fn register(&self, uid: &str) -> Result<oneshot::Receiver<Reply>> {
        let mut waiters = self.waiters.lock().await;
        if waiters.contains_key(uid) {
            return Err(Error::DuplicateWaiter);
        }
        let (tx, rx) = oneshot::channel();
        waiters.insert(uid.to_string(), tx);
        Ok(rx)
    }

    /// Deliver a reply to the slot registered for its uid.
    ///
    /// A reply without a registered waiter is dropped: it is either a late
    /// reply to a timed-out command or a duplicate, which is a protocol
    /// violation worth logging but not acting on.
    pub(crate) async fn deliver(&self, reply: Reply) {
        let waiter = self.waiters.lock().await.remove(&reply.uid);
        match waiter {
            Some(tx) => {
                // Send fails when the receiver gave up (timeout/shutdown)
                // between the map lookup and here; nothing left to do then.
                let _ = tx.send(reply);
            }
            None => {
                tracing::warn!(uid = %reply.uid, "reply for unknown uid dropped");
            }
        }
    }

    /// Remove a slot without completing it. Idempotent.
    pub(crate) async fn remove(&self, uid: &str) {
        self.waiters.lock().await.remove(uid);
    }

    /// Close every registered slot and drop the entries. Waiting callers
    /// observe a closed channel.
    pub(crate) async fn cancel_all(&self) {
        self.waiters.lock().await.clear();
    }

    #[cfg(test)]
    pub(crate) async fn pending(&self) -> usize {
        self.waiters.lock().await.len()
    }
}
