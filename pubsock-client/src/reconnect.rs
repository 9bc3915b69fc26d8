//! Reconnect strategies
//!
//! A strategy drives repeated reconnect attempts after the host calls
//! [`PubsockClient::reconnect`]: it sleeps between iterations and calls
//! [`PubsockClient::reconnect_once`] until one succeeds or the attempt cap
//! is reached.
//!
//! Two strategies are provided: [`PeriodicReconnect`] sleeps a fixed
//! interval, [`BackoffReconnect`] grows the sleep exponentially with an
//! optional jitter to ease contention when many clients lose the same
//! server.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use pubsock_core::{Error, Result};

use crate::client::PubsockClient;

/// Drives reconnect attempts until success or giving up.
#[async_trait]
pub trait ReconnectStrategy: Send + Sync {
    /// Keep attempting to reconnect `client`. Returns `Ok(())` once an
    /// attempt succeeds, [`Error::ReconnectFailed`] when the strategy gives
    /// up.
    async fn reconnect(&self, client: &PubsockClient) -> Result<()>;
}

/// Fixed-interval reconnect.
#[derive(Debug, Clone)]
pub struct PeriodicReconnect {
    /// Sleep between attempts.
    pub interval: Duration,
    /// Maximum number of attempts, 0 means retry forever.
    pub num_reconnect: u32,
}

impl Default for PeriodicReconnect {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            num_reconnect: 0,
        }
    }
}

#[async_trait]
impl ReconnectStrategy for PeriodicReconnect {
    async fn reconnect(&self, client: &PubsockClient) -> Result<()> {
        let mut attempts = 0u32;
        loop {
            if self.num_reconnect > 0 && attempts >= self.num_reconnect {
                return Err(Error::ReconnectFailed);
            }
            sleep(self.interval).await;
            attempts += 1;

            match client.reconnect_once().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(attempt = attempts, error = %e, "reconnect attempt failed");
                }
            }
        }
    }
}

/// Exponential backoff reconnect with optional jitter.
#[derive(Debug, Clone)]
pub struct BackoffReconnect {
    /// Maximum number of attempts, 0 means retry forever.
    pub num_reconnect: u32,
    /// Multiplying factor applied per attempt.
    pub factor: f64,
    /// Randomize each sleep within +/-50% of the computed value.
    pub jitter: bool,
    /// First sleep duration.
    pub min: Duration,
    /// Cap for the computed sleep duration.
    pub max: Duration,
}

impl Default for BackoffReconnect {
    fn default() -> Self {
        Self {
            num_reconnect: 0,
            factor: 2.0,
            jitter: true,
            min: Duration::from_millis(100),
            max: Duration::from_secs(10),
        }
    }
}

impl BackoffReconnect {
    /// Sleep duration for the given 0-based attempt:
    /// `min(max, min * factor^attempt)`, then jittered when enabled.
    fn delay(&self, attempt: u32) -> Duration {
        let base = self.min.as_secs_f64() * self.factor.powi(attempt as i32);
        let capped = base.min(self.max.as_secs_f64());
        let secs = if self.jitter {
            use rand::Rng;
            capped * rand::thread_rng().gen_range(0.5..1.5)
        } else {
            capped
        };
        Duration::from_secs_f64(secs)
    }
}

#[async_trait]
impl ReconnectStrategy for BackoffReconnect {
    async fn reconnect(&self, client: &PubsockClient) -> Result<()> {
        let mut attempts = 0u32;
        loop {
            if self.num_reconnect > 0 && attempts >= self.num_reconnect {
                return Err(Error::ReconnectFailed);
            }
            sleep(self.delay(attempts)).await;
            attempts += 1;

            match client.reconnect_once().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(attempt = attempts, error = %e, "reconnect attempt failed");
                }
            }
        }
    }
}
