//! Client configuration and connection credentials

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default prefix marking channels that need a host-computed signature.
pub const DEFAULT_PRIVATE_CHANNEL_PREFIX: &str = "$";

/// Default request timeout, also used as the write deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Connection credentials.
///
/// All fields are opaque strings prepared by the host application (usually
/// signed server-side) and are never inspected by the client.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub user: String,
    pub timestamp: String,
    pub info: String,
    pub token: String,
}

impl Credentials {
    pub fn new(
        user: impl Into<String>,
        timestamp: impl Into<String>,
        info: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            timestamp: timestamp.into(),
            info: info.into(),
            token: token.into(),
        }
    }

    /// Current unix time in seconds as a string, the format connection
    /// timestamps are exchanged in.
    pub fn timestamp_now() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            .to_string()
    }
}

/// Client options.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a synchronous command waits for its reply. Also applied as
    /// the deadline for each outbound frame write.
    pub request_timeout: Duration,
    /// Channels starting with this prefix require a signature from the
    /// private-subscription handler.
    pub private_channel_prefix: String,
    /// Emit frame-level debug events.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            private_channel_prefix: DEFAULT_PRIVATE_CHANNEL_PREFIX.to_string(),
            debug: false,
        }
    }
}
