//! Codec for pubsock frames
//!
//! Outbound frames carry exactly one command object. Inbound frames carry
//! either a single reply object or an array of replies; the two are told
//! apart by the first non-whitespace byte. The array form preserves server
//! ordering, so callers must process the returned replies in order.

use crate::error::{Error, Result};
use crate::types::{Command, Reply};

/// Encode a command into a text frame.
pub fn encode_command(cmd: &Command) -> Result<String> {
    serde_json::to_string(cmd).map_err(Error::from)
}

/// Decode one inbound text frame into replies.
///
/// An empty (or all-whitespace) frame yields no replies. A frame starting
/// with `{` is a single reply; `[` is an ordered batch. Anything else is a
/// protocol error.
pub fn decode_frame(frame: &str) -> Result<Vec<Reply>> {
    let trimmed = frame.trim_start();
    let Some(first) = trimmed.bytes().next() else {
        return Ok(Vec::new());
    };
    match first {
        b'{' => {
            let reply: Reply = serde_json::from_str(trimmed)?;
            Ok(vec![reply])
        }
        b'[' => serde_json::from_str(trimmed).map_err(Error::from),
        other => Err(Error::Protocol(format!(
            "unexpected frame start byte {:?}",
            other as char
        ))),
    }
}
