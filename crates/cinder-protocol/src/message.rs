use serde::{Deserialize, Serialize};

use cinder_core::store::{Intent, OriginId, PlaybackState};

/// A message on the sync channel.
///
/// Serialized as JSON with a `kind` tag. Per-port FIFO ordering is the
/// transport's job; nothing here assumes cross-port ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SyncMessage {
    /// A late-attaching peer announces itself and asks for state.
    Hello,
    /// Reply to `hello`: the full authoritative state, so the new peer
    /// converges without replaying history.
    Snapshot { state: PlaybackState },
    /// A locally-originated intent, mirrored to the peer. The origin tag
    /// prevents the receiving side from forwarding it back.
    Dispatch { intent: Intent, origin: OriginId },
    /// Orderly detach; the sender stops forwarding after this.
    Bye,
}

impl SyncMessage {
    /// Serialize as a newline-terminated JSON line.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Parse a single JSON message (trailing newline tolerated).
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw.trim_end())
    }
}
