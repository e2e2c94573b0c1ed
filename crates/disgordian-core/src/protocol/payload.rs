//! Typed payloads for the handshake.
//!
//! Only the shapes the session itself needs live here. Event payloads are left
//! to handlers.

use serde::{Deserialize, Serialize};

/// `d` of the Hello envelope (op 10).
#[derive(Debug, Deserialize)]
pub struct Hello {
    /// Milliseconds between heartbeats. Absent and zero are both invalid.
    #[serde(default)]
    pub heartbeat_interval: Option<u64>,
}

/// Static client metadata sent with Identify.
#[derive(Debug, Clone, Serialize)]
pub struct ClientProperties {
    #[serde(rename = "$os")]
    pub os: String,
    #[serde(rename = "$browser")]
    pub browser: String,
    #[serde(rename = "$device")]
    pub device: String,
    #[serde(rename = "$referrer")]
    pub referrer: String,
    #[serde(rename = "$referring_domain")]
    pub referring_domain: String,
}

/// `d` of the Identify envelope (op 2).
#[derive(Debug, Clone, Serialize)]
pub struct Identify {
    pub token: String,
    pub properties: ClientProperties,
    pub compress: bool,
    pub large_threshold: u32,
    /// `[shard_index, shard_count]`.
    pub shard: [u32; 2],
}

/// Session metadata from the READY dispatch. Every field is optional; the
/// session only logs it.
#[derive(Debug, Default, Deserialize)]
pub struct ReadyInfo {
    #[serde(default)]
    pub v: Option<u32>,
    #[serde(default)]
    pub session_id: Option<String>,
}
