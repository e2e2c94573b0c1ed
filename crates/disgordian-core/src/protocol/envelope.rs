//! Gateway envelope (JSON).
//!
//! The core stores `d` as `RawValue` so consumers decode the payload lazily,
//! only once they know which shape the `op`/`t` pair implies.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::Opcode;
use crate::error::{DisgordianError, Result};

/// Envelope as it appears on the wire.
///
/// `op` is optional here so a missing opcode is told apart from opcode 0, and
/// wide enough that any integer opcode decodes.
#[derive(Debug, Deserialize)]
struct WireEnvelope {
    #[serde(default)]
    op: Option<i64>,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    d: Option<Box<RawValue>>,
}

/// Decoded envelope. The opcode is guaranteed present.
#[derive(Debug)]
pub struct Envelope {
    /// Protocol role.
    pub op: Opcode,
    /// Sequence number (Dispatch only).
    pub s: Option<u64>,
    /// Event type tag (Dispatch only).
    pub t: Option<String>,
    /// Payload, stored as raw JSON (lazy parsing).
    pub d: Option<Box<RawValue>>,
}

impl Envelope {
    pub fn is_dispatch(&self) -> bool {
        self.op == Opcode::Dispatch
    }

    /// Decode `d` into a concrete shape.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = self
            .d
            .as_ref()
            .ok_or_else(|| DisgordianError::Decode(format!("op {} has no payload", self.op.code())))?;
        serde_json::from_str(raw.get())
            .map_err(|e| DisgordianError::Decode(format!("op {} payload: {e}", self.op.code())))
    }
}

/// Decode one envelope from a frame body.
pub fn decode(bytes: &[u8]) -> Result<Envelope> {
    let wire: WireEnvelope = serde_json::from_slice(bytes)
        .map_err(|e| DisgordianError::Decode(format!("invalid envelope json: {e}")))?;
    from_wire(wire)
}

/// Decode one envelope from a text frame.
pub fn decode_str(s: &str) -> Result<Envelope> {
    decode(s.as_bytes())
}

fn from_wire(wire: WireEnvelope) -> Result<Envelope> {
    let op = wire
        .op
        .ok_or_else(|| DisgordianError::Decode("envelope is missing op".into()))?;
    Ok(Envelope {
        op: Opcode::from(op),
        s: wire.s,
        t: wire.t,
        d: wire.d,
    })
}

#[derive(Serialize)]
struct OutboundEnvelope<'a, T: Serialize> {
    op: i64,
    d: &'a T,
}

/// Encode an outbound frame: `{"op":N,"d":...}`.
pub fn encode<T: Serialize>(op: Opcode, d: &T) -> Result<String> {
    serde_json::to_string(&OutboundEnvelope { op: op.code(), d })
        .map_err(|e| DisgordianError::Internal(format!("json encode failed: {e}")))
}

/// Heartbeat frame carrying the last seen sequence, or `null` before any.
pub fn heartbeat(seq: Option<u64>) -> Result<String> {
    encode(Opcode::Heartbeat, &seq)
}
