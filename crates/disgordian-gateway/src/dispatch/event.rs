//! The event value handed to handlers.

use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

use disgordian_core::error::{DisgordianError, Result};
use disgordian_core::protocol::Envelope;

/// One application event (op 0) as handed to handlers.
#[derive(Debug)]
pub struct DispatchEvent {
    /// Sequence number the peer attached, if any.
    pub seq: Option<u64>,
    /// Event type tag (`t`), empty if the peer sent none.
    pub kind: String,
    /// Raw payload, decoded lazily by the handler.
    pub data: Option<Box<RawValue>>,
}

impl DispatchEvent {
    pub fn from_envelope(env: Envelope) -> Self {
        Self {
            seq: env.s,
            kind: env.t.unwrap_or_default(),
            data: env.d,
        }
    }

    /// Decode the payload into the shape this event type implies.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = self
            .data
            .as_ref()
            .ok_or_else(|| DisgordianError::Decode(format!("{} has no payload", self.kind)))?;
        serde_json::from_str(raw.get())
            .map_err(|e| DisgordianError::Decode(format!("{} payload: {e}", self.kind)))
    }
}
