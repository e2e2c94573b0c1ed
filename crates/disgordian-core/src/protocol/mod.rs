//! Gateway wire protocol.
//!
//! - `envelope`: the JSON envelope (`op`/`s`/`t`/`d`) with a lazily decoded
//!   `RawValue` payload, plus encode helpers for outbound frames.
//! - `payload`: typed shapes for the handshake payloads the session needs.
//!
//! All parsers are panic-free: malformed input is reported as
//! `DisgordianError::Decode` so a hostile or buggy peer cannot crash the client.

pub mod envelope;
pub mod payload;

pub use envelope::{decode, decode_str, encode, heartbeat, Envelope};

/// Event type tag of the Dispatch that completes the handshake.
pub const READY_EVENT: &str = "READY";

/// Envelope opcode.
///
/// Unrecognised values, including ones outside the byte range, are preserved
/// as `Other` so newer peers do not break older clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// 0: application event (carries `s` and `t`).
    Dispatch,
    /// 1: liveness ping (client → server, or server asking for one).
    Heartbeat,
    /// 2: login.
    Identify,
    /// 7: server asks the client to reconnect.
    Reconnect,
    /// 9: session was invalidated.
    InvalidSession,
    /// 10: first server frame, carries the heartbeat interval.
    Hello,
    /// 11: server acknowledged a heartbeat.
    HeartbeatAck,
    /// Anything else.
    Other(i64),
}

impl Opcode {
    pub fn code(self) -> i64 {
        match self {
            Opcode::Dispatch => 0,
            Opcode::Heartbeat => 1,
            Opcode::Identify => 2,
            Opcode::Reconnect => 7,
            Opcode::InvalidSession => 9,
            Opcode::Hello => 10,
            Opcode::HeartbeatAck => 11,
            Opcode::Other(n) => n,
        }
    }

    /// Short name used as a log field / metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::Dispatch => "dispatch",
            Opcode::Heartbeat => "heartbeat",
            Opcode::Identify => "identify",
            Opcode::Reconnect => "reconnect",
            Opcode::InvalidSession => "invalid_session",
            Opcode::Hello => "hello",
            Opcode::HeartbeatAck => "heartbeat_ack",
            Opcode::Other(_) => "other",
        }
    }
}

impl From<i64> for Opcode {
    fn from(n: i64) -> Self {
        match n {
            0 => Opcode::Dispatch,
            1 => Opcode::Heartbeat,
            2 => Opcode::Identify,
            7 => Opcode::Reconnect,
            9 => Opcode::InvalidSession,
            10 => Opcode::Hello,
            11 => Opcode::HeartbeatAck,
            other => Opcode::Other(other),
        }
    }
}
