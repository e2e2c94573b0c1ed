//! Decode-once codec for the transport layer.
//!
//! - Text and Binary frames => Envelope (lazy `RawValue` for `d`)
//! - Close is surfaced for lifecycle management

use disgordian_core::{error::Result, protocol};

use super::Frame;

#[derive(Debug)]
pub enum Inbound {
    Envelope { env: protocol::Envelope, bytes_len: usize },
    Close { code: Option<u16> },
}

pub fn decode(frame: Frame) -> Result<Inbound> {
    match frame {
        Frame::Text(s) => {
            let env = protocol::decode_str(&s)?;
            Ok(Inbound::Envelope { env, bytes_len: s.len() })
        }
        // uncompressed JSON may also arrive in binary frames
        Frame::Binary(b) => {
            let env = protocol::decode(&b)?;
            Ok(Inbound::Envelope { env, bytes_len: b.len() })
        }
        Frame::Close { code, reason } => {
            tracing::debug!(?code, %reason, "peer sent close frame");
            Ok(Inbound::Close { code })
        }
    }
}
