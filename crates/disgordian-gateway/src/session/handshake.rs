//! Hello → Identify → READY.
//!
//! Runs before any background task exists, directly on the two connection
//! halves. Every deviation is fatal; there is no retry.

use std::time::Duration;

use disgordian_core::error::{DisgordianError, Result};
use disgordian_core::protocol::payload::{ClientProperties, Hello, Identify, ReadyInfo};
use disgordian_core::protocol::{self, Envelope, Opcode, READY_EVENT};

use crate::config::IdentitySection;
use crate::dispatch::{DispatchEvent, EventRouter};
use crate::obs::GatewayMetrics;
use crate::session::sequence::SequenceTracker;
use crate::transport::codec::{decode, Inbound};
use crate::transport::{FrameSink, FrameSource};

/// Identify payload for this client.
pub fn identify_payload(identity: &IdentitySection) -> Identify {
    Identify {
        token: identity.token.clone(),
        properties: ClientProperties {
            os: identity.os.clone(),
            browser: identity.browser.clone(),
            device: identity.device.clone(),
            referrer: String::new(),
            referring_domain: String::new(),
        },
        compress: identity.compress,
        large_threshold: identity.large_threshold,
        shard: identity.shard,
    }
}

/// Validate Hello and return the heartbeat interval.
pub fn heartbeat_interval(hello: &Envelope) -> Result<Duration> {
    if hello.op != Opcode::Hello {
        return Err(DisgordianError::Handshake(format!(
            "expected Hello (op 10), got op {}",
            hello.op.code()
        )));
    }
    let payload: Hello = hello.payload()?;
    match payload.heartbeat_interval {
        Some(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        Some(_) => Err(DisgordianError::Handshake("heartbeat_interval is zero".into())),
        None => Err(DisgordianError::Handshake("Hello has no heartbeat_interval".into())),
    }
}

/// Run the handshake. On success the tracker holds READY's sequence and the
/// READY event has been forwarded to the router.
pub async fn perform<S: FrameSink, R: FrameSource>(
    sink: &mut S,
    source: &mut R,
    identity: &IdentitySection,
    sequence: &SequenceTracker,
    router: &EventRouter,
    metrics: &GatewayMetrics,
) -> Result<Duration> {
    let hello = next_envelope(source, "Hello", metrics).await?;
    let interval = heartbeat_interval(&hello)?;
    tracing::info!(interval_ms = interval.as_millis() as u64, "received Hello");

    let frame = protocol::encode(Opcode::Identify, &identify_payload(identity))?;
    sink.send_text(frame).await?;
    metrics.frames_out.inc(&[("source", "handshake")]);
    tracing::info!(shard = ?identity.shard, "sent Identify");

    let ready = next_envelope(source, READY_EVENT, metrics).await?;
    if !ready.is_dispatch() || ready.t.as_deref() != Some(READY_EVENT) {
        return Err(DisgordianError::Handshake(format!(
            "expected READY dispatch, got op {} ({})",
            ready.op.code(),
            ready.t.as_deref().unwrap_or("-")
        )));
    }
    let seq = ready
        .s
        .ok_or_else(|| DisgordianError::Handshake("READY carries no sequence".into()))?;
    sequence.update(Some(seq)).await;

    let info: ReadyInfo = ready.payload().unwrap_or_default();
    tracing::info!(seq, version = ?info.v, session_id = ?info.session_id, "received READY");

    router.forward(DispatchEvent::from_envelope(ready));
    Ok(interval)
}

async fn next_envelope<R: FrameSource>(
    source: &mut R,
    waiting_for: &str,
    metrics: &GatewayMetrics,
) -> Result<Envelope> {
    let frame = match source.next_frame().await {
        Some(Ok(frame)) => frame,
        Some(Err(e)) => {
            return Err(DisgordianError::Handshake(format!(
                "read failed before {waiting_for}: {e}"
            )))
        }
        None => {
            return Err(DisgordianError::Handshake(format!(
                "connection closed before {waiting_for}"
            )))
        }
    };

    match decode(frame)? {
        Inbound::Envelope { env, .. } => {
            metrics.frames_in.inc(&[("op", env.op.as_str())]);
            tracing::debug!(op = env.op.code(), seq = ?env.s, "received envelope");
            Ok(env)
        }
        Inbound::Close { code } => Err(DisgordianError::Handshake(format!(
            "peer closed the connection ({code:?}) before {waiting_for}"
        ))),
    }
}
