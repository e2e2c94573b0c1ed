//! Inbound pump: the only reader on the connection and the only writer of
//! the sequence tracker once the session is active.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use disgordian_core::error::DisgordianError;
use disgordian_core::protocol::{self, Envelope, Opcode};

use crate::dispatch::{DispatchEvent, EventRouter};
use crate::obs::GatewayMetrics;
use crate::session::outbound::OutboundHandle;
use crate::session::sequence::SequenceTracker;
use crate::transport::codec::{decode, Inbound};
use crate::transport::FrameSource;

/// How the read loop ended.
#[derive(Debug)]
pub enum PumpEnd {
    /// Peer sent a close frame or the stream ended.
    PeerClosed { code: Option<u16> },
    /// Session token cancelled (local shutdown).
    Cancelled,
    /// Read or decode failure.
    Failed(DisgordianError),
}

#[derive(Debug)]
pub struct PumpExit {
    pub end: PumpEnd,
    /// Dispatch envelopes seen by the pump.
    pub dispatches: u64,
}

pub struct InboundPump {
    sequence: SequenceTracker,
    router: Arc<EventRouter>,
    outbound: OutboundHandle,
    cancel: CancellationToken,
    metrics: Arc<GatewayMetrics>,
}

impl InboundPump {
    pub fn new(
        sequence: SequenceTracker,
        router: Arc<EventRouter>,
        outbound: OutboundHandle,
        cancel: CancellationToken,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            sequence,
            router,
            outbound,
            cancel,
            metrics,
        }
    }

    pub async fn run<R: FrameSource>(self, mut source: R) -> PumpExit {
        let mut dispatches = 0u64;

        let end = loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break PumpEnd::Cancelled,
                next = source.next_frame() => next,
            };

            let frame = match next {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => break PumpEnd::Failed(e),
                None => break PumpEnd::PeerClosed { code: None },
            };

            // a stream we cannot parse cannot be resynchronised
            let (env, bytes) = match decode(frame) {
                Ok(Inbound::Envelope { env, bytes_len }) => (env, bytes_len),
                Ok(Inbound::Close { code }) => break PumpEnd::PeerClosed { code },
                Err(e) => break PumpEnd::Failed(e),
            };

            if self.handle(env, bytes).await {
                dispatches += 1;
            }
        };

        tracing::debug!(?end, dispatches, "inbound pump ended");
        PumpExit { end, dispatches }
    }

    /// Returns `true` for a Dispatch.
    async fn handle(&self, env: Envelope, bytes: usize) -> bool {
        self.metrics.frames_in.inc(&[("op", env.op.as_str())]);
        tracing::debug!(
            op = env.op.code(),
            seq = ?env.s,
            bytes,
            event = env.t.as_deref().unwrap_or(""),
            "received envelope"
        );

        self.sequence.update(env.s).await;

        match env.op {
            Opcode::Dispatch => {
                self.router.forward(DispatchEvent::from_envelope(env));
                true
            }
            Opcode::Heartbeat => {
                // peer wants a beat now
                let seq = self.sequence.read().await;
                match protocol::heartbeat(seq) {
                    Ok(frame) => {
                        if let Err(e) = self.outbound.try_submit(frame) {
                            tracing::warn!(error = %e, "could not queue requested heartbeat");
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "heartbeat encode failed"),
                }
                false
            }
            Opcode::HeartbeatAck => {
                tracing::trace!("heartbeat acknowledged");
                false
            }
            Opcode::Hello => {
                tracing::warn!("unexpected Hello mid-session");
                false
            }
            Opcode::Reconnect => {
                tracing::warn!("peer requested reconnect; waiting for it to close the connection");
                false
            }
            Opcode::InvalidSession => {
                tracing::warn!("peer invalidated the session");
                false
            }
            Opcode::Identify | Opcode::Other(_) => {
                tracing::debug!(op = env.op.code(), "ignoring envelope");
                false
            }
        }
    }
}
