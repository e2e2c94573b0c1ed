//! Heartbeat pacemaker.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use disgordian_core::protocol;

use crate::obs::GatewayMetrics;
use crate::session::outbound::OutboundHandle;
use crate::session::sequence::SequenceTracker;

/// Periodic heartbeat source.
///
/// Fire-and-forget: acknowledgements (op 11) are not tracked, so a peer that
/// stops answering is only noticed when the connection itself fails.
pub struct Pacemaker {
    interval: Duration,
    sequence: SequenceTracker,
    outbound: OutboundHandle,
    cancel: CancellationToken,
    metrics: Arc<GatewayMetrics>,
}

impl Pacemaker {
    pub fn new(
        interval: Duration,
        sequence: SequenceTracker,
        outbound: OutboundHandle,
        cancel: CancellationToken,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            interval,
            sequence,
            outbound,
            cancel,
            metrics,
        }
    }

    /// Queue one heartbeat per interval until cancelled. The first beat goes
    /// out one full interval after start.
    pub async fn run(self) {
        let mut tick = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                _ = tick.tick() => {
                    let seq = self.sequence.read().await;
                    let frame = match protocol::heartbeat(seq) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::error!(error = %e, "heartbeat encode failed");
                            continue;
                        }
                    };

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break,
                        queued = self.outbound.submit(frame) => {
                            if queued.is_err() {
                                tracing::debug!("outbound queue closed; pacemaker stopping");
                                break;
                            }
                        }
                    }

                    self.metrics.heartbeats.inc(&[]);
                    tracing::debug!(seq = ?seq, "heartbeat queued");
                }
            }
        }

        tracing::debug!("pacemaker stopped");
    }
}
