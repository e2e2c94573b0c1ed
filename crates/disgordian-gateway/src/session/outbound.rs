//! Outbound dispatcher: the only writer on the connection.
//!
//! Two queues feed it. The internal one is bounded and carries heartbeats
//! from the pacemaker and the pump; the external one is the unbounded
//! channel application code sends pre-serialized frames on. Each queue is
//! FIFO and every frame is written whole, so all writers observe one total
//! order that keeps each submitter's own order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use disgordian_core::error::{DisgordianError, Result};

use crate::obs::GatewayMetrics;
use crate::transport::FrameSink;

/// Submission side of the internal queue.
#[derive(Debug, Clone)]
pub struct OutboundHandle {
    tx: mpsc::Sender<String>,
}

impl OutboundHandle {
    /// Queue a frame, waiting only while the queue is full.
    pub async fn submit(&self, frame: String) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| DisgordianError::QueueClosed)
    }

    /// Queue a frame without waiting. Fails when full or closed.
    pub fn try_submit(&self, frame: String) -> Result<()> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                DisgordianError::Internal("outbound queue full".into())
            }
            mpsc::error::TrySendError::Closed(_) => DisgordianError::QueueClosed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create the internal queue.
pub fn internal_queue(capacity: usize) -> (OutboundHandle, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (OutboundHandle { tx }, rx)
}

/// Why the dispatcher stopped.
#[derive(Debug)]
pub enum DispatcherExit {
    /// Session token cancelled; queued application frames were flushed.
    Cancelled,
    /// The external submission channel was closed by its owners.
    QueueClosed,
    /// A write failed. No retry.
    WriteFailed(DisgordianError),
}

pub struct OutboundDispatcher {
    internal: mpsc::Receiver<String>,
    external: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    drain_timeout: Duration,
    metrics: Arc<GatewayMetrics>,
}

impl OutboundDispatcher {
    pub fn new(
        internal: mpsc::Receiver<String>,
        external: mpsc::UnboundedReceiver<String>,
        cancel: CancellationToken,
        drain_timeout: Duration,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            internal,
            external,
            cancel,
            drain_timeout,
            metrics,
        }
    }

    /// Write queued frames until cancelled, the external queue closes, or a
    /// write fails. The sink is handed back so the owner can close it.
    ///
    /// Cancellation also interrupts a write in progress: the frame being
    /// written is abandoned and only the bounded drain runs afterwards.
    pub async fn run<S: FrameSink>(mut self, mut sink: S) -> (S, DispatcherExit) {
        let mut internal_open = true;

        let exit = loop {
            let (frame, source) = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    self.drain(&mut sink).await;
                    break DispatcherExit::Cancelled;
                }

                frame = self.internal.recv(), if internal_open => match frame {
                    Some(frame) => (frame, "internal"),
                    None => {
                        internal_open = false;
                        continue;
                    }
                },

                frame = self.external.recv() => match frame {
                    Some(frame) => (frame, "external"),
                    None => {
                        tracing::debug!("external outbound queue closed");
                        break DispatcherExit::QueueClosed;
                    }
                },
            };

            let written = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                res = write_frame(&mut sink, frame, &self.metrics, source) => Some(res),
            };
            match written {
                Some(Ok(())) => {}
                Some(Err(e)) => break DispatcherExit::WriteFailed(e),
                None => {
                    tracing::debug!(source, "write interrupted by shutdown");
                    self.drain(&mut sink).await;
                    break DispatcherExit::Cancelled;
                }
            }
        };

        (sink, exit)
    }

    /// Stop accepting frames, then flush application frames that were
    /// already queued. Queued heartbeats are dropped.
    async fn drain<S: FrameSink>(&mut self, sink: &mut S) {
        self.internal.close();
        self.external.close();

        let mut abandoned = 0usize;
        while self.internal.try_recv().is_ok() {
            abandoned += 1;
        }

        let external = &mut self.external;
        let metrics = &self.metrics;
        let flush = async move {
            let mut flushed = 0usize;
            while let Ok(frame) = external.try_recv() {
                write_frame(sink, frame, metrics, "external").await?;
                flushed += 1;
            }
            Ok::<usize, DisgordianError>(flushed)
        };

        match tokio::time::timeout(self.drain_timeout, flush).await {
            Ok(Ok(flushed)) => tracing::debug!(flushed, abandoned, "outbound drained"),
            Ok(Err(e)) => tracing::debug!(error = %e, abandoned, "outbound drain stopped by write failure"),
            Err(_) => tracing::warn!(
                timeout_ms = self.drain_timeout.as_millis() as u64,
                "outbound drain timed out; remaining frames abandoned"
            ),
        }
    }
}

async fn write_frame<S: FrameSink>(
    sink: &mut S,
    frame: String,
    metrics: &GatewayMetrics,
    source: &'static str,
) -> Result<()> {
    tracing::debug!(source, frame = %frame, "sending frame");
    sink.send_text(frame).await?;
    metrics.frames_out.inc(&[("source", source)]);
    Ok(())
}
