//! Gateway session coordinator.
//!
//! A `Session` owns one connection for its whole life:
//! `Connecting → Handshaking → Active → Closing → Closed`.
//!
//! While `Active`, three tasks run: the pacemaker, the outbound dispatcher and
//! the inbound pump. The coordinator waits for whichever of {pump ended,
//! dispatcher ended, external cancellation} happens first, then cancels the
//! rest, joins them, and closes the connection through a one-shot guard.

pub mod handshake;
pub mod inbound;
pub mod outbound;
pub mod pacemaker;
pub mod sequence;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use disgordian_core::error::{DisgordianError, Result};

use crate::config::ClientConfig;
use crate::dispatch::EventRouter;
use crate::obs::GatewayMetrics;
use crate::transport::{CloseOnce, Dialer, FrameSink};

use inbound::{InboundPump, PumpEnd, PumpExit};
use outbound::{DispatcherExit, OutboundDispatcher};
use pacemaker::Pacemaker;
use sequence::SequenceTracker;

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Handshaking,
    Active,
    Closing,
    Closed,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Connecting => "connecting",
            SessionPhase::Handshaking => "handshaking",
            SessionPhase::Active => "active",
            SessionPhase::Closing => "closing",
            SessionPhase::Closed => "closed",
        }
    }
}

/// Non-error ways an active session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// External cancellation.
    Cancelled,
    /// Every external outbound sender was dropped.
    QueueClosed,
    /// Peer closed the connection.
    PeerClosed { code: Option<u16> },
}

impl SessionEnd {
    fn as_str(&self) -> &'static str {
        match self {
            SessionEnd::Cancelled => "cancelled",
            SessionEnd::QueueClosed => "queue_closed",
            SessionEnd::PeerClosed { .. } => "peer_closed",
        }
    }
}

#[derive(Debug)]
pub struct SessionSummary {
    pub end: SessionEnd,
    /// Dispatch events received after READY.
    pub dispatches: u64,
    pub last_sequence: Option<u64>,
}

impl SessionSummary {
    /// The peer ended a logged-in session without sending a single Dispatch
    /// after READY. Local endings (cancellation, queue closure) never count.
    pub fn is_silent(&self) -> bool {
        self.dispatches == 0 && matches!(self.end, SessionEnd::PeerClosed { .. })
    }
}

/// What ended the `Active` phase.
#[derive(Clone, Copy)]
enum Trigger {
    Shutdown,
    Pump,
    Writer,
}

pub struct Session<D: Dialer> {
    cfg: Arc<ClientConfig>,
    dialer: D,
    router: Arc<EventRouter>,
    metrics: Arc<GatewayMetrics>,
    sequence: SequenceTracker,
    phase: watch::Sender<SessionPhase>,
    closer: CloseOnce,
    shutdown: CancellationToken,
}

impl<D: Dialer> Session<D> {
    pub fn new(
        cfg: Arc<ClientConfig>,
        dialer: D,
        router: Arc<EventRouter>,
        metrics: Arc<GatewayMetrics>,
        shutdown: CancellationToken,
    ) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Connecting);
        Self {
            cfg,
            dialer,
            router,
            metrics,
            sequence: SequenceTracker::new(),
            phase,
            closer: CloseOnce::new(),
            shutdown,
        }
    }

    /// Observe phase changes.
    pub fn phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// Shared handle to this session's sequence slot.
    pub fn sequence(&self) -> SequenceTracker {
        self.sequence.clone()
    }

    /// Drive the session to `Closed`.
    ///
    /// `outbound` is the application's submission channel; dropping every
    /// sender ends the session. Errors from dialing and the handshake abort
    /// before any task starts; errors while active are returned after the
    /// connection has been closed.
    pub async fn run(self, outbound: mpsc::UnboundedReceiver<String>) -> Result<SessionSummary> {
        let span = tracing::info_span!("session", shard = ?self.cfg.identity.shard);
        self.run_inner(outbound).instrument(span).await
    }

    async fn run_inner(self, outbound: mpsc::UnboundedReceiver<String>) -> Result<SessionSummary> {
        let url = self.cfg.gateway.connect_url();
        self.set_phase(SessionPhase::Connecting);
        tracing::info!(%url, "dialing gateway");

        let dialed = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                Err(DisgordianError::Transport("cancelled while dialing".into()))
            }
            dialed = self.dialer.dial(&url) => dialed,
        };
        let (mut sink, mut source) = match dialed {
            Ok(halves) => halves,
            Err(e) => {
                tracing::error!(class = e.class().as_str(), error = %e, "dial failed");
                self.finish("dial_failed");
                return Err(e);
            }
        };

        self.set_phase(SessionPhase::Handshaking);
        let handshake = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                Err(DisgordianError::Handshake("cancelled before the session became active".into()))
            }
            res = handshake::perform(
                &mut sink,
                &mut source,
                &self.cfg.identity,
                &self.sequence,
                &self.router,
                &self.metrics,
            ) => res,
        };
        let interval = match handshake {
            Ok(interval) => interval,
            Err(e) => {
                let e = e.into_handshake();
                tracing::error!(
                    error = %e,
                    "handshake failed; likely an authentication or protocol-version problem"
                );
                self.set_phase(SessionPhase::Closing);
                self.close(&mut sink).await;
                self.finish("handshake_failed");
                return Err(e);
            }
        };

        self.set_phase(SessionPhase::Active);
        self.run_active(sink, source, interval, outbound).await
    }

    async fn run_active(
        &self,
        sink: D::Sink,
        source: D::Source,
        interval: Duration,
        outbound: mpsc::UnboundedReceiver<String>,
    ) -> Result<SessionSummary> {
        let token = self.shutdown.child_token();
        let gw = &self.cfg.gateway;
        let (handle, internal_rx) = outbound::internal_queue(gw.outbound_capacity);

        let pacemaker = Pacemaker::new(
            interval,
            self.sequence.clone(),
            handle.clone(),
            token.clone(),
            Arc::clone(&self.metrics),
        );
        let dispatcher = OutboundDispatcher::new(
            internal_rx,
            outbound,
            token.clone(),
            Duration::from_millis(gw.drain_timeout_ms),
            Arc::clone(&self.metrics),
        );
        let pump = InboundPump::new(
            self.sequence.clone(),
            Arc::clone(&self.router),
            handle,
            token.clone(),
            Arc::clone(&self.metrics),
        );

        let mut pump_task = tokio::spawn(pump.run(source).in_current_span());
        let mut writer_task = tokio::spawn(dispatcher.run(sink).in_current_span());
        let pacemaker_task = tokio::spawn(pacemaker.run().in_current_span());

        let mut pump_done: Option<std::result::Result<PumpExit, JoinError>> = None;
        let mut writer_done = None;
        let trigger = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                tracing::info!("shutdown requested");
                Trigger::Shutdown
            }
            res = &mut pump_task => {
                pump_done = Some(res);
                Trigger::Pump
            }
            res = &mut writer_task => {
                writer_done = Some(res);
                Trigger::Writer
            }
        };

        self.set_phase(SessionPhase::Closing);
        token.cancel();

        if let Err(e) = pacemaker_task.await {
            tracing::warn!(error = %e, "pacemaker task failed");
        }
        let writer = match writer_done {
            Some(res) => res,
            None => writer_task.await,
        };
        let pump = match pump_done {
            Some(res) => res,
            None => pump_task.await,
        };

        let writer_exit = match writer {
            Ok((mut sink, exit)) => {
                self.close(&mut sink).await;
                exit
            }
            Err(e) => {
                tracing::error!(error = %e, "outbound task failed; connection dropped without close");
                DispatcherExit::WriteFailed(DisgordianError::Internal(format!(
                    "outbound task failed: {e}"
                )))
            }
        };
        let pump_exit = pump.unwrap_or_else(|e| PumpExit {
            end: PumpEnd::Failed(DisgordianError::Internal(format!("inbound task failed: {e}"))),
            dispatches: 0,
        });

        let dispatches = pump_exit.dispatches;
        let last_sequence = self.sequence.read().await;
        let outcome = match trigger {
            Trigger::Shutdown => Ok(SessionEnd::Cancelled),
            Trigger::Pump => match pump_exit.end {
                PumpEnd::PeerClosed { code } => Ok(SessionEnd::PeerClosed { code }),
                PumpEnd::Cancelled => Ok(SessionEnd::Cancelled),
                PumpEnd::Failed(e) => Err(e),
            },
            Trigger::Writer => match writer_exit {
                DispatcherExit::QueueClosed => Ok(SessionEnd::QueueClosed),
                DispatcherExit::Cancelled => Ok(SessionEnd::Cancelled),
                DispatcherExit::WriteFailed(e) => Err(e),
            },
        };

        match outcome {
            Ok(end) => {
                let summary = SessionSummary {
                    end,
                    dispatches,
                    last_sequence,
                };
                let reason = summary.end.as_str();
                if summary.is_silent() {
                    tracing::warn!(
                        reason,
                        ?last_sequence,
                        "peer ended the session without any dispatch after READY"
                    );
                } else {
                    tracing::info!(reason, dispatches, ?last_sequence, "session ended");
                }
                self.finish(reason);
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(
                    class = e.class().as_str(),
                    error = %e,
                    dispatches,
                    ?last_sequence,
                    "session failed"
                );
                self.finish("failed");
                Err(e)
            }
        }
    }

    /// Close through the one-shot guard. A peer that stops reading cannot
    /// hold the close open longer than the drain timeout.
    async fn close<S: FrameSink>(&self, sink: &mut S) {
        let limit = Duration::from_millis(self.cfg.gateway.drain_timeout_ms);
        match tokio::time::timeout(limit, self.closer.close(sink)).await {
            Ok(true) => {
                self.metrics.connection_closes.inc(&[]);
                tracing::debug!("connection closed");
            }
            Ok(false) => {}
            Err(_) => {
                self.metrics.connection_closes.inc(&[]);
                tracing::warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "close handshake timed out; connection dropped"
                );
            }
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.phase.send_replace(phase);
        tracing::info!(phase = phase.as_str(), "session phase");
    }

    fn finish(&self, reason: &str) {
        self.metrics.sessions_ended.inc(&[("reason", reason)]);
        self.set_phase(SessionPhase::Closed);
    }
}
