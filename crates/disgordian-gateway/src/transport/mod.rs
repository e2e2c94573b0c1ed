//! Transport layer.
//!
//! The session only sees these seams: a `Dialer` that opens a connection and
//! hands back its two halves, a `FrameSink` (write half) and a `FrameSource`
//! (read half). `ws` implements them over tokio-tungstenite; tests plug in an
//! in-memory pair. `codec` turns frames into envelopes once, at the edge.

pub mod codec;
pub mod ws;

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use disgordian_core::error::Result;

/// Data-bearing frame read from the connection. Control frames (ping/pong)
/// are handled by the transport and never surface here.
#[derive(Debug)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
    Close { code: Option<u16>, reason: String },
}

/// Write half of a connection.
#[async_trait]
pub trait FrameSink: Send + 'static {
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Close the connection. Irreversible.
    async fn close(&mut self) -> Result<()>;
}

/// Read half of a connection.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Next frame, or `None` once the stream has ended.
    async fn next_frame(&mut self) -> Option<Result<Frame>>;
}

/// Opens connections.
#[async_trait]
pub trait Dialer: Send + Sync {
    type Sink: FrameSink;
    type Source: FrameSource;

    async fn dial(&self, url: &str) -> Result<(Self::Sink, Self::Source)>;
}

/// One-shot guard around `FrameSink::close`.
///
/// Read failure, external cancellation and outbound queue closure can all
/// end a session; only the first close request reaches the sink.
#[derive(Debug, Default)]
pub struct CloseOnce {
    closed: AtomicBool,
}

impl CloseOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call performed the close.
    pub async fn close<S: FrameSink>(&self, sink: &mut S) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("connection already closed");
            return false;
        }
        if let Err(e) = sink.close().await {
            // peer is usually gone already; the handle is released either way
            tracing::debug!(error = %e, "close handshake failed");
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
