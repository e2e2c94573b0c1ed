//! In-memory transport and peer used by the session tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use disgordian_core::error::{DisgordianError, Result};
use disgordian_gateway::config::{self, ClientConfig};
use disgordian_gateway::dispatch::{DispatchEvent, EventRouter};
use disgordian_gateway::obs::GatewayMetrics;
use disgordian_gateway::services::ChannelHandler;
use disgordian_gateway::session::Session;
use disgordian_gateway::transport::{Dialer, Frame, FrameSink, FrameSource};

pub struct MockSink {
    tx: mpsc::UnboundedSender<String>,
    closes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
    stall: Arc<AtomicBool>,
}

#[async_trait]
impl FrameSink for MockSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DisgordianError::Transport("write failed: broken pipe".into()));
        }
        self.tx
            .send(text)
            .map_err(|_| DisgordianError::Transport("write failed: peer gone".into()))
    }

    async fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

pub struct MockSource {
    rx: mpsc::UnboundedReceiver<Result<Frame>>,
}

#[async_trait]
impl FrameSource for MockSource {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        self.rx.recv().await
    }
}

pub struct MockDialer {
    halves: Mutex<Option<(MockSink, MockSource)>>,
    dialed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Dialer for MockDialer {
    type Sink = MockSink;
    type Source = MockSource;

    async fn dial(&self, url: &str) -> Result<(MockSink, MockSource)> {
        self.dialed.lock().unwrap().push(url.to_string());
        self.halves
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| DisgordianError::Transport("dial failed: connection refused".into()))
    }
}

/// The remote end of a mock connection.
pub struct Peer {
    to_client: Option<mpsc::UnboundedSender<Result<Frame>>>,
    pub from_client: mpsc::UnboundedReceiver<String>,
    pub closes: Arc<AtomicUsize>,
    pub fail_writes: Arc<AtomicBool>,
    /// Writes and closes never complete while set (peer stopped reading).
    pub stall: Arc<AtomicBool>,
    /// URLs the client dialed.
    pub dialed: Arc<Mutex<Vec<String>>>,
}

impl Peer {
    pub fn send(&self, json: &str) {
        self.send_frame(Frame::Text(json.to_string()));
    }

    pub fn send_frame(&self, frame: Frame) {
        self.to_client.as_ref().unwrap().send(Ok(frame)).unwrap();
    }

    pub fn send_read_error(&self) {
        self.to_client
            .as_ref()
            .unwrap()
            .send(Err(DisgordianError::Transport("read failed: reset by peer".into())))
            .unwrap();
    }

    /// End the client's read stream.
    pub fn hang_up(&mut self) {
        self.to_client = None;
    }

    pub async fn recv(&mut self) -> String {
        self.from_client.recv().await.expect("client hung up")
    }

    pub async fn recv_json(&mut self) -> serde_json::Value {
        serde_json::from_str(&self.recv().await).unwrap()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Hello → (Identify) → READY. Returns the Identify frame.
    pub async fn handshake(&mut self, interval_ms: u64, ready_seq: u64) -> serde_json::Value {
        self.send(&format!(r#"{{"op":10,"d":{{"heartbeat_interval":{interval_ms}}}}}"#));
        let identify = self.recv_json().await;
        assert_eq!(identify["op"], 2);
        self.send(&format!(
            r#"{{"op":0,"s":{ready_seq},"t":"READY","d":{{"v":6,"session_id":"abc123"}}}}"#
        ));
        identify
    }
}

pub fn mock_connection() -> (MockDialer, Peer) {
    let (to_client, client_rx) = mpsc::unbounded_channel();
    let (client_tx, from_client) = mpsc::unbounded_channel();
    let closes = Arc::new(AtomicUsize::new(0));
    let fail_writes = Arc::new(AtomicBool::new(false));
    let stall = Arc::new(AtomicBool::new(false));

    let sink = MockSink {
        tx: client_tx,
        closes: Arc::clone(&closes),
        fail_writes: Arc::clone(&fail_writes),
        stall: Arc::clone(&stall),
    };
    let source = MockSource { rx: client_rx };

    let dialed = Arc::new(Mutex::new(Vec::new()));
    let dialer = MockDialer {
        halves: Mutex::new(Some((sink, source))),
        dialed: Arc::clone(&dialed),
    };
    let peer = Peer {
        to_client: Some(to_client),
        from_client,
        closes,
        fail_writes,
        stall,
        dialed,
    };
    (dialer, peer)
}

pub fn refusing_dialer() -> MockDialer {
    MockDialer {
        halves: Mutex::new(None),
        dialed: Arc::new(Mutex::new(Vec::new())),
    }
}

pub fn test_config() -> ClientConfig {
    config::load_from_str(
        r#"
version: 1
gateway:
  url: "ws://gateway.test"
  drain_timeout_ms: 500
identity:
  token: "test-token"
"#,
    )
    .unwrap()
}

/// Everything a session test needs.
pub struct Harness {
    pub session: Session<MockDialer>,
    pub peer: Peer,
    pub events: mpsc::UnboundedReceiver<Arc<DispatchEvent>>,
    pub router: Arc<EventRouter>,
    pub metrics: Arc<GatewayMetrics>,
    pub shutdown: CancellationToken,
    pub outbound_tx: mpsc::UnboundedSender<String>,
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
}

pub fn harness() -> Harness {
    let (dialer, peer) = mock_connection();
    harness_with(dialer, peer)
}

pub fn harness_with(dialer: MockDialer, peer: Peer) -> Harness {
    let metrics = Arc::new(GatewayMetrics::new());
    let router = Arc::new(EventRouter::new(Arc::clone(&metrics)));
    let (handler, events) = ChannelHandler::new("test");
    router.subscribe_all(Arc::new(handler));

    let shutdown = CancellationToken::new();
    let session = Session::new(
        Arc::new(test_config()),
        dialer,
        Arc::clone(&router),
        Arc::clone(&metrics),
        shutdown.clone(),
    );
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    Harness {
        session,
        peer,
        events,
        router,
        metrics,
        shutdown,
        outbound_tx,
        outbound_rx,
    }
}
