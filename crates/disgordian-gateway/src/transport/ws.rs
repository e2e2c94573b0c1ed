//! WebSocket transport over tokio-tungstenite.
//!
//! The stream is split once after dialing: the write half goes to the outbound
//! dispatcher, the read half to the inbound pump. Pings are answered by
//! tungstenite itself, so only data and close frames are surfaced.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use disgordian_core::error::{DisgordianError, Result};

use super::{Dialer, Frame, FrameSink, FrameSource};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dials `ws://` / `wss://` endpoints.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsDialer;

pub struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

pub struct WsSource {
    inner: SplitStream<WsStream>,
}

#[async_trait]
impl Dialer for WsDialer {
    type Sink = WsSink;
    type Source = WsSource;

    async fn dial(&self, url: &str) -> Result<(WsSink, WsSource)> {
        let (ws, resp) = connect_async(url)
            .await
            .map_err(|e| DisgordianError::Transport(format!("dial failed: {e}")))?;
        tracing::debug!(status = %resp.status(), "websocket opened");
        let (tx, rx) = ws.split();
        Ok((WsSink { inner: tx }, WsSource { inner: rx }))
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.inner
            .send(Message::Text(text))
            .await
            .map_err(|e| DisgordianError::Transport(format!("write failed: {e}")))
    }

    async fn close(&mut self) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        let sent = self.inner.send(Message::Close(Some(frame))).await;
        let closed = self.inner.close().await;
        match sent.and(closed) {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(DisgordianError::Transport(format!("close failed: {e}"))),
        }
    }
}

#[async_trait]
impl FrameSource for WsSource {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        loop {
            let msg = match self.inner.next().await? {
                Ok(msg) => msg,
                Err(e) => {
                    return Some(Err(DisgordianError::Transport(format!("read failed: {e}"))))
                }
            };
            let frame = match msg {
                Message::Text(s) => Frame::Text(s),
                Message::Binary(b) => Frame::Binary(Bytes::from(b)),
                Message::Close(close) => Frame::Close {
                    code: close.as_ref().map(|f| u16::from(f.code)),
                    reason: close.map(|f| f.reason.into_owned()).unwrap_or_default(),
                },
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };
            return Some(Ok(frame));
        }
    }
}
