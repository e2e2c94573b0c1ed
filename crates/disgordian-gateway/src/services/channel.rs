//! Channel-backed handler.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use disgordian_core::error::{DisgordianError, Result};

use crate::dispatch::{DispatchEvent, EventHandler};

/// Forwards events into a channel, for consumers that prefer a stream over
/// a callback (command parsers, tests).
pub struct ChannelHandler {
    name: &'static str,
    tx: mpsc::UnboundedSender<Arc<DispatchEvent>>,
}

impl ChannelHandler {
    pub fn new(name: &'static str) -> (Self, mpsc::UnboundedReceiver<Arc<DispatchEvent>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { name, tx }, rx)
    }
}

#[async_trait]
impl EventHandler for ChannelHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(&self, event: Arc<DispatchEvent>) -> Result<()> {
        self.tx.send(event).map_err(|_| DisgordianError::QueueClosed)
    }
}
