//! Logging handler.

use std::sync::Arc;

use async_trait::async_trait;

use disgordian_core::error::Result;

use crate::dispatch::{DispatchEvent, EventHandler};

/// Catch-all handler that records every Dispatch in the log.
#[derive(Default)]
pub struct LogEventHandler;

impl LogEventHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler for LogEventHandler {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn handle(&self, event: Arc<DispatchEvent>) -> Result<()> {
        let bytes = event.data.as_ref().map(|d| d.get().len()).unwrap_or(0);
        tracing::info!(event = %event.kind, seq = ?event.seq, bytes, "dispatch");
        Ok(())
    }
}
