//! Handler registry and fan-out.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::Instrument;

use disgordian_core::error::Result;

use crate::dispatch::DispatchEvent;
use crate::obs::GatewayMetrics;

/// Subscriber for Dispatch events.
///
/// Errors are logged and counted by the router; they never reach the session.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;
    async fn handle(&self, event: Arc<DispatchEvent>) -> Result<()>;
}

/// Registry of event handlers.
///
/// Handlers registered for a type tag receive only that type; catch-all
/// handlers receive every event, including types this client has never heard
/// of.
pub struct EventRouter {
    by_kind: DashMap<String, Vec<Arc<dyn EventHandler>>>,
    catch_all: DashMap<&'static str, Arc<dyn EventHandler>>,
    metrics: Arc<GatewayMetrics>,
}

impl EventRouter {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            by_kind: DashMap::new(),
            catch_all: DashMap::new(),
            metrics,
        }
    }

    pub fn register(&self, kind: &str, handler: Arc<dyn EventHandler>) {
        self.by_kind.entry(kind.to_string()).or_default().push(handler);
    }

    /// Receive every event. Re-subscribing under the same name replaces.
    pub fn subscribe_all(&self, handler: Arc<dyn EventHandler>) {
        self.catch_all.insert(handler.name(), handler);
    }

    pub fn handlers_for(&self, kind: &str) -> Vec<Arc<dyn EventHandler>> {
        let mut out: Vec<Arc<dyn EventHandler>> = self
            .by_kind
            .get(kind)
            .map(|hs| hs.value().clone())
            .unwrap_or_default();
        out.extend(self.catch_all.iter().map(|e| Arc::clone(e.value())));
        out
    }

    /// Hand an event to every matching handler without waiting for them.
    ///
    /// Each handler runs on its own task: no completion order relative to
    /// later events and no back-pressure on the caller. Returns the number of
    /// handlers the event went to.
    pub fn forward(&self, event: DispatchEvent) -> usize {
        self.metrics.dispatches.inc(&[("event", event.kind.as_str())]);

        let handlers = self.handlers_for(&event.kind);
        if handlers.is_empty() {
            tracing::debug!(event = %event.kind, "no handler for dispatch");
            return 0;
        }

        let event = Arc::new(event);
        for handler in &handlers {
            let handler = Arc::clone(handler);
            let event = Arc::clone(&event);
            let metrics = Arc::clone(&self.metrics);
            tokio::spawn(
                async move {
                    if let Err(e) = handler.handle(Arc::clone(&event)).await {
                        tracing::warn!(
                            handler = handler.name(),
                            event = %event.kind,
                            class = e.class().as_str(),
                            error = %e,
                            "event handler failed"
                        );
                        metrics.handler_errors.inc(&[("handler", handler.name())]);
                    }
                }
                .in_current_span(),
            );
        }
        handlers.len()
    }
}
