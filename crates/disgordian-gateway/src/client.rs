//! Client facade.
//!
//! Holds what outlives a single session (config, event router, metrics) and
//! builds sessions on demand. Startup errors are returned, never panicked.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use disgordian_core::error::Result;

use crate::config::ClientConfig;
use crate::dispatch::EventRouter;
use crate::obs::GatewayMetrics;
use crate::session::{Session, SessionSummary};
use crate::transport::ws::WsDialer;
use crate::transport::Dialer;

#[derive(Clone)]
pub struct GatewayClient {
    cfg: Arc<ClientConfig>,
    router: Arc<EventRouter>,
    metrics: Arc<GatewayMetrics>,
}

impl GatewayClient {
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        cfg.validate()?;
        let metrics = Arc::new(GatewayMetrics::new());
        let router = Arc::new(EventRouter::new(Arc::clone(&metrics)));
        Ok(Self {
            cfg: Arc::new(cfg),
            router,
            metrics,
        })
    }

    pub fn cfg(&self) -> &ClientConfig {
        &self.cfg
    }

    pub fn router(&self) -> Arc<EventRouter> {
        Arc::clone(&self.router)
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Build a session over any transport.
    pub fn session<D: Dialer>(&self, dialer: D, shutdown: CancellationToken) -> Session<D> {
        Session::new(
            Arc::clone(&self.cfg),
            dialer,
            Arc::clone(&self.router),
            Arc::clone(&self.metrics),
            shutdown,
        )
    }

    /// Run one WebSocket session to completion.
    pub async fn run(
        &self,
        shutdown: CancellationToken,
        outbound: mpsc::UnboundedReceiver<String>,
    ) -> Result<SessionSummary> {
        self.session(WsDialer, shutdown).run(outbound).await
    }
}
