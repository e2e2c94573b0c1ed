//! Minimal metrics registry for the gateway client.
//!
//! Counters with dynamic labels backed by `DashMap`. Labels are flattened into
//! sorted key vectors to keep deterministic ordering; rendering follows the
//! Prometheus text exposition format. Counters whose label values come from
//! the peer are bounded: past the cap, new label sets fold into `other`.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

/// Label value that absorbs label sets beyond a counter's cap.
pub const OVERFLOW_LABEL: &str = "other";

/// Distinct event types tracked before folding into `other`.
const MAX_EVENT_SERIES: usize = 128;

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
    max_series: Option<usize>,
}

impl CounterVec {
    /// Counter holding at most `max_series` label sets plus the overflow one.
    pub fn bounded(max_series: usize) -> Self {
        Self {
            map: DashMap::new(),
            max_series: Some(max_series),
        }
    }

    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let mut key = label_key(labels);
        if let Some(counter) = self.map.get(&key) {
            counter.fetch_add(v, Ordering::Relaxed);
            return;
        }
        if let Some(max) = self.max_series {
            // approximate under races; the map still stays bounded
            if self.map.len() >= max {
                for (_, value) in key.iter_mut() {
                    *value = OVERFLOW_LABEL.to_string();
                }
            }
        }
        let counter = self.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Number of label sets currently held.
    pub fn series(&self) -> usize {
        self.map.len()
    }

    /// Current value for one label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum across every label set.
    pub fn total(&self) -> u64 {
        self.map.iter().map(|r| r.value().load(Ordering::Relaxed)).sum()
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            if r.key().is_empty() {
                let _ = writeln!(out, "{} {}", name, val);
                continue;
            }
            let label_str = r
                .key()
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(out, "{}{{{}}} {}", name, label_str, val);
        }
    }
}

/// Counters recorded by one client (shared by every session it runs).
pub struct GatewayMetrics {
    /// Envelopes received, by `op`.
    pub frames_in: CounterVec,
    /// Frames written, by `source` (`handshake` / `internal` / `external`).
    pub frames_out: CounterVec,
    /// Heartbeats queued by the pacemaker.
    pub heartbeats: CounterVec,
    /// Dispatch events forwarded, by `event` (peer-controlled, so bounded).
    pub dispatches: CounterVec,
    /// Failed handler invocations, by `handler`.
    pub handler_errors: CounterVec,
    /// Sessions that reached `Closed`, by `reason`.
    pub sessions_ended: CounterVec,
    /// Connection close operations actually performed.
    pub connection_closes: CounterVec,
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self {
            frames_in: CounterVec::default(),
            frames_out: CounterVec::default(),
            heartbeats: CounterVec::default(),
            dispatches: CounterVec::bounded(MAX_EVENT_SERIES),
            handler_errors: CounterVec::default(),
            sessions_ended: CounterVec::default(),
            connection_closes: CounterVec::default(),
        }
    }
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.frames_in.render("gateway_frames_in_total", &mut out);
        self.frames_out.render("gateway_frames_out_total", &mut out);
        self.heartbeats.render("gateway_heartbeats_total", &mut out);
        self.dispatches.render("gateway_dispatch_total", &mut out);
        self.handler_errors.render("gateway_handler_errors_total", &mut out);
        self.sessions_ended.render("gateway_sessions_ended_total", &mut out);
        self.connection_closes.render("gateway_connection_closes_total", &mut out);
        out
    }
}
