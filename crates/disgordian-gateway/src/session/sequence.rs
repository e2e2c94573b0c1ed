//! Last-seen sequence number, shared between the pump and the pacemaker.

use std::sync::Arc;

use tokio::sync::Mutex;

/// Last sequence number seen on this session.
///
/// Written by the inbound pump (and once by the handshake), read by the
/// pacemaker. Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    inner: Arc<Mutex<Option<u64>>>,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `seq` if the envelope carried one. Values below the current one
    /// are ignored. Returns whether the stored value changed.
    pub async fn update(&self, seq: Option<u64>) -> bool {
        let Some(seq) = seq else { return false };
        let mut current = self.inner.lock().await;
        match *current {
            Some(prev) if seq < prev => {
                tracing::debug!(prev, seq, "ignoring stale sequence");
                false
            }
            Some(prev) if seq == prev => false,
            _ => {
                *current = Some(seq);
                true
            }
        }
    }

    pub async fn read(&self) -> Option<u64> {
        *self.inner.lock().await
    }
}
