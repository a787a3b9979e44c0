//! Lock-free stream counters shared by all sessions

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals, updated by sessions as they finish
#[derive(Debug, Default)]
pub struct StreamStats {
    active: AtomicU64,
    completed: AtomicU64,
    aborted: AtomicU64,
    disconnected: AtomicU64,
    bytes_relayed: AtomicU64,
}

/// Point-in-time copy of [`StreamStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub active: u64,
    pub completed: u64,
    pub aborted: u64,
    pub disconnected: u64,
    pub bytes_relayed: u64,
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn session_opened(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn session_closed(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disconnected(&self) {
        self.disconnected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bytes(&self, bytes: u64) {
        self.bytes_relayed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            active: self.active.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            disconnected: self.disconnected.load(Ordering::Relaxed),
            bytes_relayed: self.bytes_relayed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes() {
        let stats = StreamStats::new();
        stats.session_opened();
        stats.record_bytes(42);
        stats.record_completed();
        stats.session_closed();

        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        assert_eq!(
            json,
            r#"{"active":0,"completed":1,"aborted":0,"disconnected":0,"bytes_relayed":42}"#
        );
    }
}
