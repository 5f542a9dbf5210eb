//! Shared pending-network-request bookkeeping, fed by the Crash Watchdog's
//! subscription to the adapter's raw network-activity stream and read by
//! the message builder when it renders "pending network requests" for a
//! step (§4.4 Crash Watchdog, §4.3 `PendingNetworkRequest`).

use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

use browser_session::PendingNetworkRequest;

#[derive(Clone, Debug)]
struct Entry {
    url: String,
    method: String,
    started_at_ms: u64,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Keyed by an opaque per-request id (CDP `requestId`, or here a
/// synthetic counter since the adapter's `NetworkActivity` raw event
/// does not yet carry the wire-level request id).
#[derive(Default)]
pub struct PendingRequestTracker {
    inflight: DashMap<u64, Entry>,
}

impl PendingRequestTracker {
    pub fn start(&self, id: u64, url: String, method: String) {
        self.inflight.insert(
            id,
            Entry {
                url,
                method,
                started_at_ms: now_ms(),
            },
        );
    }

    pub fn finish(&self, id: u64) {
        self.inflight.remove(&id);
    }

    pub fn requests_older_than(&self, min_age_ms: u64) -> Vec<(u64, String)> {
        let now = now_ms();
        self.inflight
            .iter()
            .filter(|entry| now.saturating_sub(entry.started_at_ms) >= min_age_ms)
            .map(|entry| (*entry.key(), entry.url.clone()))
            .collect()
    }

    pub fn snapshot(&self) -> Vec<PendingNetworkRequest> {
        let now = now_ms();
        self.inflight
            .iter()
            .map(|entry| PendingNetworkRequest {
                url: entry.url.clone(),
                method: entry.method.clone(),
                age_ms: now.saturating_sub(entry.started_at_ms),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_removes_tracked_request() {
        let tracker = PendingRequestTracker::default();
        tracker.start(1, "https://example.com".into(), "GET".into());
        assert_eq!(tracker.snapshot().len(), 1);
        tracker.finish(1);
        assert_eq!(tracker.snapshot().len(), 0);
    }
}
