// ── Aggregation query layer ──
//
// Read-only queries over history and events for the presentation
// layer. Every function operates on a consistent state copy, so reads
// tolerate a concurrent commit (they observe either the pre- or
// post-commit state in its entirety).

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::model::{HistoryRecord, MacAddress, PresenceEvent};
use crate::store::SnapshotStore;

/// One bucket in a device-count time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountBucket {
    pub start: DateTime<Utc>,
    pub count: usize,
}

/// Fraction of history records in `[start, end)` that contain the
/// identity. `None` when the window holds no records.
pub fn uptime_ratio(
    history: &[HistoryRecord],
    mac: &MacAddress,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<f64> {
    let in_window: Vec<&HistoryRecord> = history
        .iter()
        .filter(|r| r.timestamp >= start && r.timestamp < end)
        .collect();
    if in_window.is_empty() {
        return None;
    }
    let present = in_window
        .iter()
        .filter(|r| r.observations.iter().any(|o| o.identity.mac == *mac))
        .count();
    #[allow(clippy::as_conversions, clippy::cast_precision_loss)]
    let ratio = present as f64 / in_window.len() as f64;
    Some(ratio)
}

/// Ordered distinct-device counts over `[start, end)`, one entry per
/// `bucket`. Empty when `bucket` is non-positive or the window is
/// inverted. Buckets with no records report zero.
pub fn device_count_over_time(
    history: &[HistoryRecord],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bucket: Duration,
) -> Vec<CountBucket> {
    if bucket <= Duration::zero() || end <= start {
        return Vec::new();
    }

    let mut buckets = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let bucket_end = (cursor + bucket).min(end);
        let mut macs: Vec<&MacAddress> = history
            .iter()
            .filter(|r| r.timestamp >= cursor && r.timestamp < bucket_end)
            .flat_map(|r| r.observations.iter().map(|o| &o.identity.mac))
            .collect();
        macs.sort_unstable();
        macs.dedup();
        buckets.push(CountBucket {
            start: cursor,
            count: macs.len(),
        });
        cursor = bucket_end;
    }
    buckets
}

/// The most recent events, newest first.
pub fn recent_events(events: &[PresenceEvent], limit: usize) -> Vec<PresenceEvent> {
    events.iter().rev().take(limit).cloned().collect()
}

// ── Store-level convenience wrappers ────────────────────────────────

impl SnapshotStore {
    /// See [`uptime_ratio`].
    pub fn uptime_ratio(
        &self,
        mac: &MacAddress,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<f64> {
        uptime_ratio(&self.current_state().history, mac, start, end)
    }

    /// See [`device_count_over_time`].
    pub fn device_count_over_time(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bucket: Duration,
    ) -> Vec<CountBucket> {
        device_count_over_time(&self.current_state().history, start, end, bucket)
    }

    /// See [`recent_events`].
    pub fn recent_events(&self, limit: usize) -> Vec<PresenceEvent> {
        recent_events(&self.current_state().events, limit)
    }
}
