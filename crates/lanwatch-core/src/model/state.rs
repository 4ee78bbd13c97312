// ── Per-device derived state and history records ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::identity::DeviceIdentity;
use super::snapshot::DeviceObservation;

/// Presence status of a device as derived from snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum PresenceStatus {
    Present,
    Absent,
}

/// Derived per-identity state held in the snapshot store.
///
/// Created on the first observation of an identity, updated on every
/// processed snapshot, never deleted — pruning removes history records
/// but keeps device states for ongoing absence counting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub identity: DeviceIdentity,
    pub status: PresenceStatus,
    /// Timestamp of the last snapshot that contained this device.
    /// Non-decreasing across commits.
    pub last_seen: DateTime<Utc>,
    /// Timestamp of the last PRESENT<->ABSENT flip.
    pub last_change: DateTime<Utc>,
    /// Consecutive snapshots the device has been missing from.
    /// Reset to zero on every observation.
    pub consecutive_misses: u32,
}

impl DeviceState {
    /// State for an identity observed for the first time.
    pub fn first_observed(identity: DeviceIdentity, at: DateTime<Utc>) -> Self {
        Self {
            identity,
            status: PresenceStatus::Present,
            last_seen: at,
            last_change: at,
            consecutive_misses: 0,
        }
    }
}

/// Immutable append-only record of one committed snapshot.
///
/// Never mutated after write; the aggregation layer reads these for
/// time-series queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub observations: Vec<DeviceObservation>,
}
