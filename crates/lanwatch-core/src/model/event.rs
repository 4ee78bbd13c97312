// ── Presence event types ──
//
// Events are created only by the emitter and are immutable once
// appended. The log never contains two consecutive ARRIVED (or
// DEPARTED) events for one identity without the opposite in between.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::identity::DeviceIdentity;
use super::state::PresenceStatus;

/// Kind of presence change an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum EventKind {
    Arrived,
    Departed,
    /// Rapid departure-and-return collapsed into one event. Supersedes
    /// the ARRIVED that would otherwise be emitted.
    Flapped,
}

/// A single presence change, as consumed by an external notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub identity: DeviceIdentity,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub prior_status: Option<PresenceStatus>,
    pub new_status: PresenceStatus,
}

impl PresenceEvent {
    /// Whether this event leaves the device present.
    pub fn is_arrival(&self) -> bool {
        matches!(self.kind, EventKind::Arrived | EventKind::Flapped)
    }
}
