// ── Domain model ──
//
// Canonical types for the presence engine: identities, snapshots,
// derived device state, and events.

pub mod event;
pub mod identity;
pub mod snapshot;
pub mod state;

pub use event::{EventKind, PresenceEvent};
pub use identity::{DeviceIdentity, MacAddress};
pub use snapshot::{
    DeviceObservation, NormalizedSubmission, RawDevice, RejectedDevice, Snapshot,
    SnapshotSubmission,
};
pub use state::{DeviceState, HistoryRecord, PresenceStatus};
