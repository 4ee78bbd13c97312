//! Presence change-detection engine for periodic network-discovery
//! snapshots.
//!
//! Turns a sequence of noisy device-discovery passes into a reliable
//! record of presence changes (arrivals, departures, flapping) that
//! downstream consumers can trust without re-deriving history:
//!
//! - **Identity normalization** ([`model::identity`]) — canonicalizes
//!   raw hardware addresses and vendor labels into stable
//!   [`DeviceIdentity`] keys. Pure and deterministic.
//!
//! - **[`engine`]** — the pure set-partition diff between the previous
//!   per-device state and a new snapshot, classifying each identity as
//!   arrived, departed (debounced), refreshed, or missed. No I/O, so
//!   the algorithm is unit-testable against constructed prior states.
//!
//! - **[`emitter`]** — derives deduplicated [`PresenceEvent`]s from
//!   transitions, collapsing rapid departure-return cycles into a
//!   single FLAPPED event.
//!
//! - **[`SnapshotStore`]** — exclusive owner of device state, history,
//!   and the event log. Single-writer commits (tokio mutex) with
//!   copy-on-write reads (arc-swap): readers always observe a complete
//!   pre- or post-commit state, never a partial update. Persistence is
//!   atomic; a failed write aborts the commit with prior state intact.
//!
//! - **[`aggregate`]** — read-only queries (uptime ratios, device
//!   counts over time, recent events) for the presentation layer.
//!
//! The crate never scans, transports, renders, or sends notifications;
//! it consumes well-formed [`SnapshotSubmission`]s and produces an
//! updated store plus events.

pub mod aggregate;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod model;
pub mod options;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use aggregate::CountBucket;
pub use engine::{Classification, ScanAdvisory, Transition, TransitionKind};
pub use error::CoreError;
pub use options::EngineOptions;
pub use store::{CommitOutcome, JsonFileBackend, MemoryBackend, PruneOutcome, SnapshotStore, StoreBackend, StoreState};
pub use stream::EventStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    DeviceIdentity,
    DeviceObservation,
    DeviceState,
    EventKind,
    HistoryRecord,
    MacAddress,
    PresenceEvent,
    PresenceStatus,
    RawDevice,
    Snapshot,
    SnapshotSubmission,
};
