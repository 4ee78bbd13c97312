// ── Snapshot store ──
//
// Exclusive owner of DeviceState and HistoryRecord lifetimes. Commits
// run the classify -> emit -> persist pipeline under a single-writer
// mutex; readers load an arc-swapped immutable state and therefore see
// either the pre-commit or post-commit state in its entirety.

mod persist;

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::emitter;
use crate::engine::{self, Classification, ScanAdvisory, TransitionKind};
use crate::error::CoreError;
use crate::model::{
    DeviceIdentity, DeviceState, HistoryRecord, MacAddress, PresenceEvent, PresenceStatus,
    Snapshot,
};
use crate::options::EngineOptions;
use crate::stream::EventStream;

pub use persist::{JsonFileBackend, MemoryBackend, StoreBackend};

// ── Persisted state ─────────────────────────────────────────────────

/// The full persisted state of the store: one JSON document on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    /// Per-identity derived state. Never pruned.
    pub device_states: BTreeMap<MacAddress, DeviceState>,
    /// Append-only committed snapshots, oldest first.
    pub history: Vec<HistoryRecord>,
    /// Append-only event log, oldest first.
    pub events: Vec<PresenceEvent>,
    /// Timestamp of the last committed snapshot; commits must be
    /// strictly newer.
    pub last_committed: Option<DateTime<Utc>>,
}

// ── Commit results ──────────────────────────────────────────────────

/// Result of a successful commit.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    /// The history record that was appended.
    pub record: HistoryRecord,
    /// Events emitted by this commit (already appended to the log).
    pub events: Vec<PresenceEvent>,
    /// Advisory condition, surfaced alongside normal output.
    pub advisory: Option<ScanAdvisory>,
}

/// Result of a retention pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneOutcome {
    pub removed_records: usize,
    pub removed_events: usize,
}

// ── SnapshotStore ───────────────────────────────────────────────────

/// Durable presence store with single-writer commits and lock-free
/// consistent reads.
pub struct SnapshotStore {
    state: ArcSwap<StoreState>,
    backend: Box<dyn StoreBackend>,
    options: EngineOptions,
    /// Serializes commits and prunes. Readers never take it.
    write_lock: Mutex<()>,
    /// Latest emitted event batch, for notification consumers.
    event_tx: watch::Sender<Arc<Vec<PresenceEvent>>>,
}

impl SnapshotStore {
    /// Open a store over a backend, loading any persisted state.
    pub fn open(backend: Box<dyn StoreBackend>, options: EngineOptions) -> Result<Self, CoreError> {
        options.validate()?;
        let state = backend.load()?.unwrap_or_default();
        debug!(
            devices = state.device_states.len(),
            history = state.history.len(),
            events = state.events.len(),
            "store opened"
        );
        let (event_tx, _) = watch::channel(Arc::new(Vec::new()));
        Ok(Self {
            state: ArcSwap::from_pointee(state),
            backend,
            options,
            write_lock: Mutex::new(()),
            event_tx,
        })
    }

    /// The engine options this store was opened with.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Current per-device state. Never fails; empty when uninitialized.
    pub fn current_state(&self) -> Arc<StoreState> {
        self.state.load_full()
    }

    /// Current per-device state mapping (convenience over
    /// [`current_state`](Self::current_state)).
    pub fn device_states(&self) -> BTreeMap<MacAddress, DeviceState> {
        self.state.load().device_states.clone()
    }

    /// Subscribe to event batches emitted by future commits.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_tx.subscribe())
    }

    /// Classify a snapshot against current state without committing.
    ///
    /// Read-only; skips the ordering check so retries and dry runs can
    /// inspect what a commit would do.
    pub fn preview(&self, snapshot: &Snapshot) -> Classification {
        let state = self.state.load();
        engine::classify(&state.device_states, snapshot, &self.options)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Commit a snapshot: classify, derive events, persist, publish.
    ///
    /// Atomic: on any failure (including persistence) no partial state
    /// becomes visible and the store file is untouched. Commits are
    /// strictly ordered by snapshot timestamp; a timestamp at or before
    /// the last committed one fails with
    /// [`CoreError::StaleSnapshot`] and leaves state unchanged.
    pub async fn commit(&self, snapshot: Snapshot) -> Result<CommitOutcome, CoreError> {
        let _guard = self.write_lock.lock().await;
        let current = self.state.load_full();

        if let Some(last) = current.last_committed {
            if snapshot.timestamp <= last {
                return Err(CoreError::StaleSnapshot {
                    submitted: snapshot.timestamp,
                    last_committed: last,
                });
            }
        }

        let classification = engine::classify(&current.device_states, &snapshot, &self.options);

        // Build the successor state.
        let mut next = (*current).clone();
        let record = apply_transitions(&mut next.device_states, &snapshot, &classification);

        let identities: BTreeMap<MacAddress, DeviceIdentity> = classification
            .transitions
            .iter()
            .filter_map(|t| {
                next.device_states
                    .get(&t.mac)
                    .map(|s| (t.mac.clone(), s.identity.clone()))
            })
            .collect();

        let events = emitter::derive_events(
            &classification.transitions,
            &identities,
            &next.events,
            snapshot.timestamp,
            &self.options,
        );

        next.history.push(record.clone());
        next.events.extend(events.iter().cloned());
        next.last_committed = Some(snapshot.timestamp);

        // Persist before publishing: a failed write aborts the commit
        // with the previous state still current.
        self.backend.persist(&next)?;
        self.state.store(Arc::new(next));

        if !events.is_empty() {
            let batch = Arc::new(events.clone());
            self.event_tx.send_modify(|b| *b = batch);
        }

        if let Some(ScanAdvisory::SuspectedScanFailure { known_before }) = classification.advisory {
            warn!(known_before, "suspected scan failure: departures suppressed");
        }

        info!(
            timestamp = %snapshot.timestamp,
            observed = snapshot.observations.len(),
            events = events.len(),
            "snapshot committed"
        );

        Ok(CommitOutcome {
            record,
            events,
            advisory: classification.advisory,
        })
    }

    /// Remove history records and events older than `older_than`.
    ///
    /// DeviceState entries are never removed — they are needed for
    /// ongoing absence counting. Persisted with the same all-or-nothing
    /// discipline as commits.
    pub async fn prune_history(&self, older_than: DateTime<Utc>) -> Result<PruneOutcome, CoreError> {
        let _guard = self.write_lock.lock().await;
        let current = self.state.load_full();

        let mut next = (*current).clone();
        let history_before = next.history.len();
        let events_before = next.events.len();
        next.history.retain(|r| r.timestamp >= older_than);
        next.events.retain(|e| e.timestamp >= older_than);

        let outcome = PruneOutcome {
            removed_records: history_before - next.history.len(),
            removed_events: events_before - next.events.len(),
        };

        if outcome.removed_records == 0 && outcome.removed_events == 0 {
            return Ok(outcome);
        }

        self.backend.persist(&next)?;
        self.state.store(Arc::new(next));

        info!(
            removed_records = outcome.removed_records,
            removed_events = outcome.removed_events,
            "history pruned"
        );
        Ok(outcome)
    }
}

// ── Transition application ──────────────────────────────────────────

/// Apply classified transitions to the device-state mapping and build
/// the history record for this snapshot (with first-seen flags).
fn apply_transitions(
    states: &mut BTreeMap<MacAddress, DeviceState>,
    snapshot: &Snapshot,
    classification: &Classification,
) -> HistoryRecord {
    let at = snapshot.timestamp;
    let mut observations = snapshot.observations.clone();

    for transition in &classification.transitions {
        match transition.kind {
            TransitionKind::Arrived => {
                let observed = snapshot.observation(&transition.mac);
                match states.get_mut(&transition.mac) {
                    Some(state) => {
                        state.status = PresenceStatus::Present;
                        state.last_seen = at;
                        state.last_change = at;
                        state.consecutive_misses = 0;
                        if let Some(obs) = observed {
                            refresh_identity(&mut state.identity, &obs.identity);
                        }
                    }
                    None => {
                        let Some(obs) = observed else { continue };
                        states.insert(
                            transition.mac.clone(),
                            DeviceState::first_observed(obs.identity.clone(), at),
                        );
                        if let Some(rec) = observations
                            .iter_mut()
                            .find(|o| o.identity.mac == transition.mac)
                        {
                            rec.first_seen = true;
                        }
                    }
                }
            }
            TransitionKind::Refresh => {
                if let Some(state) = states.get_mut(&transition.mac) {
                    state.last_seen = at;
                    state.consecutive_misses = 0;
                    if let Some(obs) = snapshot.observation(&transition.mac) {
                        refresh_identity(&mut state.identity, &obs.identity);
                    }
                }
            }
            TransitionKind::Miss => {
                if let Some(state) = states.get_mut(&transition.mac) {
                    state.consecutive_misses += 1;
                }
            }
            TransitionKind::Departed => {
                if let Some(state) = states.get_mut(&transition.mac) {
                    state.status = PresenceStatus::Absent;
                    state.last_change = at;
                    state.consecutive_misses += 1;
                }
            }
        }
    }

    HistoryRecord {
        timestamp: at,
        observations,
    }
}

/// Fold newly observed descriptive attributes into a stored identity.
/// The user-assigned friendly name always survives.
fn refresh_identity(stored: &mut DeviceIdentity, observed: &DeviceIdentity) {
    stored.raw_address = observed.raw_address.clone();
    if observed.vendor.is_some() {
        stored.vendor = observed.vendor.clone();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{DeviceObservation, EventKind};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn mac(n: u8) -> MacAddress {
        MacAddress::parse(format!("aa:bb:cc:dd:ee:{n:02x}")).unwrap()
    }

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap()
    }

    fn snapshot(minute: u32, macs: &[MacAddress]) -> Snapshot {
        Snapshot {
            timestamp: ts(minute),
            observations: macs
                .iter()
                .map(|m| DeviceObservation {
                    identity: DeviceIdentity::normalize(m.as_str(), None).unwrap(),
                    ip: None,
                    first_seen: false,
                })
                .collect(),
            host: None,
            interface: None,
        }
    }

    fn memory_store(options: EngineOptions) -> SnapshotStore {
        SnapshotStore::open(Box::new(MemoryBackend::new()), options).unwrap()
    }

    #[tokio::test]
    async fn empty_store_has_empty_state() {
        let store = memory_store(EngineOptions::default());
        assert!(store.current_state().device_states.is_empty());
        assert!(store.current_state().last_committed.is_none());
    }

    #[tokio::test]
    async fn commit_records_history_and_events() {
        let store = memory_store(EngineOptions::default());
        let (a, b) = (mac(1), mac(2));

        let outcome = store.commit(snapshot(0, &[a.clone(), b.clone()])).await.unwrap();
        assert_eq!(outcome.events.len(), 2);
        assert!(outcome.events.iter().all(|e| e.kind == EventKind::Arrived));
        assert!(outcome.record.observations.iter().all(|o| o.first_seen));

        let state = store.current_state();
        assert_eq!(state.device_states.len(), 2);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.last_committed, Some(ts(0)));
    }

    #[tokio::test]
    async fn replaced_device_yields_arrival_and_departure() {
        // prior = {A, B} present; new = {A, C}; threshold = 1.
        let store = memory_store(EngineOptions::default());
        let (a, b, c) = (mac(1), mac(2), mac(3));

        store.commit(snapshot(0, &[a.clone(), b.clone()])).await.unwrap();
        let outcome = store.commit(snapshot(1, &[a.clone(), c.clone()])).await.unwrap();

        let kinds: Vec<(MacAddress, EventKind)> = outcome
            .events
            .iter()
            .map(|e| (e.identity.mac.clone(), e.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![(c.clone(), EventKind::Arrived), (b.clone(), EventKind::Departed)]
        );

        let state = store.current_state();
        assert_eq!(state.device_states[&a].status, PresenceStatus::Present);
        assert_eq!(state.device_states[&b].status, PresenceStatus::Absent);
        assert_eq!(state.device_states[&c].status, PresenceStatus::Present);
    }

    #[tokio::test]
    async fn stale_commit_rejected_and_state_unchanged() {
        let store = memory_store(EngineOptions::default());
        let a = mac(1);

        store.commit(snapshot(5, &[a.clone()])).await.unwrap();
        let before = store.current_state();

        // Identical timestamp (no-op resubmission).
        let err = store.commit(snapshot(5, &[a.clone()])).await.unwrap_err();
        assert!(matches!(err, CoreError::StaleSnapshot { .. }));

        // Earlier timestamp.
        let err = store.commit(snapshot(3, &[])).await.unwrap_err();
        assert!(matches!(err, CoreError::StaleSnapshot { .. }));

        assert_eq!(*before, *store.current_state());
    }

    #[tokio::test]
    async fn absence_debounce_threshold_two_misses_once_quietly() {
        let options = EngineOptions {
            absence_debounce_threshold: 2,
            ..EngineOptions::default()
        };
        let store = memory_store(options);
        let a = mac(1);

        store.commit(snapshot(0, &[a.clone()])).await.unwrap();
        // Missing from exactly one snapshot...
        let outcome = store.commit(snapshot(1, &[])).await.unwrap();
        assert!(outcome.events.is_empty());
        assert_eq!(store.current_state().device_states[&a].consecutive_misses, 1);
        assert_eq!(
            store.current_state().device_states[&a].status,
            PresenceStatus::Present
        );
        // ...and present again in the next: zero events total.
        let outcome = store.commit(snapshot(2, &[a.clone()])).await.unwrap();
        assert!(outcome.events.is_empty());
        assert_eq!(store.current_state().device_states[&a].consecutive_misses, 0);
    }

    #[tokio::test]
    async fn second_miss_departs_at_threshold_two() {
        let options = EngineOptions {
            absence_debounce_threshold: 2,
            ..EngineOptions::default()
        };
        let store = memory_store(options);
        let a = mac(1);

        store.commit(snapshot(0, &[a.clone()])).await.unwrap();
        store.commit(snapshot(1, &[])).await.unwrap();
        let outcome = store.commit(snapshot(2, &[])).await.unwrap();

        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].kind, EventKind::Departed);
        assert_eq!(
            store.current_state().device_states[&a].status,
            PresenceStatus::Absent
        );
    }

    #[tokio::test]
    async fn last_seen_is_monotonic() {
        let store = memory_store(EngineOptions::default());
        let a = mac(1);

        let mut previous = None;
        for minute in [0u32, 1, 3, 7] {
            store.commit(snapshot(minute, &[a.clone()])).await.unwrap();
            let seen = store.current_state().device_states[&a].last_seen;
            if let Some(prev) = previous {
                assert!(seen >= prev);
            }
            previous = Some(seen);
        }
    }

    #[tokio::test]
    async fn failed_persist_leaves_state_unchanged() {
        let backend = Box::new(MemoryBackend::new());
        let store = SnapshotStore::open(backend, EngineOptions::default()).unwrap();
        let a = mac(1);
        store.commit(snapshot(0, &[a.clone()])).await.unwrap();
        let before = store.current_state();

        // Reopen with a failing backend to inject the error.
        let failing = MemoryBackend::new();
        failing.persist(before.as_ref()).unwrap();
        failing.fail_next_persist();
        let store = SnapshotStore::open(Box::new(failing), EngineOptions::default()).unwrap();

        let err = store.commit(snapshot(1, &[])).await.unwrap_err();
        assert!(matches!(err, CoreError::StoreIo { .. }));
        assert_eq!(*before, *store.current_state());
    }

    #[tokio::test]
    async fn outage_suppression_returns_advisory_without_events() {
        let options = EngineOptions {
            suspected_outage_suppression: true,
            ..EngineOptions::default()
        };
        let store = memory_store(options);
        let macs: Vec<MacAddress> = (0..50).map(mac).collect();

        store.commit(snapshot(0, &macs)).await.unwrap();
        let outcome = store.commit(snapshot(1, &[])).await.unwrap();

        assert!(outcome.events.is_empty());
        assert_eq!(
            outcome.advisory,
            Some(ScanAdvisory::SuspectedScanFailure { known_before: 50 })
        );
        // Nobody was marked absent.
        assert!(
            store
                .current_state()
                .device_states
                .values()
                .all(|s| s.status == PresenceStatus::Present)
        );
    }

    #[tokio::test]
    async fn flap_window_collapses_rapid_return() {
        let options = EngineOptions {
            flap_window: Some(chrono::Duration::minutes(10)),
            ..EngineOptions::default()
        };
        let store = memory_store(options);
        let a = mac(1);

        store.commit(snapshot(0, &[a.clone()])).await.unwrap();
        store.commit(snapshot(1, &[])).await.unwrap();
        let outcome = store.commit(snapshot(2, &[a.clone()])).await.unwrap();

        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].kind, EventKind::Flapped);
        // The log never gains two consecutive arrivals for one identity.
        let state = store.current_state();
        let kinds: Vec<EventKind> = state
            .events
            .iter()
            .filter(|e| e.identity.mac == a)
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![EventKind::Arrived, EventKind::Departed, EventKind::Flapped]
        );
    }

    #[tokio::test]
    async fn prune_drops_old_history_but_keeps_device_states() {
        let store = memory_store(EngineOptions::default());
        let a = mac(1);

        store.commit(snapshot(0, &[a.clone()])).await.unwrap();
        store.commit(snapshot(10, &[a.clone()])).await.unwrap();
        store.commit(snapshot(20, &[])).await.unwrap();

        let outcome = store.prune_history(ts(10)).await.unwrap();
        assert_eq!(outcome.removed_records, 1);

        let state = store.current_state();
        assert_eq!(state.history.len(), 2);
        assert!(state.history.iter().all(|r| r.timestamp >= ts(10)));
        // DeviceState survives pruning.
        assert!(state.device_states.contains_key(&a));
    }

    #[tokio::test]
    async fn store_round_trips_through_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let (a, b) = (mac(1), mac(2));

        let expected = {
            let backend = Box::new(JsonFileBackend::new(&path));
            let store = SnapshotStore::open(backend, EngineOptions::default()).unwrap();
            store.commit(snapshot(0, &[a.clone(), b.clone()])).await.unwrap();
            store.commit(snapshot(1, &[a.clone()])).await.unwrap();
            store.current_state()
        };

        let backend = Box::new(JsonFileBackend::new(&path));
        let reloaded = SnapshotStore::open(backend, EngineOptions::default()).unwrap();
        assert_eq!(*expected, *reloaded.current_state());
    }

    #[tokio::test]
    async fn events_stream_sees_committed_batch() {
        let store = memory_store(EngineOptions::default());
        let mut stream = store.events();
        let a = mac(1);

        store.commit(snapshot(0, &[a.clone()])).await.unwrap();

        let batch = stream.changed().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].identity.mac, a);
    }
}
