// ── Change-detection engine ──
//
// Pure set-partition diff between the previous per-device state and a
// new snapshot. No I/O and no persistence: the store applies the
// resulting transitions, the emitter derives events from them. This
// keeps the algorithm deterministic and unit-testable against
// constructed prior states.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::model::{DeviceState, MacAddress, PresenceStatus, Snapshot};
use crate::options::EngineOptions;

/// Per-identity transition classified by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub mac: MacAddress,
    pub kind: TransitionKind,
}

/// What happened to one identity between the previous state and the
/// new snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// NONE->PRESENT or ABSENT->PRESENT. Candidate ARRIVED event.
    Arrived,
    /// PRESENT->ABSENT, debounce threshold reached. Candidate DEPARTED.
    Departed,
    /// Seen again while already present: last-seen bump only.
    Refresh,
    /// Missing from this snapshot but below the debounce threshold, or
    /// already absent. Increments the miss counter, emits nothing.
    Miss,
}

/// Advisory condition surfaced alongside normal output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanAdvisory {
    /// An empty snapshot arrived while a non-trivial device population
    /// was known. The mass departure was suppressed; the external layer
    /// decides whether to alarm.
    SuspectedScanFailure { known_before: usize },
}

/// Output of one classification pass.
#[derive(Debug, Clone)]
pub struct Classification {
    pub transitions: Vec<Transition>,
    pub advisory: Option<ScanAdvisory>,
}

impl Classification {
    /// Transitions of a given kind, in classification order.
    pub fn of_kind(&self, kind: TransitionKind) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter(move |t| t.kind == kind)
    }
}

/// Classify every identity touched by `snapshot` against `previous`.
///
/// Pure function: same inputs always yield the same transitions.
/// Ordering within the output follows the canonical key order, so
/// results are reproducible regardless of submission order.
pub fn classify(
    previous: &BTreeMap<MacAddress, DeviceState>,
    snapshot: &Snapshot,
    options: &EngineOptions,
) -> Classification {
    let seen_now: BTreeSet<&MacAddress> = snapshot.macs().collect();
    let known_before: BTreeSet<&MacAddress> = previous.keys().collect();

    // Outage plausibility check: an empty scan against a large known
    // population is more likely a broken scan than a real outage.
    if options.suspected_outage_suppression
        && seen_now.is_empty()
        && known_before.len() >= options.outage_min_population
    {
        debug!(
            known_before = known_before.len(),
            "empty snapshot against large population: suppressing departures"
        );
        return Classification {
            transitions: Vec::new(),
            advisory: Some(ScanAdvisory::SuspectedScanFailure {
                known_before: known_before.len(),
            }),
        };
    }

    let mut transitions = Vec::new();

    // Newly appeared and still present.
    for mac in &seen_now {
        let kind = match previous.get(*mac) {
            None => TransitionKind::Arrived,
            Some(state) => match state.status {
                PresenceStatus::Absent => TransitionKind::Arrived,
                PresenceStatus::Present => TransitionKind::Refresh,
            },
        };
        transitions.push(Transition {
            mac: (*mac).clone(),
            kind,
        });
    }

    // Now absent: debounce before declaring departure.
    for mac in known_before.difference(&seen_now) {
        let Some(state) = previous.get(*mac) else {
            continue;
        };
        let kind = match state.status {
            PresenceStatus::Present
                if state.consecutive_misses + 1 >= options.absence_debounce_threshold =>
            {
                TransitionKind::Departed
            }
            _ => TransitionKind::Miss,
        };
        transitions.push(Transition {
            mac: (*mac).clone(),
            kind,
        });
    }

    Classification {
        transitions,
        advisory: None,
    }
}
