// ── Event emitter ──
//
// Turns classified transitions into discrete, deduplicated presence
// events. Idempotence rule: the log never gains two consecutive
// arrival-type (or departure) events for one identity. Flap collapsing:
// a departure-then-return inside the configured window emits FLAPPED
// instead of a second ARRIVED.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::engine::{Transition, TransitionKind};
use crate::model::{DeviceIdentity, EventKind, MacAddress, PresenceEvent, PresenceStatus};
use crate::options::EngineOptions;

/// Derive the events to append for one commit.
///
/// `identities` resolves each transitioning key to its identity (the
/// post-transition view, so vendor/name updates flow into events).
/// `prior_events` is the existing append-only log; it is only read.
/// Pure: the caller appends the returned events.
pub fn derive_events(
    transitions: &[Transition],
    identities: &BTreeMap<MacAddress, DeviceIdentity>,
    prior_events: &[PresenceEvent],
    at: DateTime<Utc>,
    options: &EngineOptions,
) -> Vec<PresenceEvent> {
    let mut emitted = Vec::new();

    for transition in transitions {
        let Some(identity) = identities.get(&transition.mac) else {
            continue;
        };
        let last = last_event_for(prior_events, &transition.mac);

        let event = match transition.kind {
            TransitionKind::Arrived => {
                // Repeated refreshes or replayed arrivals never duplicate.
                if last.is_some_and(PresenceEvent::is_arrival) {
                    debug!(mac = %transition.mac, "arrival already logged, skipping");
                    continue;
                }
                let prior_status = last.map(|e| e.new_status);
                let kind = if is_flap(last, at, options) {
                    EventKind::Flapped
                } else {
                    EventKind::Arrived
                };
                PresenceEvent {
                    identity: identity.clone(),
                    kind,
                    timestamp: at,
                    prior_status,
                    new_status: PresenceStatus::Present,
                }
            }
            TransitionKind::Departed => {
                if last.is_some_and(|e| e.kind == EventKind::Departed) {
                    debug!(mac = %transition.mac, "departure already logged, skipping");
                    continue;
                }
                PresenceEvent {
                    identity: identity.clone(),
                    kind: EventKind::Departed,
                    timestamp: at,
                    prior_status: Some(PresenceStatus::Present),
                    new_status: PresenceStatus::Absent,
                }
            }
            TransitionKind::Refresh | TransitionKind::Miss => continue,
        };

        emitted.push(event);
    }

    emitted
}

/// The most recent logged event for an identity, if any.
fn last_event_for<'a>(events: &'a [PresenceEvent], mac: &MacAddress) -> Option<&'a PresenceEvent> {
    events.iter().rev().find(|e| e.identity.mac == *mac)
}

/// Whether an arrival at `at` completes a rapid departure-return cycle.
///
/// Measured from the departure timestamp: the device was gone for less
/// than the flap window before coming back.
fn is_flap(last: Option<&PresenceEvent>, at: DateTime<Utc>, options: &EngineOptions) -> bool {
    let Some(window) = options.flap_window else {
        return false;
    };
    match last {
        Some(event) if event.kind == EventKind::Departed => at - event.timestamp <= window,
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn mac(n: u8) -> MacAddress {
        MacAddress::parse(format!("aa:bb:cc:dd:ee:{n:02x}")).unwrap()
    }

    fn identity(m: &MacAddress) -> DeviceIdentity {
        DeviceIdentity::normalize(m.as_str(), None).unwrap()
    }

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap()
    }

    fn arrival(m: &MacAddress, minute: u32) -> PresenceEvent {
        PresenceEvent {
            identity: identity(m),
            kind: EventKind::Arrived,
            timestamp: ts(minute),
            prior_status: None,
            new_status: PresenceStatus::Present,
        }
    }

    fn departure(m: &MacAddress, minute: u32) -> PresenceEvent {
        PresenceEvent {
            identity: identity(m),
            kind: EventKind::Departed,
            timestamp: ts(minute),
            prior_status: Some(PresenceStatus::Present),
            new_status: PresenceStatus::Absent,
        }
    }

    fn transitions(m: &MacAddress, kind: TransitionKind) -> Vec<Transition> {
        vec![Transition {
            mac: m.clone(),
            kind,
        }]
    }

    fn identities(m: &MacAddress) -> BTreeMap<MacAddress, DeviceIdentity> {
        BTreeMap::from([(m.clone(), identity(m))])
    }

    #[test]
    fn first_arrival_emits_arrived() {
        let m = mac(1);
        let events = derive_events(
            &transitions(&m, TransitionKind::Arrived),
            &identities(&m),
            &[],
            ts(1),
            &EngineOptions::default(),
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Arrived);
        assert_eq!(events[0].prior_status, None);
        assert_eq!(events[0].new_status, PresenceStatus::Present);
    }

    #[test]
    fn repeated_arrival_is_deduplicated() {
        let m = mac(1);
        let log = vec![arrival(&m, 0)];
        let events = derive_events(
            &transitions(&m, TransitionKind::Arrived),
            &identities(&m),
            &log,
            ts(1),
            &EngineOptions::default(),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn repeated_departure_is_deduplicated() {
        let m = mac(1);
        let log = vec![arrival(&m, 0), departure(&m, 1)];
        let events = derive_events(
            &transitions(&m, TransitionKind::Departed),
            &identities(&m),
            &log,
            ts(2),
            &EngineOptions::default(),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn return_within_window_is_flapped() {
        let m = mac(1);
        let log = vec![arrival(&m, 0), departure(&m, 1)];
        let options = EngineOptions {
            flap_window: Some(Duration::minutes(5)),
            ..EngineOptions::default()
        };
        let events = derive_events(
            &transitions(&m, TransitionKind::Arrived),
            &identities(&m),
            &log,
            ts(3),
            &options,
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Flapped);
        assert_eq!(events[0].prior_status, Some(PresenceStatus::Absent));
    }

    #[test]
    fn return_outside_window_is_plain_arrival() {
        let m = mac(1);
        let log = vec![arrival(&m, 0), departure(&m, 1)];
        let options = EngineOptions {
            flap_window: Some(Duration::minutes(5)),
            ..EngineOptions::default()
        };
        let events = derive_events(
            &transitions(&m, TransitionKind::Arrived),
            &identities(&m),
            &log,
            ts(30),
            &options,
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Arrived);
    }

    #[test]
    fn flap_disabled_by_default() {
        let m = mac(1);
        let log = vec![arrival(&m, 0), departure(&m, 1)];
        let events = derive_events(
            &transitions(&m, TransitionKind::Arrived),
            &identities(&m),
            &log,
            ts(2),
            &EngineOptions::default(),
        );
        assert_eq!(events[0].kind, EventKind::Arrived);
    }

    #[test]
    fn arrival_after_flap_is_still_deduplicated() {
        // A FLAPPED event counts as an arrival for dedup purposes.
        let m = mac(1);
        let log = vec![PresenceEvent {
            kind: EventKind::Flapped,
            ..arrival(&m, 2)
        }];
        let events = derive_events(
            &transitions(&m, TransitionKind::Arrived),
            &identities(&m),
            &log,
            ts(3),
            &EngineOptions::default(),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn refresh_and_miss_emit_nothing() {
        let m = mac(1);
        for kind in [TransitionKind::Refresh, TransitionKind::Miss] {
            let events = derive_events(
                &transitions(&m, kind),
                &identities(&m),
                &[],
                ts(1),
                &EngineOptions::default(),
            );
            assert!(events.is_empty());
        }
    }
}
