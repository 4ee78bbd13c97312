// ── Snapshot model and submission boundary ──
//
// A Snapshot is one discovery pass: a timestamp plus the set of devices
// observed. SnapshotSubmission is the JSON wire shape produced by the
// external scanner; normalizing it skips malformed devices one by one
// and never aborts the whole snapshot.

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::identity::{DeviceIdentity, MacAddress};
use crate::error::CoreError;

// ── Domain types ────────────────────────────────────────────────────

/// One device as observed in a single discovery pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceObservation {
    pub identity: DeviceIdentity,
    /// IP address reported by the scanner, if any.
    pub ip: Option<IpAddr>,
    /// Set at commit time when this identity had never been seen in any
    /// prior snapshot.
    #[serde(default)]
    pub first_seen: bool,
}

/// A single discovery pass: timestamp plus observed device set.
///
/// Identities are unique within one snapshot; duplicate submissions for
/// the same hardware address collapse during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub observations: Vec<DeviceObservation>,
    /// Hostname of the scanning machine, when the submission carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Network interface the scan ran on, when the submission carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
}

impl Snapshot {
    /// Look up an observation by canonical key.
    pub fn observation(&self, mac: &MacAddress) -> Option<&DeviceObservation> {
        self.observations.iter().find(|o| o.identity.mac == *mac)
    }

    /// Canonical keys observed in this pass.
    pub fn macs(&self) -> impl Iterator<Item = &MacAddress> {
        self.observations.iter().map(|o| &o.identity.mac)
    }
}

// ── Wire shapes ─────────────────────────────────────────────────────

/// One raw device entry in a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDevice {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpAddr>,
}

/// The JSON boundary shape delivered by the external scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSubmission {
    pub timestamp: DateTime<Utc>,
    pub devices: Vec<RawDevice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
}

/// A device entry that failed normalization, with the reason.
#[derive(Debug)]
pub struct RejectedDevice {
    pub raw: RawDevice,
    pub error: CoreError,
}

/// Result of normalizing a submission: the candidate snapshot plus any
/// per-device rejections.
#[derive(Debug)]
pub struct NormalizedSubmission {
    pub snapshot: Snapshot,
    pub rejected: Vec<RejectedDevice>,
}

impl SnapshotSubmission {
    /// Normalize this submission into a candidate [`Snapshot`].
    ///
    /// Malformed entries are rejected per-device; the remainder proceeds.
    /// Duplicate addresses collapse onto the first occurrence (later
    /// entries may still fill in a missing vendor or IP). A submission
    /// with zero valid devices still yields a snapshot — the engine's
    /// outage handling decides what that means.
    pub fn normalize(self) -> NormalizedSubmission {
        let mut seen: BTreeMap<MacAddress, DeviceObservation> = BTreeMap::new();
        let mut order: Vec<MacAddress> = Vec::new();
        let mut rejected = Vec::new();

        for raw in self.devices {
            match DeviceIdentity::normalize(&raw.address, raw.vendor.as_deref()) {
                Ok(identity) => {
                    let mac = identity.mac.clone();
                    if let Some(existing) = seen.get_mut(&mac) {
                        debug!(mac = %mac, "duplicate observation collapsed");
                        if existing.identity.vendor.is_none() {
                            existing.identity.vendor = identity.vendor;
                        }
                        if existing.ip.is_none() {
                            existing.ip = raw.ip;
                        }
                    } else {
                        order.push(mac.clone());
                        seen.insert(
                            mac,
                            DeviceObservation {
                                identity,
                                ip: raw.ip,
                                first_seen: false,
                            },
                        );
                    }
                }
                Err(error) => {
                    debug!(address = %raw.address, error = %error, "device rejected");
                    rejected.push(RejectedDevice { raw, error });
                }
            }
        }

        let observations = order
            .into_iter()
            .filter_map(|mac| seen.remove(&mac))
            .collect();

        NormalizedSubmission {
            snapshot: Snapshot {
                timestamp: self.timestamp,
                observations,
                host: self.host,
                interface: self.interface,
            },
            rejected,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn raw(address: &str) -> RawDevice {
        RawDevice {
            address: address.into(),
            vendor: None,
            ip: None,
        }
    }

    #[test]
    fn normalize_skips_malformed_and_keeps_rest() {
        let sub = SnapshotSubmission {
            timestamp: ts(),
            devices: vec![raw("aa:bb:cc:dd:ee:01"), raw("nonsense"), raw("aa:bb:cc:dd:ee:02")],
            host: None,
            interface: None,
        };
        let normalized = sub.normalize();
        assert_eq!(normalized.snapshot.observations.len(), 2);
        assert_eq!(normalized.rejected.len(), 1);
        assert!(matches!(
            normalized.rejected[0].error,
            CoreError::MalformedAddress { .. }
        ));
    }

    #[test]
    fn normalize_collapses_duplicates() {
        let sub = SnapshotSubmission {
            timestamp: ts(),
            devices: vec![
                raw("AA:BB:CC:DD:EE:01"),
                RawDevice {
                    address: "aa-bb-cc-dd-ee-01".into(),
                    vendor: Some("NETGEAR".into()),
                    ip: Some("192.168.1.10".parse().unwrap()),
                },
            ],
            host: None,
            interface: None,
        };
        let normalized = sub.normalize();
        assert_eq!(normalized.snapshot.observations.len(), 1);
        let obs = &normalized.snapshot.observations[0];
        // Later duplicate filled in the missing vendor and IP.
        assert_eq!(obs.identity.vendor.as_deref(), Some("NETGEAR"));
        assert!(obs.ip.is_some());
    }

    #[test]
    fn zero_valid_devices_still_yields_snapshot() {
        let sub = SnapshotSubmission {
            timestamp: ts(),
            devices: vec![raw("bogus")],
            host: None,
            interface: None,
        };
        let normalized = sub.normalize();
        assert!(normalized.snapshot.observations.is_empty());
        assert_eq!(normalized.rejected.len(), 1);
    }

    #[test]
    fn submission_json_round_trip_with_metadata() {
        let json = r#"{
            "timestamp": "2026-03-01T12:00:00Z",
            "host": "scanner-pi",
            "interface": "wlan0",
            "devices": [
                {"address": "aa:bb:cc:dd:ee:ff", "vendor": "Sonos", "ip": "192.168.1.23"}
            ]
        }"#;
        let sub: SnapshotSubmission = serde_json::from_str(json).unwrap();
        let normalized = sub.normalize();
        assert_eq!(normalized.snapshot.host.as_deref(), Some("scanner-pi"));
        assert_eq!(normalized.snapshot.interface.as_deref(), Some("wlan0"));
        assert_eq!(normalized.snapshot.observations.len(), 1);
    }
}
