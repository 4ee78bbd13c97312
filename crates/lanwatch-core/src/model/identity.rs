// ── Device identity types ──
//
// MacAddress is the canonical key for every device across snapshots.
// Normalization is pure and deterministic: the same raw input always
// yields the same key, and two raw forms of the same address (colons,
// dashes, bare hex, mixed case) collapse to one key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── MacAddress ──────────────────────────────────────────────────────

/// Hardware address, normalized to lowercase colon-separated form
/// (`aa:bb:cc:dd:ee:ff`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacAddress(String);

impl MacAddress {
    /// Parse and normalize a hardware address from any common format.
    ///
    /// Accepts colon-separated, dash-separated, or bare 12-digit hex.
    /// Anything else fails with [`CoreError::MalformedAddress`].
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let raw = raw.as_ref();
        let hex: String = raw
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::MalformedAddress { raw: raw.into() });
        }

        // Separator placement must be consistent: either none at all,
        // or one every two digits. "aa:bbcc:dd:ee:ff" is rejected.
        let separated: Vec<&str> = raw.split([':', '-']).collect();
        let shape_ok = separated.len() == 1
            || (separated.len() == 6 && separated.iter().all(|part| part.len() == 2));
        if !shape_ok {
            return Err(CoreError::MalformedAddress { raw: raw.into() });
        }

        let mut out = String::with_capacity(17);
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            if i > 0 {
                out.push(':');
            }
            out.push(char::from(chunk[0]));
            out.push(char::from(chunk[1]));
        }
        Ok(Self(out))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ── DeviceIdentity ──────────────────────────────────────────────────

/// Canonical identity of one physical device.
///
/// The [`MacAddress`] key uniquely identifies the device across
/// snapshots; the remaining fields are descriptive attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Canonical key.
    pub mac: MacAddress,
    /// The address string exactly as submitted.
    pub raw_address: String,
    /// Vendor label from the discovery tool's OUI lookup, cleaned.
    pub vendor: Option<String>,
    /// User-assigned friendly name.
    pub friendly_name: Option<String>,
}

impl DeviceIdentity {
    /// Normalize a raw observation into a canonical identity.
    ///
    /// Fails with [`CoreError::MalformedAddress`] when the address does
    /// not match the expected hardware-address shape. Pure: no I/O.
    pub fn normalize(raw_address: &str, vendor: Option<&str>) -> Result<Self, CoreError> {
        let mac = MacAddress::parse(raw_address)?;
        let vendor = vendor.map(clean_vendor).filter(|v| !v.is_empty());
        Ok(Self {
            mac,
            raw_address: raw_address.to_owned(),
            vendor,
            friendly_name: None,
        })
    }

    /// Best display label: friendly name, then vendor, then the MAC.
    pub fn label(&self) -> &str {
        self.friendly_name
            .as_deref()
            .or(self.vendor.as_deref())
            .unwrap_or(self.mac.as_str())
    }
}

/// Clean a raw vendor string from discovery-tool output.
///
/// arp-scan vendor columns can contain tabs and a parenthesized copy of
/// the MAC address; both are stripped and whitespace is collapsed.
fn clean_vendor(raw: &str) -> String {
    let no_tabs = raw.replace('\t', " ");
    let no_mac = strip_parenthesized_macs(&no_tabs);
    no_mac.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove `(aa:bb:cc:dd:ee:ff)` fragments from a vendor string.
fn strip_parenthesized_macs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find('(') {
        let (head, tail) = rest.split_at(open);
        out.push_str(head);
        match tail.find(')') {
            Some(close) => {
                let inner = &tail[1..close];
                if !looks_like_mac(inner) {
                    out.push_str(&tail[..=close]);
                }
                rest = &tail[close + 1..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn looks_like_mac(s: &str) -> bool {
    s.len() == 17
        && s.split(':').count() == 6
        && s.split(':')
            .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}
