// ── Device identity types ──
//
// DeviceId and MacAddress identify a physical TV. Samsung TVs report
// `uuid:`-prefixed UDNs; anything else is kept verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const UDN_PREFIX: &str = "uuid:";

// ── DeviceId ────────────────────────────────────────────────────────

/// Canonical identifier for a TV, unique per physical set.
///
/// Serialized in the form the TV itself reports (`uuid:...`), so a
/// persisted record compares equal to the next discovery result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceId {
    Udn(Uuid),
    Other(String),
}

impl DeviceId {
    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Self::Udn(u) => Some(u),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udn(u) => write!(f, "{UDN_PREFIX}{u}"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for DeviceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix(UDN_PREFIX).unwrap_or(trimmed);
        match Uuid::parse_str(bare) {
            Ok(u) => Self::Udn(u),
            Err(_) => Self::Other(trimmed.to_owned()),
        }
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl Serialize for DeviceId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw))
    }
}

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    /// Accepts colon-separated, dash-separated, or bare hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let lower = raw.as_ref().trim().to_lowercase().replace('-', ":");
        if lower.len() == 12 && lower.chars().all(|c| c.is_ascii_hexdigit()) {
            let pairs: Vec<&str> = (0..6).map(|i| &lower[i * 2..i * 2 + 2]).collect();
            return Self(pairs.join(":"));
        }
        Self(lower)
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
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn device_id_from_udn() {
        let id = DeviceId::from("uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73");
        assert!(id.as_uuid().is_some());
        assert_eq!(id.to_string(), "uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73");
    }

    #[test]
    fn bare_uuid_and_udn_are_the_same_device() {
        let a = DeviceId::from("uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73");
        let b = DeviceId::from("0EE5FF3C-3A6F-4A62-9A58-2B4CE6F4EF73");
        assert_eq!(a, b);
    }

    #[test]
    fn device_id_keeps_other_strings() {
        let id: DeviceId = "192.168.1.20".parse().unwrap();
        assert_eq!(id, DeviceId::Other("192.168.1.20".into()));
        assert_eq!(id.to_string(), "192.168.1.20");
    }

    #[test]
    fn device_id_serde_is_a_plain_string() {
        let id = DeviceId::from("uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73\"");
        let back: DeviceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn mac_address_normalizes_dashes_and_case() {
        let mac = MacAddress::new("AA-BB-CC-DD-EE-FF");
        assert_eq!(mac.as_str(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn mac_address_accepts_bare_hex() {
        let mac: MacAddress = "AABBCCDDEEFF".parse().unwrap();
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }
}
