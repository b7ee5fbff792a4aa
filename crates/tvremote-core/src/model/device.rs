// ── Device domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use tvremote_api::TvInfo;

use super::device_id::{DeviceId, MacAddress};
use super::features::DeviceFeatures;
use super::html::decode_entities;

/// Vendor metadata from the `device` sub-record of the info document.
///
/// Strings default to empty and flags to `false` when the TV omits them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct VendorInfo {
    pub model: String,
    pub model_name: String,
    pub os: String,
    pub resolution: String,
    pub mac: Option<MacAddress>,
    pub developer_mode: bool,
    pub developer_ip: String,
    pub firmware_version: String,
    pub network_type: String,
    pub power_state: String,
    pub country_code: String,
    pub language: String,
    pub token_auth_support: bool,
    pub frame_tv_support: bool,
    pub game_pad_support: bool,
    pub voice_support: bool,
    pub description: String,
}

/// An immutable snapshot of a discovered TV.
///
/// Identity is the [`DeviceId`] alone: two values with the same id are the
/// same physical TV even if name or address changed between sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    /// Name as reported, possibly HTML-entity encoded. Use
    /// [`display_name`](Self::display_name) for presentation.
    pub name: String,
    pub address: IpAddr,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub features: DeviceFeatures,
    #[serde(default)]
    pub vendor: VendorInfo,
    pub seen_at: DateTime<Utc>,
}

impl Device {
    /// Minimal device with no vendor metadata.
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>, address: IpAddr) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address,
            kind: None,
            version: None,
            uri: None,
            features: DeviceFeatures::default(),
            vendor: VendorInfo::default(),
            seen_at: Utc::now(),
        }
    }

    /// Build a device from an info document fetched at `address`.
    ///
    /// Tolerates any missing field. The id falls back to the device
    /// sub-record, then to the address itself.
    pub fn from_info(address: IpAddr, info: TvInfo) -> Self {
        let sub = info.device.unwrap_or_default();
        let flag = |v: &Option<String>| {
            v.as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("true") || s == "1")
        };

        let id = info
            .id
            .as_deref()
            .or(sub.id.as_deref())
            .or(sub.duid.as_deref())
            .filter(|s| !s.trim().is_empty())
            .map_or_else(|| DeviceId::Other(address.to_string()), DeviceId::from);

        let name = [info.name.as_deref(), sub.name.as_deref(), sub.model_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .map_or_else(|| address.to_string(), str::to_owned);

        let vendor = VendorInfo {
            model: sub.model.unwrap_or_default(),
            model_name: sub.model_name.unwrap_or_default(),
            os: sub.os.unwrap_or_default(),
            resolution: sub.resolution.unwrap_or_default(),
            mac: sub
                .wifi_mac
                .as_deref()
                .filter(|m| !m.is_empty())
                .map(MacAddress::new),
            developer_mode: flag(&sub.developer_mode),
            developer_ip: sub.developer_ip.unwrap_or_default(),
            firmware_version: sub.firmware_version.unwrap_or_default(),
            network_type: sub.network_type.unwrap_or_default(),
            power_state: sub.power_state.unwrap_or_default(),
            country_code: sub.country_code.unwrap_or_default(),
            language: sub.language.unwrap_or_default(),
            token_auth_support: flag(&sub.token_auth_support),
            frame_tv_support: flag(&sub.frame_tv_support),
            game_pad_support: flag(&sub.game_pad_support),
            voice_support: flag(&sub.voice_support),
            description: sub.description.unwrap_or_default(),
        };

        Self {
            id,
            name,
            address,
            kind: info.kind.or(sub.kind),
            version: info.version,
            uri: info.uri,
            features: info
                .is_support
                .as_deref()
                .map(DeviceFeatures::parse)
                .unwrap_or_default(),
            vendor,
            seen_at: Utc::now(),
        }
    }

    /// Human-readable name with HTML entities decoded.
    pub fn display_name(&self) -> String {
        decode_entities(&self.name)
    }

    /// Whether the TV issues pairing tokens on the secure channel.
    pub fn supports_token_auth(&self) -> bool {
        self.features.token_auth || self.vendor.token_auth_support
    }

    /// Address formatted for use as a URL host.
    pub fn host(&self) -> String {
        match self.address {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{v6}]"),
        }
    }

    /// Match a user-supplied selector: id, exact display name
    /// (case-insensitive), or address.
    pub fn matches(&self, selector: &str) -> bool {
        let selector = selector.trim();
        self.id == DeviceId::from(selector)
            || self.display_name().eq_ignore_ascii_case(selector)
            || self.address.to_string() == selector
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Device {}

impl Hash for Device {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
