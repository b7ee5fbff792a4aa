// Device-info document served at `http://{ip}:8001/api/v2/`.
//
// Every field is optional: older firmware omits half of the `device`
// sub-record, and some TVs send booleans as strings.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::protocol::PLAIN_CHANNEL_PORT;

/// Top-level info document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TvInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
    /// JSON-encoded feature map, e.g. `"{\"remote_available\":\"true\"}"`.
    #[serde(default)]
    pub is_support: Option<String>,
    #[serde(default)]
    pub device: Option<TvDeviceInfo>,
}

/// The `device` sub-record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TvDeviceInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default, rename = "OS")]
    pub os: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub wifi_mac: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub developer_mode: Option<String>,
    #[serde(default, rename = "developerIP")]
    pub developer_ip: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub network_type: Option<String>,
    #[serde(default, rename = "PowerState", alias = "powerState")]
    pub power_state: Option<String>,
    #[serde(default, rename = "TokenAuthSupport")]
    pub token_auth_support: Option<String>,
    #[serde(default, rename = "FrameTVSupport")]
    pub frame_tv_support: Option<String>,
    #[serde(default, rename = "GamePadSupport")]
    pub game_pad_support: Option<String>,
    #[serde(default, rename = "ImeSyncedSupport")]
    pub ime_synced_support: Option<String>,
    #[serde(default, rename = "VoiceSupport")]
    pub voice_support: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default, rename = "Language", alias = "language")]
    pub language: Option<String>,
    #[serde(default)]
    pub duid: Option<String>,
    #[serde(default)]
    pub udn: Option<String>,
    #[serde(default)]
    pub ssid: Option<String>,
    #[serde(default)]
    pub smart_hub_agreement: Option<String>,
    #[serde(default, rename = "WallScreenRatio")]
    pub wall_screen_ratio: Option<String>,
    #[serde(default, rename = "WallService")]
    pub wall_service: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// URL of the info document for a host.
pub fn info_url(host: &str) -> Result<url::Url, Error> {
    Ok(url::Url::parse(&format!(
        "http://{host}:{PLAIN_CHANNEL_PORT}/api/v2/"
    ))?)
}

/// Fetch and parse the info document of the TV at `address`.
pub async fn fetch_tv_info(http: &reqwest::Client, address: IpAddr) -> Result<TvInfo, Error> {
    let host = match address {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{v6}]"),
    };
    fetch_tv_info_at(http, &info_url(&host)?).await
}

/// Fetch the info document from an explicit URL.
pub async fn fetch_tv_info_at(http: &reqwest::Client, url: &url::Url) -> Result<TvInfo, Error> {
    debug!(%url, "fetching TV info");
    let resp = http
        .get(url.clone())
        .send()
        .await
        .map_err(Error::Transport)?;

    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;
    if !status.is_success() {
        return Err(Error::UnexpectedResponse {
            address: url.to_string(),
            message: format!("HTTP {status}"),
        });
    }

    let info: TvInfo = serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.clone(),
    })?;

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_info_document() {
        let json = r#"{
            "device": {
                "FrameTVSupport": "false",
                "GamePadSupport": "true",
                "ImeSyncedSupport": "true",
                "Language": "en_US",
                "OS": "Tizen",
                "PowerState": "on",
                "TokenAuthSupport": "true",
                "VoiceSupport": "true",
                "WallScreenRatio": "0",
                "WallService": "false",
                "countryCode": "US",
                "description": "Samsung DTV RCR",
                "developerIP": "0.0.0.0",
                "developerMode": "0",
                "duid": "uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73",
                "firmwareVersion": "Unknown",
                "id": "uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73",
                "ip": "192.168.1.20",
                "model": "21_KANTSU2E_UHD",
                "modelName": "UE55AU7100",
                "name": "[TV] Living Room",
                "networkType": "wireless",
                "resolution": "3840x2160",
                "smartHubAgreement": "true",
                "ssid": "00:11:22:33:44:55",
                "type": "Samsung SmartTV",
                "udn": "uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73",
                "wifiMac": "AA:BB:CC:DD:EE:FF"
            },
            "id": "uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73",
            "isSupport": "{\"remote_available\":\"true\",\"remote_fourDirections\":\"true\"}",
            "name": "[TV] Living Room",
            "remote": "1.0",
            "type": "Samsung SmartTV",
            "uri": "http://192.168.1.20:8001/api/v2/",
            "version": "2.0.25"
        }"#;

        let info: TvInfo = serde_json::from_str(json).expect("info");
        assert_eq!(info.name.as_deref(), Some("[TV] Living Room"));
        assert_eq!(info.kind.as_deref(), Some("Samsung SmartTV"));
        let device = info.device.expect("device");
        assert_eq!(device.os.as_deref(), Some("Tizen"));
        assert_eq!(device.developer_ip.as_deref(), Some("0.0.0.0"));
        assert_eq!(device.token_auth_support.as_deref(), Some("true"));
        assert_eq!(device.wifi_mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(device.model_name.as_deref(), Some("UE55AU7100"));
        assert_eq!(device.power_state.as_deref(), Some("on"));
        assert_eq!(device.language.as_deref(), Some("en_US"));
    }

    #[test]
    fn tolerates_missing_device_record() {
        let info: TvInfo = serde_json::from_str(r#"{"id":"uuid:1","name":"TV"}"#).expect("info");
        assert!(info.device.is_none());
        assert!(info.is_support.is_none());
    }

    #[test]
    fn info_url_targets_plain_port() {
        let url = info_url("10.0.0.7").expect("url");
        assert_eq!(url.as_str(), "http://10.0.0.7:8001/api/v2/");
    }
}
