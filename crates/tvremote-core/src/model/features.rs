// ── Supported-feature flags ──
//
// Parsed from the `isSupport` field of the TV info document, which is
// itself a JSON object encoded as a string. Values arrive as `"true"` /
// `"false"` strings on most firmware and as real booleans on some.

use serde::{Deserialize, Serialize};

/// Capabilities a TV advertises. Missing or malformed input means "no".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct DeviceFeatures {
    pub remote_available: bool,
    pub four_directions: bool,
    pub touch_pad: bool,
    pub voice_control: bool,
    pub token_auth: bool,
    pub ime_synced: bool,
    pub frame_tv: bool,
    pub dmp_available: bool,
    pub eden_available: bool,
}

impl DeviceFeatures {
    /// Parse the `isSupport` string. Never fails.
    pub fn parse(is_support: &str) -> Self {
        let Ok(map) = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(is_support)
        else {
            return Self::default();
        };

        let flag = |key: &str| match map.get(key) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };

        Self {
            remote_available: flag("remote_available"),
            four_directions: flag("remote_fourDirections"),
            touch_pad: flag("remote_touchPad"),
            voice_control: flag("remote_voiceControl"),
            token_auth: flag("TokenAuthSupport"),
            ime_synced: flag("ImeSyncedSupport"),
            frame_tv: flag("FrameTVSupport"),
            dmp_available: flag("DMP_available"),
            eden_available: flag("EDEN_available"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_flags() {
        let raw = r#"{"DMP_DRM_PLAYREADY":"false","DMP_available":"true","EDEN_available":"true",
            "FrameTVSupport":"false","ImeSyncedSupport":"true","TokenAuthSupport":"true",
            "remote_available":"true","remote_fourDirections":"true","remote_touchPad":"true",
            "remote_voiceControl":"false"}"#;
        let features = DeviceFeatures::parse(raw);
        assert!(features.remote_available);
        assert!(features.four_directions);
        assert!(features.touch_pad);
        assert!(!features.voice_control);
        assert!(features.token_auth);
        assert!(features.ime_synced);
        assert!(!features.frame_tv);
        assert!(features.dmp_available);
        assert!(features.eden_available);
    }

    #[test]
    fn accepts_real_booleans() {
        let features = DeviceFeatures::parse(r#"{"remote_available":true,"TokenAuthSupport":false}"#);
        assert!(features.remote_available);
        assert!(!features.token_auth);
    }

    #[test]
    fn malformed_input_is_all_false() {
        assert_eq!(DeviceFeatures::parse("not json"), DeviceFeatures::default());
        assert_eq!(DeviceFeatures::parse(""), DeviceFeatures::default());
        assert_eq!(DeviceFeatures::parse("[1,2]"), DeviceFeatures::default());
    }
}
