//! Wire messages for the `samsung.remote.control` channel.
//!
//! Outbound frames are JSON `ms.remote.control` requests; inbound frames
//! are `{ "event": "...", "data": ... }` notifications. Only the events
//! that matter for pairing are typed, everything else is surfaced as
//! [`ChannelEvent::Other`].

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use url::Url;

/// Channel path on the TV's remote service.
pub const REMOTE_CHANNEL_PATH: &str = "/api/v2/channels/samsung.remote.control";
/// Port of the token-authenticated `wss://` channel.
pub const SECURE_CHANNEL_PORT: u16 = 8002;
/// Port of the plain `ws://` channel and the info document.
pub const PLAIN_CHANNEL_PORT: u16 = 8001;

const METHOD_REMOTE_CONTROL: &str = "ms.remote.control";

// ── Outbound ─────────────────────────────────────────────────────────

/// An outbound frame on the remote channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRequest {
    pub method: &'static str,
    pub params: RemoteParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteParams {
    #[serde(rename = "Cmd")]
    pub cmd: String,
    #[serde(rename = "DataOfCmd")]
    pub data_of_cmd: String,
    #[serde(rename = "Option", skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    #[serde(rename = "TypeOfRemote")]
    pub type_of_remote: &'static str,
}

impl RemoteRequest {
    /// A single key click, e.g. `KEY_VOLUP`.
    pub fn key_click(key_code: &str) -> Self {
        Self {
            method: METHOD_REMOTE_CONTROL,
            params: RemoteParams {
                cmd: "Click".into(),
                data_of_cmd: key_code.to_owned(),
                option: Some("false".into()),
                type_of_remote: "SendRemoteKey",
            },
        }
    }

    /// A text-input payload for the TV's on-screen keyboard.
    ///
    /// The TV expects the text base64-encoded inside `Cmd`.
    pub fn input_text(text: &str) -> Self {
        Self {
            method: METHOD_REMOTE_CONTROL,
            params: RemoteParams {
                cmd: STANDARD.encode(text.as_bytes()),
                data_of_cmd: "base64".into(),
                option: None,
                type_of_remote: "SendInputString",
            },
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing a struct of strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Build the remote-channel URL for a TV.
///
/// `secure` selects `wss://host:8002` (token auth) over `ws://host:8001`.
/// The app name is shown on the TV's pairing prompt and must be base64.
pub fn channel_url(
    host: &str,
    app_name: &str,
    token: Option<&str>,
    secure: bool,
) -> Result<Url, url::ParseError> {
    let (scheme, port) = if secure {
        ("wss", SECURE_CHANNEL_PORT)
    } else {
        ("ws", PLAIN_CHANNEL_PORT)
    };
    let mut url = Url::parse(&format!("{scheme}://{host}:{port}{REMOTE_CHANNEL_PATH}"))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("name", &STANDARD.encode(app_name.as_bytes()));
        if let Some(token) = token {
            query.append_pair("token", token);
        }
    }
    Ok(url)
}

// ── Inbound ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawChannelEvent {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// A parsed inbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// `ms.channel.connect`: the user approved (or had already approved)
    /// this app. Carries a pairing token when the TV issues one.
    Connected { token: Option<String> },
    /// `ms.channel.unauthorized`: the user rejected the pairing prompt.
    Unauthorized,
    /// `ms.channel.timeOut`: the prompt expired without an answer.
    TimedOut,
    /// Anything else (`ms.channel.clientConnect`, `ms.remote.imeStart`, ...).
    Other { event: String },
}

impl ChannelEvent {
    /// Parse a text frame. Returns `None` for frames that are not events.
    pub fn parse(text: &str) -> Option<Self> {
        let raw: RawChannelEvent = serde_json::from_str(text).ok()?;
        let event = match raw.event.as_str() {
            "ms.channel.connect" => Self::Connected {
                token: raw
                    .data
                    .get("token")
                    .and_then(serde_json::Value::as_str)
                    .map(String::from),
            },
            "ms.channel.unauthorized" => Self::Unauthorized,
            "ms.channel.timeOut" => Self::TimedOut,
            _ => Self::Other { event: raw.event },
        };
        Some(event)
    }
}
