// ── Core error types ──
//
// User-facing errors from tvremote-core. Consumers never see socket or
// JSON failures directly; the `From<tvremote_api::Error>` impl translates
// transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Discovery errors ─────────────────────────────────────────────
    #[error("Local network access unavailable: {reason}")]
    DiscoveryUnavailable { reason: String },

    #[error("TV not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Pairing rejected by {device}")]
    AuthDenied { device: String },

    #[error("{device} did not answer the pairing prompt within {timeout_secs}s")]
    AuthTimedOut { device: String, timeout_secs: u64 },

    #[error("No TV connected")]
    NotConnected,

    #[error("Connection to TV dropped: {reason}")]
    TransportDropped { reason: String },

    #[error("Cannot connect to TV at {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    // ── Storage & configuration ──────────────────────────────────────
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tvremote_api::Error> for CoreError {
    fn from(err: tvremote_api::Error) -> Self {
        if err.is_local_network_denied() {
            return CoreError::DiscoveryUnavailable {
                reason: err.to_string(),
            };
        }
        match err {
            tvremote_api::Error::Transport(ref e) => CoreError::ConnectionFailed {
                address: e
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "<unknown>".into()),
                reason: e.to_string(),
            },
            tvremote_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            tvremote_api::Error::Io(e) => CoreError::ConnectionFailed {
                address: String::new(),
                reason: e.to_string(),
            },
            tvremote_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                address: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            tvremote_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                address: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            tvremote_api::Error::WebSocketClosed { code, reason } => CoreError::TransportDropped {
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            tvremote_api::Error::ChannelClosed => CoreError::TransportDropped {
                reason: "remote channel closed".into(),
            },
            tvremote_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            tvremote_api::Error::UnexpectedResponse { address, message } => {
                CoreError::ConnectionFailed {
                    address,
                    reason: message,
                }
            }
        }
    }
}
