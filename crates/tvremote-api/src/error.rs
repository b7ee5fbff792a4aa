use thiserror::Error;

/// Top-level error type for the `tvremote-api` crate.
///
/// Covers every failure mode of the TV-side protocols: SSDP search,
/// the device-info HTTP endpoint, and the remote-control WebSocket
/// channel. `tvremote-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Socket-level failure (bind, multicast join, send).
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS configuration error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Remote channel ──────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// The channel's writer task is gone; nothing more can be sent.
    #[error("Remote channel is closed")]
    ChannelClosed,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The TV answered with something that is not a Samsung info document.
    #[error("Unexpected response from {address}: {message}")]
    UnexpectedResponse { address: String, message: String },
}

impl Error {
    /// Returns `true` if the failure happened while opening a local socket,
    /// i.e. the host refused us access to the local network.
    pub fn is_local_network_denied(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::AddrNotAvailable
                    | std::io::ErrorKind::AddrInUse
            ),
            _ => false,
        }
    }
}
