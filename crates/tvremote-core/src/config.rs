// ── Runtime configuration ──
//
// Describes how discovery and pairing behave. The CLI builds a
// `RemoteConfig` from its config file and hands it in; core never
// touches disk.

use std::time::Duration;

use tvremote_api::{TlsMode, TransportConfig};

/// Default search window.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Default bound on the TV-side pairing prompt.
pub const DEFAULT_PAIRING_TIMEOUT: Duration = Duration::from_secs(30);

/// TLS verification strategy for the secure remote channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// Web PKI roots (fails against stock TVs).
    SystemDefaults,
    /// Skip verification. TVs ship self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for the discovery engine and connection registry.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Shown on the TV's pairing prompt.
    pub app_name: String,
    /// How long a sweep runs before it stops on its own.
    pub search_timeout: Duration,
    /// How long the registry waits in `AuthPending`. `None` waits forever.
    pub pairing_timeout: Option<Duration>,
    /// Info-fetch and WebSocket handshake timeout.
    pub request_timeout: Duration,
    pub tls: TlsVerification,
    /// Prefer `wss://…:8002` when the TV supports token auth.
    pub secure_channel: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            app_name: "TV Remote".into(),
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            pairing_timeout: Some(DEFAULT_PAIRING_TIMEOUT),
            request_timeout: Duration::from_secs(5),
            tls: TlsVerification::default(),
            secure_channel: true,
        }
    }
}

impl RemoteConfig {
    /// Transport settings for the protocol layer.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match self.tls {
                TlsVerification::SystemDefaults => TlsMode::Verify,
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.request_timeout,
        }
    }
}
