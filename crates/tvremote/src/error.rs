//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use tvremote_config::ConfigError;
use tvremote_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Discovery ────────────────────────────────────────────────────
    #[error("Cannot search the local network: {reason}")]
    #[diagnostic(
        code(tvremote::discovery_unavailable),
        help(
            "Multicast discovery needs UDP port 1900 and local network access.\n\
             If a firewall blocks it, connect by address instead: tvremote connect <ip>"
        )
    )]
    DiscoveryUnavailable { reason: String },

    #[error("TV '{identifier}' not found")]
    #[diagnostic(
        code(tvremote::not_found),
        help("Run: tvremote discover to see TVs on the network")
    )]
    DeviceNotFound { identifier: String },

    #[error("No TV has been paired yet")]
    #[diagnostic(
        code(tvremote::no_saved_tv),
        help("Pair with one first: tvremote connect <id|name|ip>")
    )]
    NoSavedDevice,

    // ── Pairing ──────────────────────────────────────────────────────
    #[error("{device} rejected the pairing request")]
    #[diagnostic(
        code(tvremote::auth_denied),
        help(
            "Choose Allow on the TV's prompt. If the prompt no longer appears,\n\
             check Settings > General > External Device Manager > Device Connection Manager."
        )
    )]
    AuthDenied { device: String },

    #[error("{device} did not answer the pairing prompt within {seconds}s")]
    #[diagnostic(
        code(tvremote::auth_timeout),
        help("Run the command again and accept the prompt on the TV.")
    )]
    AuthTimedOut { device: String, seconds: u64 },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to TV at {address}")]
    #[diagnostic(
        code(tvremote::connection_failed),
        help(
            "Check that the TV is on and on the same network.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { address: String, reason: String },

    #[error("Connection to the TV was lost: {reason}")]
    #[diagnostic(code(tvremote::connection_lost))]
    ConnectionLost { reason: String },

    // ── Input ────────────────────────────────────────────────────────
    #[error("Unknown key '{key}'")]
    #[diagnostic(code(tvremote::unknown_key), help("Run: tvremote keys to list valid key names"))]
    UnknownKey { key: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tvremote::validation))]
    Validation { field: String, reason: String },

    // ── Configuration & state ────────────────────────────────────────
    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(tvremote::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(tvremote::config))]
    Config(Box<figment::Error>),

    #[error("Could not save or load local state: {message}")]
    #[diagnostic(code(tvremote::persistence))]
    Persistence { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(tvremote::internal))]
    Internal { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to serialize config: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::ConnectionLost { .. } => exit_code::CONNECTION,
            Self::AuthDenied { .. } => exit_code::AUTH,
            Self::AuthTimedOut { .. } => exit_code::TIMEOUT,
            Self::DeviceNotFound { .. } | Self::NoSavedDevice => exit_code::NOT_FOUND,
            Self::DiscoveryUnavailable { .. } => exit_code::PERMISSION,
            Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::UnknownKey { .. } | Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DiscoveryUnavailable { reason } => CliError::DiscoveryUnavailable { reason },

            CoreError::DeviceNotFound { identifier } => CliError::DeviceNotFound { identifier },

            CoreError::AuthDenied { device } => CliError::AuthDenied { device },

            CoreError::AuthTimedOut {
                device,
                timeout_secs,
            } => CliError::AuthTimedOut {
                device,
                seconds: timeout_secs,
            },

            CoreError::NotConnected => CliError::ConnectionLost {
                reason: "no TV connected".into(),
            },

            CoreError::TransportDropped { reason } => CliError::ConnectionLost { reason },

            CoreError::ConnectionFailed { address, reason } => {
                CliError::ConnectionFailed { address, reason }
            }

            CoreError::InvalidInput { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Persistence { message } => CliError::Persistence { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Serialization(e) => CliError::Toml(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
