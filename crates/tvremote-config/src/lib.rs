//! Configuration and on-disk state for the tvremote tools.
//!
//! TOML config with environment overrides, translation to
//! `tvremote_core::RemoteConfig`, and the file/keyring backed stores the
//! connection registry persists through.

mod persist;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tvremote_core::{RemoteConfig, TlsVerification};

pub use persist::{FileDeviceStore, KeyringTokenStore};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Name shown on the TV's pairing prompt.
    pub app_name: String,

    /// Discovery window in seconds.
    pub search_timeout_secs: u64,

    /// How long to wait for the user to accept the pairing prompt.
    /// `0` waits indefinitely.
    pub pairing_timeout_secs: u64,

    /// Device-info fetch and channel handshake timeout.
    pub request_timeout_secs: u64,

    /// Verify the TV's TLS certificate. Stock TVs use self-signed ones.
    pub verify_tls: bool,

    /// Use the TLS channel on port 8002 when the TV supports it.
    pub secure_channel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "TV Remote".into(),
            search_timeout_secs: 10,
            pairing_timeout_secs: 30,
            request_timeout_secs: 5,
            verify_tls: false,
            secure_channel: true,
        }
    }
}

impl Config {
    /// Validate and convert into the core's runtime configuration.
    pub fn to_remote_config(&self) -> Result<RemoteConfig, ConfigError> {
        if self.app_name.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "app_name".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.search_timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "search_timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "request_timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(RemoteConfig {
            app_name: self.app_name.clone(),
            search_timeout: Duration::from_secs(self.search_timeout_secs),
            pairing_timeout: (self.pairing_timeout_secs > 0)
                .then(|| Duration::from_secs(self.pairing_timeout_secs)),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            tls: if self.verify_tls {
                TlsVerification::SystemDefaults
            } else {
                TlsVerification::DangerAcceptInvalid
            },
            secure_channel: self.secure_channel,
        })
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tvremote", "tvremote")
}

fn dirs_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("tvremote");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory for state the tools write themselves.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

/// Where the last connected TV is recorded.
pub fn device_record_path() -> PathBuf {
    data_dir().join("last_device.json")
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load the config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then `path` (if present), then `TVREMOTE_*` variables.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TVREMOTE_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, falling back to defaults on any error.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable config");
        Config::default()
    })
}

// ── Saving ──────────────────────────────────────────────────────────

/// Write the config to the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_translate_to_core_defaults() {
        let remote = Config::default().to_remote_config().unwrap();
        let core = RemoteConfig::default();
        assert_eq!(remote.app_name, core.app_name);
        assert_eq!(remote.search_timeout, core.search_timeout);
        assert_eq!(remote.pairing_timeout, core.pairing_timeout);
        assert_eq!(remote.tls, core.tls);
    }

    #[test]
    fn zero_pairing_timeout_disables_it() {
        let cfg = Config {
            pairing_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(cfg.to_remote_config().unwrap().pairing_timeout, None);
    }

    #[test]
    fn rejects_zero_search_window() {
        let cfg = Config {
            search_timeout_secs: 0,
            ..Config::default()
        };
        assert!(matches!(
            cfg.to_remote_config(),
            Err(ConfigError::Validation { ref field, .. }) if field == "search_timeout_secs"
        ));
    }

    #[test]
    fn file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    app_name = "Den Remote"
                    search_timeout_secs = 4
                    verify_tls = true
                "#,
            )?;
            jail.set_env("TVREMOTE_SEARCH_TIMEOUT_SECS", "7");

            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.app_name, "Den Remote");
            assert_eq!(cfg.search_timeout_secs, 7);
            assert!(cfg.verify_tls);
            assert_eq!(cfg.pairing_timeout_secs, 30);
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let cfg = load_config_from(Path::new("absent.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg, Config::default());
            Ok(())
        });
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            app_name: "Kitchen".into(),
            secure_channel: false,
            ..Config::default()
        };
        save_config_to(&cfg, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("app_name = \"Kitchen\""));
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
