//! Shared helpers for command handlers.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Tabled;

use tvremote_config::{FileDeviceStore, KeyringTokenStore};
use tvremote_core::{
    Device, PersistenceGateway, Registry, RegistryServices, RemoteConfig,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Time the socket gets to flush queued frames after `disconnect`.
const FLUSH_GRACE: Duration = Duration::from_millis(250);

// ── Configuration ───────────────────────────────────────────────────

/// Load config file + env, then apply CLI flag overrides.
pub fn load_config(global: &GlobalOpts) -> Result<tvremote_config::Config, CliError> {
    let mut cfg = tvremote_config::load_config()?;
    if let Some(ref name) = global.app_name {
        cfg.app_name.clone_from(name);
    }
    Ok(cfg)
}

pub fn remote_config(global: &GlobalOpts) -> Result<RemoteConfig, CliError> {
    Ok(load_config(global)?.to_remote_config()?)
}

/// Apply a `--timeout` override to the search window.
pub fn with_search_window(mut remote: RemoteConfig, secs: Option<u64>) -> Result<RemoteConfig, CliError> {
    if let Some(secs) = secs {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        remote.search_timeout = Duration::from_secs(secs);
    }
    Ok(remote)
}

// ── Registry wiring ─────────────────────────────────────────────────

pub fn device_store() -> FileDeviceStore {
    FileDeviceStore::default_location()
}

/// Real connector, on-disk device record, keyring tokens.
pub fn services(remote: &RemoteConfig) -> RegistryServices {
    RegistryServices::websocket(remote, Arc::new(device_store()))
        .with_tokens(Arc::new(KeyringTokenStore::default()))
}

/// Restore the remembered TV the way an app launch would and wait for
/// the pairing outcome.
pub async fn open_saved(remote: RemoteConfig, global: &GlobalOpts) -> Result<Registry, CliError> {
    let saved = device_store()
        .restore_connected_device()?
        .ok_or(CliError::NoSavedDevice)?;

    let pb = spinner(&format!("Connecting to {}", saved.display_name()), global.quiet);
    let registry = Registry::start(remote.clone(), services(&remote)).await;
    let result = registry.wait_settled().await;
    finish_spinner(pb);

    result?;
    Ok(registry)
}

/// Close the session and give queued frames a moment to go out.
pub async fn finish(registry: &Registry) {
    if let Err(e) = registry.disconnect().await {
        tracing::debug!(error = %e, "disconnect after command failed");
    }
    tokio::time::sleep(FLUSH_GRACE).await;
    registry.shutdown();
}

// ── Progress ────────────────────────────────────────────────────────

/// Stderr spinner, hidden in quiet mode.
pub fn spinner(message: &str, quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

pub fn finish_spinner(pb: Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Pairing")]
    pairing: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.display_name(),
            address: d.address.to_string(),
            model: d.vendor.model_name.clone(),
            pairing: if d.supports_token_auth() {
                "token".into()
            } else {
                "prompt".into()
            },
        }
    }
}

/// Multi-line detail view for a single TV.
pub fn device_detail(d: &Device) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    let _ = writeln!(out, "Name:     {}", d.display_name());
    let _ = writeln!(out, "ID:       {}", d.id);
    let _ = writeln!(out, "Address:  {}", d.address);
    if !d.vendor.model_name.is_empty() {
        let _ = writeln!(out, "Model:    {}", d.vendor.model_name);
    }
    if let Some(ref mac) = d.vendor.mac {
        let _ = writeln!(out, "MAC:      {mac}");
    }
    let _ = write!(
        out,
        "Pairing:  {}",
        if d.supports_token_auth() { "token" } else { "prompt" }
    );
    out
}
