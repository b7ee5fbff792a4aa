//! Pairing and remembered-TV command handlers.

use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;
use tvremote_config::KeyringTokenStore;
use tvremote_core::{
    ConnectionState, Device, FailureReason, PairingTokenStore, PersistenceGateway, Registry,
    RemoteConfig, probe_device,
};

use crate::cli::{ConnectArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{discover, util};

// ── connect ─────────────────────────────────────────────────────────

pub async fn connect(
    remote: RemoteConfig,
    args: ConnectArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let device = if let Ok(address) = args.target.parse::<IpAddr>() {
        Arc::new(probe_device(&remote, address).await?)
    } else {
        let remote = util::with_search_window(remote.clone(), args.timeout)?;
        discover::find(&remote, &args.target, global.quiet).await?
    };

    // Fresh registry: pairing a new TV must not first reconnect the old one.
    let registry = Registry::new(remote.clone(), util::services(&remote));
    registry.connect(Arc::clone(&device)).await?;

    let pb = util::spinner(
        &format!("Waiting for approval on {}", device.display_name()),
        global.quiet,
    );
    let result = registry.wait_settled().await;
    util::finish_spinner(pb);
    let connected = result?;

    let out = output::render_single(
        &global.output,
        &*connected,
        |d| format!("Connected\n{}", util::device_detail(d)),
        |d| d.id.to_string(),
    );
    output::print_output(&out, global.quiet);

    util::finish(&registry).await;
    Ok(())
}

// ── status ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusView {
    device: Option<Device>,
    state: String,
    connected: bool,
}

fn describe(state: &ConnectionState) -> String {
    match state {
        ConnectionState::Disconnected => "disconnected".into(),
        ConnectionState::Connecting { .. } => "connecting".into(),
        ConnectionState::AuthPending { .. } => "waiting for approval".into(),
        ConnectionState::Connected { .. } => "connected".into(),
        ConnectionState::Failed { reason, .. } => match reason {
            FailureReason::AuthDenied => "pairing rejected".into(),
            FailureReason::AuthTimedOut => "pairing timed out".into(),
            FailureReason::Unreachable(why) => format!("unreachable ({why})"),
        },
    }
}

pub async fn status(remote: RemoteConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let saved = util::device_store().restore_connected_device()?;

    let view = match saved {
        None => StatusView {
            device: None,
            state: "not paired".into(),
            connected: false,
        },
        Some(device) => {
            let pb = util::spinner(
                &format!("Connecting to {}", device.display_name()),
                global.quiet,
            );
            let registry = Registry::start(remote.clone(), util::services(&remote)).await;
            // Failures are reported through the state, not as an error.
            let _ = registry.wait_settled().await;
            util::finish_spinner(pb);

            let state = registry.current_state();
            util::finish(&registry).await;
            StatusView {
                device: Some(device),
                connected: state.is_connected(),
                state: describe(&state),
            }
        }
    };

    let out = output::render_single(
        &global.output,
        &view,
        |v| match v.device {
            Some(ref d) => format!(
                "{}\nState:    {}",
                util::device_detail(d),
                output::paint_state(&v.state, v.connected)
            ),
            None => "No TV paired. Run: tvremote connect <id|name|ip>".into(),
        },
        |v| v.state.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── forget ──────────────────────────────────────────────────────────

pub fn forget(global: &GlobalOpts) -> Result<(), CliError> {
    let store = util::device_store();
    let Some(device) = store.restore_connected_device()? else {
        output::note("No TV paired; nothing to forget.", global.quiet);
        return Ok(());
    };

    store.clear_connected_device()?;
    if let Err(e) = KeyringTokenStore::default().remove(&device.id) {
        tracing::warn!(error = %e, "could not remove pairing token");
    }
    output::note(
        &format!("Forgot {} ({})", device.display_name(), device.id),
        global.quiet,
    );
    Ok(())
}
