//! Discovery command handler.

use std::sync::Arc;

use tvremote_core::{
    CoreError, Device, DeviceSnapshot, DiscoveryEngine, DiscoverySignal, RemoteConfig,
};

use crate::cli::{DiscoverArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util::{self, DeviceRow};

pub async fn handle(
    remote: RemoteConfig,
    args: DiscoverArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let remote = util::with_search_window(remote, args.timeout)?;
    let devices = sweep(&remote, global.quiet).await?;

    if devices.is_empty() {
        output::note(
            "No TVs found. Make sure the TV is on and on the same network.",
            global.quiet,
        );
    }

    let out = output::render_list(
        &global.output,
        devices.as_slice(),
        |d| DeviceRow::from(&**d),
        |d| d.id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Run one full sweep and return whatever it found.
pub async fn sweep(remote: &RemoteConfig, quiet: bool) -> Result<DeviceSnapshot, CliError> {
    let engine = DiscoveryEngine::ssdp(remote)?;
    let mut signals = engine.signals();

    let pb = util::spinner(
        &format!("Searching for TVs ({}s)", remote.search_timeout.as_secs()),
        quiet,
    );
    let result = async {
        engine.start_search().await?;
        signals
            .recv()
            .await
            .map_err(|e| CoreError::Internal(format!("discovery signal lost: {e}")))
    }
    .await;
    util::finish_spinner(pb);
    engine.shutdown();

    match result? {
        DiscoverySignal::DevicesFound(devices) => Ok(devices),
        DiscoverySignal::NotFound => Ok(Arc::default()),
        DiscoverySignal::Unavailable { reason } => Err(CliError::DiscoveryUnavailable { reason }),
    }
}

/// Search until a TV matching `selector` shows up or the window closes.
pub async fn find(
    remote: &RemoteConfig,
    selector: &str,
    quiet: bool,
) -> Result<Arc<Device>, CliError> {
    let engine = DiscoveryEngine::ssdp(remote)?;
    let mut signals = engine.signals();
    let mut devices = engine.devices();

    let pb = util::spinner(&format!("Looking for '{selector}'"), quiet);
    let result = async {
        engine.start_search().await?;
        loop {
            tokio::select! {
                snapshot = devices.changed() => {
                    let Some(snapshot) = snapshot else { break };
                    if let Some(found) = snapshot.iter().find(|d| d.matches(selector)) {
                        return Ok(Arc::clone(found));
                    }
                }
                signal = signals.recv() => {
                    if let Ok(DiscoverySignal::Unavailable { reason }) = signal {
                        return Err(CoreError::DiscoveryUnavailable { reason });
                    }
                    break;
                }
            }
        }
        engine
            .devices_snapshot()
            .iter()
            .find(|d| d.matches(selector))
            .cloned()
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: selector.to_owned(),
            })
    }
    .await;
    util::finish_spinner(pb);
    engine.shutdown();

    Ok(result?)
}
