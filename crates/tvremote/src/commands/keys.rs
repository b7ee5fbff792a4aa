//! Key and text command handlers.

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tvremote_core::{RemoteConfig, RemoteKey};

use crate::cli::{GlobalOpts, KeyArgs, TextArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Catalogue ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct KeyEntry {
    name: String,
    code: &'static str,
}

#[derive(Tabled)]
struct KeyRow {
    #[tabled(rename = "Key")]
    name: String,
    #[tabled(rename = "Code")]
    code: &'static str,
}

pub fn list(global: &GlobalOpts) -> Result<(), CliError> {
    let entries: Vec<KeyEntry> = RemoteKey::catalogue()
        .map(|k| KeyEntry {
            name: k.to_string(),
            code: k.code(),
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &entries,
        |e| KeyRow {
            name: e.name.clone(),
            code: e.code,
        },
        |e| e.name.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Parse every name before anything is sent.
fn parse_keys(names: &[String]) -> Result<Vec<RemoteKey>, CliError> {
    names
        .iter()
        .map(|name| {
            RemoteKey::from_str(name).map_err(|_| CliError::UnknownKey { key: name.clone() })
        })
        .collect()
}

// ── Senders ─────────────────────────────────────────────────────────

pub async fn send(remote: RemoteConfig, args: KeyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let keys = parse_keys(&args.keys)?;
    let registry = util::open_saved(remote, global).await?;
    let delay = Duration::from_millis(args.delay);

    let mut result = Ok(());
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }
        tracing::info!(%key, "sending key");
        if let Err(e) = registry.send_command(*key).await {
            result = Err(e.into());
            break;
        }
    }

    util::finish(&registry).await;
    result
}

pub async fn text(remote: RemoteConfig, args: TextArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let registry = util::open_saved(remote, global).await?;
    let result = registry.send_text(args.text).await;
    util::finish(&registry).await;
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        let keys = parse_keys(&["volume-up".into(), "OK".into(), "7".into()]);
        assert!(matches!(
            keys.as_deref(),
            Ok([RemoteKey::VolumeUp, RemoteKey::Enter, RemoteKey::Number7])
        ));
    }

    #[test]
    fn rejects_unknown_name() {
        let err = parse_keys(&["up".into(), "warp-speed".into()]);
        assert!(matches!(err, Err(CliError::UnknownKey { ref key }) if key == "warp-speed"));
    }
}
