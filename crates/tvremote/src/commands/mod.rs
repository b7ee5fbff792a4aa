//! Command dispatch: bridges CLI args -> core registry/engine -> output formatting.

pub mod config_cmd;
pub mod discover;
pub mod keys;
pub mod session;
pub mod util;

use tvremote_core::RemoteConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a network-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    remote: RemoteConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Discover(args) => discover::handle(remote, args, global).await,
        Command::Connect(args) => session::connect(remote, args, global).await,
        Command::Status => session::status(remote, global).await,
        Command::Key(args) => keys::send(remote, args, global).await,
        Command::Text(args) => keys::text(remote, args, global).await,
        Command::Keys
        | Command::Forget
        | Command::Config(_)
        | Command::Completions(_) => Err(CliError::Internal {
            message: "local command reached network dispatch".into(),
        }),
    }
}
