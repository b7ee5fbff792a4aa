//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::Input;

use tvremote_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = util::load_config(global)?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_default(),
                |c| c.app_name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config::config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut cfg = Config::default();
            if let Some(ref name) = global.app_name {
                cfg.app_name.clone_from(name);
            } else if std::io::stdin().is_terminal() {
                cfg.app_name = Input::new()
                    .with_prompt("Name shown on the TV")
                    .default(cfg.app_name)
                    .interact_text()
                    .map_err(prompt_err)?;
            }
            cfg.to_remote_config()?;

            config::save_config(&cfg)?;
            output::note(&format!("Wrote {}", path.display()), global.quiet);
            Ok(())
        }
    }
}
