//! Clap derive structures for the `tvremote` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tvremote -- remote control for Samsung Smart TVs
#[derive(Debug, Parser)]
#[command(
    name = "tvremote",
    version,
    about = "Control Samsung Smart TVs on your local network",
    long_about = "Discover Samsung Smart TVs on the local network, pair with one, and\n\
        send it remote-control keys and text.\n\n\
        The last paired TV is remembered and reconnected automatically.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TVREMOTE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Name shown on the TV's pairing prompt (overrides config)
    #[arg(long, global = true)]
    pub app_name: Option<String>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search the local network for TVs
    #[command(alias = "scan")]
    Discover(DiscoverArgs),

    /// Pair with a TV and remember it
    Connect(ConnectArgs),

    /// Reconnect to the remembered TV and report its state
    Status,

    /// Send one or more remote keys
    #[command(alias = "k")]
    Key(KeyArgs),

    /// Type text into the TV's focused input field
    Text(TextArgs),

    /// List every key name `key` accepts
    Keys,

    /// Forget the remembered TV and its pairing token
    Forget,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Search window in seconds (overrides config)
    #[arg(long, short = 't')]
    pub timeout: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ConnectArgs {
    /// TV id, name, or IP address
    pub target: String,

    /// Search window in seconds when resolving by id or name
    #[arg(long, short = 't')]
    pub timeout: Option<u64>,
}

#[derive(Debug, Args)]
pub struct KeyArgs {
    /// Key names, sent in order (see `tvremote keys`)
    #[arg(required = true, num_args = 1..)]
    pub keys: Vec<String>,

    /// Pause between keys in milliseconds
    #[arg(long, short = 'd', default_value = "300")]
    pub delay: u64,
}

#[derive(Debug, Args)]
pub struct TextArgs {
    /// Text to send
    pub text: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
