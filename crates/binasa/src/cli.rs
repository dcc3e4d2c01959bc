//! Clap derive structures for the `binasa` CLI.
//!
//! Kept free of crate-internal imports: `build.rs` includes this file
//! directly to render man pages.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// binasa -- live dashboard and pump control for BinasaMan controllers
#[derive(Debug, Parser)]
#[command(
    name = "binasa",
    version,
    about = "Monitor and control a BinasaMan pump controller",
    long_about = "Watch water level, foam and float sensors of a BinasaMan pump controller\n\
        and switch its pump from the command line.\n\n\
        Live updates arrive over the device's websocket push stream; when that\n\
        stream is down the CLI falls back to polling the HTTP status endpoint.",
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
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalOpts {
    /// Device profile to use
    #[arg(long, short = 'p', env = "BINASA_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device base URL, e.g. http://192.168.4.1 (overrides profile)
    #[arg(long, short = 'd', env = "BINASA_DEVICE", global = true)]
    pub device: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BINASA_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "BINASA_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "BINASA_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Disable the websocket push stream and poll only
    #[arg(long, global = true)]
    pub no_push: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the current device status
    #[command(alias = "st")]
    Status,

    /// Follow live status updates until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Control the pump
    Pump(PumpArgs),

    /// Show the daily water and foam history
    History(HistoryArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit after this many status updates
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ── Pump ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PumpArgs {
    #[command(subcommand)]
    pub command: PumpCommand,
}

#[derive(Debug, Subcommand)]
pub enum PumpCommand {
    /// Switch the pump to the opposite of its current state
    Toggle {
        /// Seconds to wait for the device to confirm the new state
        #[arg(long, default_value = "10")]
        wait: u64,

        /// Return as soon as the device accepts the command
        #[arg(long, conflicts_with = "wait")]
        no_wait: bool,
    },
}

// ── History ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Day to show, as YYYY-MM-DD (defaults to today)
    #[arg(long)]
    pub date: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile
    Init {
        /// Device base URL (prompted for when omitted)
        #[arg(long)]
        url: Option<String>,

        /// Make this profile the default
        #[arg(long)]
        set_default: bool,
    },

    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
