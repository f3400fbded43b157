//! CLI argument definitions.
//!
//! All Clap derive structs for `wordspy` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Realtime room and game-state server for the `WordSpy` party game.
#[derive(Parser, Debug)]
#[command(name = "wordspy", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "WORDSPY_COLOR")]
    pub color: ColorChoice,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the game server.
    Serve(ServeArgs),

    /// Validate a configuration file without starting the server.
    Check(CheckArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Serve
// ============================================================================

/// Arguments for `serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "WORDSPY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bind address override, e.g. `0.0.0.0:8080`.
    #[arg(long, env = "WORDSPY_BIND")]
    pub bind: Option<String>,

    /// Prometheus exporter port override.
    #[arg(long, env = "WORDSPY_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Log output format.
    #[arg(long, default_value = "human", env = "WORDSPY_LOG_FORMAT")]
    pub log_format: LogFormatChoice,
}

/// Arguments for `check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to YAML configuration file.
    #[arg(short, long)]
    pub config: PathBuf,
}

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {}

// ============================================================================
// Value enums
// ============================================================================

/// ANSI color control for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Color when stderr is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}

/// Log output format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatChoice {
    /// Human-readable output.
    #[default]
    Human,
    /// Newline-delimited JSON.
    Json,
}

impl From<LogFormatChoice> for crate::observability::LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Human => Self::Human,
            LogFormatChoice::Json => Self::Json,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
