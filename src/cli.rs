use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "ebenv")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Inspect, update and watch application environments", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Gateway endpoint (overrides gateway.endpoint)
    #[arg(long, env = "EBENV_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Bearer token for the gateway (overrides gateway.token)
    #[arg(long, env = "EBENV_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show an environment's identity, status, URL and variables
    Info(InfoArgs),

    /// Change an environment and optionally wait for the update to finish
    Update(UpdateArgs),

    /// List an environment's configuration variables
    Vars(TargetArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Target Selection
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Configured target name
    #[arg(required_unless_present = "application")]
    pub target: Option<String>,

    /// Application name (instead of a configured target)
    #[arg(
        long = "app",
        requires = "environment",
        conflicts_with = "target"
    )]
    pub application: Option<String>,

    /// Environment name (instead of a configured target)
    #[arg(long = "env", requires = "application")]
    pub environment: Option<String>,
}

// ============================================================================
// Info
// ============================================================================

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Update
// ============================================================================

#[derive(Args)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Application version to deploy
    #[arg(long)]
    pub version_label: Option<String>,

    /// New environment description
    #[arg(long)]
    pub description: Option<String>,

    /// Platform (solution stack) to switch to
    #[arg(long)]
    pub platform: Option<String>,

    /// Saved configuration template to apply
    #[arg(long)]
    pub template: Option<String>,

    /// Set a variable (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Remove a variable (repeatable)
    #[arg(long = "unset", value_name = "KEY", value_parser = parse_key)]
    pub unset: Vec<String>,

    /// Wait for the update to complete
    #[arg(short, long)]
    pub wait: bool,

    /// Seconds to wait before giving up (implies --wait)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Show the planned update without sending it
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Create a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

// ============================================================================
// Value Parsers
// ============================================================================

/// Parse a `KEY=VALUE` assignment. The value may be empty or contain `=`.
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = parse_key(key)?;
    Ok((key, value.to_string()))
}

/// Parse a variable name.
pub fn parse_key(s: &str) -> Result<String, String> {
    let key = s.trim();
    if key.is_empty() {
        return Err("variable name cannot be empty".to_string());
    }
    if key.chars().any(char::is_whitespace) {
        return Err(format!("variable name cannot contain whitespace: '{key}'"));
    }
    Ok(key.to_string())
}
