//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Trellis - component markup loading, parsing and caching
///
/// Parses HTML component templates, merges inherited markup and keeps the
/// result cached until the template files change.
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TRELLIS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .trellis.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a single markup file and print its elements
    Parse(ParseArgs),

    /// Show the markup resolved for a component class
    Inspect(InspectArgs),

    /// Warm or inspect the markup cache
    Cache(CacheArgs),

    /// Load markup and invalidate it as template files change
    Watch(WatchArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options that select the container asking for markup
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ContainerArgs {
    /// Style, e.g. `dark`
    #[arg(long)]
    pub style: Option<String>,

    /// Locale, e.g. `de_CH`
    #[arg(long)]
    pub locale: Option<String>,

    /// Variation
    #[arg(long)]
    pub variation: Option<String>,
}

/// Arguments for the parse command
#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Markup file to parse
    pub file: PathBuf,

    /// Treat the markup as the template of this component class
    #[arg(long)]
    pub class: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Fully qualified component class name
    pub class: String,

    #[command(flatten)]
    pub container: ContainerArgs,

    /// Also resolve automatic links
    #[arg(long)]
    pub links: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Load the markup of every configured component
    Warm {
        #[command(flatten)]
        container: ContainerArgs,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Warm the cache, then drop one entry and report what was invalidated
    Stats {
        /// Cache key to remove after warming
        #[arg(long)]
        remove: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Component classes to load (defaults to all configured components)
    pub classes: Vec<String>,

    /// Poll interval in milliseconds (default: from config)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Check once and exit instead of polling until interrupted
    #[arg(long)]
    pub once: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.poll_interval_ms)
        key: String,
        /// Value to set
        value: String,
        /// Write to project-local .trellis.toml instead of global config
        #[arg(long)]
        local: bool,
    },
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
