//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Featherstore - declarative feature tables, built and validated in dependency order
#[derive(Parser, Debug)]
#[command(name = "fstore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override target (database connection); falls back to FSTORE_TARGET
    #[arg(short, long, global = true)]
    pub target: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build feature tables in dependency order
    Build(BuildArgs),

    /// Print the SQL each feature table compiles to
    Compile(CompileArgs),

    /// List feature tables and their upstream tables
    Ls(LsArgs),

    /// Report staleness of every feature table from the registry
    Freshness(FreshnessArgs),
}

/// Output formats for commands producing a report
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Build only this table and its upstream tables
    #[arg(long)]
    pub table: Option<String>,

    /// First table of the build order to include
    #[arg(long)]
    pub start: Option<String>,

    /// Last table of the build order to include
    #[arg(long)]
    pub end: Option<String>,

    /// Overwrite every table regardless of its write mode
    #[arg(long)]
    pub full_refresh: bool,

    /// Write results without running constraints
    #[arg(long)]
    pub skip_quality: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the compile command
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Compile only this table and its upstream tables
    #[arg(long)]
    pub table: Option<String>,
}

/// Arguments for the ls command
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the freshness command
#[derive(Args, Debug)]
pub struct FreshnessArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
