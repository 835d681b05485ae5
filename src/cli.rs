use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "batchforge")]
#[command(author, version, about = "Batch file conversion with extension-provided actions")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one batch in the foreground
    Run {
        /// Extension providing the action
        #[arg(long)]
        extension: String,

        /// Action to run for every entry
        #[arg(long)]
        action: String,

        /// Saved profile of the extension
        #[arg(long)]
        profile: Option<String>,

        /// Inline profile parameter as KEY=VALUE; replaces --profile
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Input directory, walked recursively
        #[arg(long)]
        input: PathBuf,

        /// Output directory mirroring the input tree
        #[arg(long)]
        output: PathBuf,

        /// Extension given to every output file
        #[arg(long)]
        ext: String,

        /// Number of entries run at once (overrides config)
        #[arg(short = 'j', long)]
        parallelism: Option<usize>,
    },

    /// List installed extensions
    Extensions,

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
