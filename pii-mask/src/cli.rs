// pii-mask/src/cli.rs
//! Command-line interface definition for the `pii-mask` binary.
//! License: MIT OR APACHE 2.0

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "pii-mask",
    version = env!("CARGO_PKG_VERSION"),
    about = "Mask personally identifiable information in short Japanese text",
    long_about = "pii-mask detects personal information in short Japanese text fragments (names, phone numbers, e-mail addresses, card and My Number numbers, postal codes), replaces every occurrence with a mask token and reports a heuristic risk score.",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Path to a YAML configuration file merged over the built-in defaults.
    #[arg(
        long = "config",
        value_name = "FILE",
        env = "PII_MASK_CONFIG",
        global = true,
        help = "Path to a YAML configuration file merged over the built-in defaults."
    )]
    pub config: Option<PathBuf>,

    /// Enable debug logging for the pii-mask crates.
    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    /// Disable all logging.
    #[arg(long, short = 'q', global = true, conflicts_with = "debug", help = "Suppress all log output.")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Masks text given as an argument, read from a file or from stdin.
    #[command(about = "Mask PII in text from an argument, a file or stdin.")]
    Mask(MaskCommand),

    /// Compiles the configured pattern registry and lists its patterns.
    #[command(about = "Compile the configured patterns and list them.")]
    Patterns(PatternsCommand),
}

/// Arguments for the `mask` command.
#[derive(Args, Debug)]
pub struct MaskCommand {
    /// Text to mask. Reads the input file or stdin when omitted.
    #[arg(value_name = "TEXT", conflicts_with = "input_file")]
    pub text: Option<String>,

    #[arg(long, short = 'i', value_name = "FILE", help = "Read input from a file instead of stdin.")]
    pub input_file: Option<PathBuf>,

    #[arg(long, help = "Print the full response (masked text, entities, risk score) as JSON.")]
    pub json: bool,

    /// Treat every line as a separate request.
    #[arg(long, help = "Mask each input line independently.")]
    pub lines: bool,

    #[arg(long, help = "Log a statistics summary for every computed result.")]
    pub stats: bool,
}

/// Arguments for the `patterns` command.
#[derive(Args, Debug)]
pub struct PatternsCommand {
    #[arg(long, help = "Print the pattern list as JSON.")]
    pub json: bool,
}
