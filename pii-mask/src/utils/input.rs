// pii-mask/src/utils/input.rs
//! Reads the text to mask from an argument, a file or stdin.

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::{debug, info};
use std::io::{self, Read};
use std::path::Path;

pub fn read_input(text: Option<&str>, input_file: Option<&Path>) -> Result<String> {
    if let Some(text) = text {
        debug!("Reading input from the command line.");
        return Ok(text.to_string());
    }
    if let Some(path) = input_file {
        info!("Reading input from file: {}", path.display());
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()));
    }

    if io::stdin().is_terminal() {
        eprintln!("Reading from stdin; finish with Ctrl-D.");
    }
    info!("Reading input from stdin...");
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read from stdin")?;
    Ok(buffer)
}

/// Drops the line terminator a file or a shell pipe leaves at the end.
pub fn trim_trailing_newline(input: &str) -> &str {
    input
        .strip_suffix("\r\n")
        .or_else(|| input.strip_suffix('\n'))
        .unwrap_or(input)
}
