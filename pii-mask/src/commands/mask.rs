// pii-mask/src/commands/mask.rs
//! The `mask` command.

use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Write;

use pii_mask_core::{MaskResponse, MaskedResult, MaskingService};

use crate::utils::input::trim_trailing_newline;

pub struct MaskOptions {
    pub input: String,
    pub json: bool,
    pub lines: bool,
}

pub async fn run_mask<W: Write>(service: &MaskingService, opts: &MaskOptions, writer: &mut W) -> Result<()> {
    info!("Starting mask operation.");

    if opts.lines {
        mask_lines(service, opts, writer).await?;
    } else {
        let text = trim_trailing_newline(&opts.input);
        let result = service.mask(text).await?;
        write_result(writer, result, opts.json, true)?;
    }
    writer.flush().context("Failed to flush output")?;

    if let Some(stats) = service.cache_stats() {
        debug!("Cache stats: {:?}", stats);
    }
    info!("Mask operation completed.");
    Ok(())
}

/// Masks every line as its own request. Blank lines are passed through in
/// plain output and skipped in JSON output.
async fn mask_lines<W: Write>(service: &MaskingService, opts: &MaskOptions, writer: &mut W) -> Result<()> {
    let mut masked = 0usize;
    for (idx, line) in opts.input.lines().enumerate() {
        if line.trim().is_empty() {
            if !opts.json {
                writeln!(writer)?;
            }
            continue;
        }
        let result = service
            .mask(line)
            .await
            .with_context(|| format!("Failed to mask line {}", idx + 1))?;
        write_result(writer, result, opts.json, false)?;
        masked += 1;
    }
    debug!("Masked {} line(s).", masked);
    Ok(())
}

fn write_result<W: Write>(writer: &mut W, result: MaskedResult, json: bool, pretty: bool) -> Result<()> {
    if !json {
        writeln!(writer, "{}", result.masked_text)?;
        return Ok(());
    }
    let response = MaskResponse::from(result);
    let encoded = if pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .context("Failed to encode response as JSON")?;
    writeln!(writer, "{}", encoded)?;
    Ok(())
}
