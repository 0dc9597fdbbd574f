// pii-mask/src/commands/patterns.rs
//! The `patterns` command: compiles the configured registry and lists it.

use anyhow::{Context, Result};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use log::info;
use serde::Serialize;
use std::io::Write;

use pii_mask_core::{MaskingConfig, PatternDescriptor, PatternKind, PatternRegistry};

#[derive(Debug, Serialize)]
pub struct PatternRow {
    pub name: String,
    pub label: String,
    pub kind: &'static str,
    /// The compiled expression, or the configured one for disabled patterns.
    pub expression: String,
    pub digit_boundary: bool,
    pub enabled: bool,
    pub description: Option<String>,
}

impl PatternRow {
    fn new(descriptor: &PatternDescriptor, registry: &PatternRegistry) -> Self {
        let (kind, configured) = match &descriptor.kind {
            PatternKind::Regex { expression } => ("regex", expression.clone()),
            PatternKind::DigitRun { min_len, max_len } => ("digit_run", format!("{}..={} digits", min_len, max_len)),
        };
        let expression = registry
            .get(&descriptor.name)
            .map(|p| p.regex.as_str().to_string())
            .unwrap_or(configured);
        Self {
            name: descriptor.name.clone(),
            label: descriptor.label.clone(),
            kind,
            expression,
            digit_boundary: descriptor.digit_boundary,
            enabled: descriptor.enabled,
            description: descriptor.description.clone(),
        }
    }
}

/// Compiles the registry exactly as the service would, so a zero exit status
/// means the configuration is servable.
pub fn pattern_rows(config: &MaskingConfig) -> Result<Vec<PatternRow>> {
    let registry = PatternRegistry::compile(config.patterns.clone()).context("Pattern registry failed to compile")?;
    registry
        .ensure_mask_token_inert(&config.mask_token)
        .context("Pattern registry rejected the mask token")?;
    info!("Compiled {} pattern(s).", registry.len());

    Ok(config
        .patterns
        .iter()
        .map(|descriptor| PatternRow::new(descriptor, &registry))
        .collect())
}

pub fn run_patterns<W: Write>(config: &MaskingConfig, json: bool, writer: &mut W) -> Result<()> {
    let rows = pattern_rows(config)?;

    if json {
        let encoded = serde_json::to_string_pretty(&rows).context("Failed to encode patterns as JSON")?;
        writeln!(writer, "{}", encoded)?;
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Name", "Label", "Kind", "Expression", "Digit boundary", "Enabled"]);
    for row in &rows {
        table.add_row(vec![
            row.name.clone(),
            row.label.clone(),
            row.kind.to_string(),
            row.expression.clone(),
            yes_no(row.digit_boundary).to_string(),
            yes_no(row.enabled).to_string(),
        ]);
    }
    writeln!(writer, "{table}")?;
    writeln!(writer, "Mask token: {}", config.mask_token)?;
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_follow_registration_order() {
        let config = MaskingConfig::load_default().unwrap();
        let rows = pattern_rows(&config).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["email", "phone_number", "credit_card", "mynumber", "postal_code"]);
        assert_eq!(rows[3].kind, "digit_run");
        assert_eq!(rows[3].expression, "[0-9]{12,12}");
    }

    #[test]
    fn test_disabled_patterns_are_listed_with_their_configured_expression() {
        let mut config = MaskingConfig::load_default().unwrap();
        config.patterns[4].enabled = false;
        let rows = pattern_rows(&config).unwrap();
        assert!(!rows[4].enabled);
        assert_eq!(rows[4].expression, "〒?[0-9]{3}-[0-9]{4}");
    }

    #[test]
    fn test_invalid_pattern_fails_the_listing() {
        let mut config = MaskingConfig::load_default().unwrap();
        config
            .patterns
            .push(PatternDescriptor::regex("broken", "BROKEN", "(?<=a)b"));
        let err = pattern_rows(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("broken"));
    }
}
