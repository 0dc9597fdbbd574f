// pii-mask/src/utils/config.rs
//! Resolves the effective configuration for a CLI run.
//!
//! Order: embedded defaults, then the user file (`--config`, `PII_MASK_CONFIG`
//! or `<config_dir>/pii-mask/config.yaml`), then `PII_MASK_*` environment
//! overrides. The result is validated before any service is built.
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use log::{debug, info};
use pii_mask_core::{merge_config, MaskingConfig};
use std::path::{Path, PathBuf};

/// `<config_dir>/pii-mask/config.yaml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pii-mask").join("config.yaml"))
}

pub fn load_config(explicit: Option<&Path>) -> Result<MaskingConfig> {
    let defaults = MaskingConfig::load_default().context("Failed to load built-in configuration")?;

    let user_path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|path| path.is_file()),
    };
    let user = match user_path {
        Some(path) => {
            info!("Using configuration file {}.", path.display());
            Some(MaskingConfig::load_from_file(&path)?)
        }
        None => {
            debug!("No user configuration found; using built-in defaults.");
            None
        }
    };

    let mut config = merge_config(defaults, user);
    config.apply_env_overrides();
    config.validate().context("Invalid configuration after environment overrides")?;
    Ok(config)
}
