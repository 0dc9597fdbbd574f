// pii-mask/src/lib.rs
//! # pii-mask CLI
//!
//! Command-line front end for `pii-mask-core`: resolves the configuration,
//! builds a `MaskingService` and runs one subcommand against it.
//!
//! License: MIT OR APACHE 2.0

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;
pub mod utils;
