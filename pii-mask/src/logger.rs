// pii-mask/src/logger.rs
//! Logger setup for the CLI.
//!
//! Log lines go to stderr as `[LEVEL target] message` so they never mix with
//! masked output on stdout. `RUST_LOG` is honored unless a level is forced.
//! License: MIT OR APACHE 2.0

use env_logger::{Builder, Env, Target};
use log::LevelFilter;
use std::io::Write;

/// Crates whose level `--debug` raises.
const OWN_CRATES: &[&str] = &["pii_mask", "pii_mask_core"];

/// Level implied by the global flags. `None` leaves `RUST_LOG` in charge.
pub fn level_from_flags(debug: bool, quiet: bool) -> Option<LevelFilter> {
    if quiet {
        Some(LevelFilter::Off)
    } else if debug {
        Some(LevelFilter::Debug)
    } else {
        None
    }
}

pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    match level {
        Some(LevelFilter::Off) => {
            builder.filter_level(LevelFilter::Off);
        }
        Some(level) => {
            for name in OWN_CRATES {
                builder.filter_module(name, level);
            }
        }
        None => {}
    }
    builder
        .target(Target::Stderr)
        .format(|buf, record| writeln!(buf, "[{} {}] {}", record.level(), record.target(), record.args()));

    // A second initialization (e.g. in tests) keeps the first logger.
    let _ = builder.try_init();
}
