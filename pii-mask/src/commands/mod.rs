// pii-mask/src/commands/mod.rs
//! Subcommand implementations and the helpers they share.

pub mod mask;
pub mod patterns;

use anyhow::Error;
use pii_mask_core::{MaskError, ValidationError};

/// Exit status for input the caller can correct.
pub const EXIT_VALIDATION: u8 = 2;
/// Exit status for every other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Validation failures anywhere in the error chain exit with 2.
pub fn exit_code_for(err: &Error) -> u8 {
    let is_validation = err.chain().any(|cause| {
        cause.downcast_ref::<ValidationError>().is_some()
            || cause
                .downcast_ref::<MaskError>()
                .is_some_and(MaskError::is_client_error)
    });
    if is_validation { EXIT_VALIDATION } else { EXIT_FAILURE }
}
