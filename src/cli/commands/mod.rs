//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod batch;
pub mod extract;
pub mod init;
pub mod validate;

use crate::domain::FlatError;

/// Exit code for an error that ended a command
pub(crate) fn exit_code_for(error: &FlatError) -> i32 {
    match error {
        FlatError::Config(_) => 2,
        _ => 5,
    }
}
