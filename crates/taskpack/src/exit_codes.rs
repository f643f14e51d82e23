//! Exit codes for the CLI

use taskpack_core::TaskpackError;

/// Success
#[allow(dead_code)]
pub const SUCCESS: u8 = 0;

/// General error
pub const ERROR: u8 = 1;

/// Configuration error
pub const CONFIG_ERROR: u8 = 2;

/// Missing, under-versioned or failing external tool
pub const TOOL_ERROR: u8 = 3;

/// Missing or invalid task file
pub const TASK_ERROR: u8 = 4;

/// Nothing matched (tasks, test specs, package files)
pub const NOT_FOUND: u8 = 5;

/// Invalid or missing command-line input
pub const INPUT_ERROR: u8 = 6;

/// Exit code for an error returned by a command
pub fn for_error(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<TaskpackError>() {
        Some(TaskpackError::Config(_)) => CONFIG_ERROR,
        Some(TaskpackError::Tool(_)) => TOOL_ERROR,
        Some(TaskpackError::Task(_)) => TASK_ERROR,
        Some(TaskpackError::NotFound(_)) => NOT_FOUND,
        Some(TaskpackError::Input(_)) => INPUT_ERROR,
        _ => ERROR,
    }
}
