//! Exit codes for the CLI

use lockstep_core::error::LockstepError;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Git error
pub const GIT_ERROR: i32 = 3;

/// Version or dependency conflict
pub const VERSION_ERROR: i32 = 4;

/// Workflow precondition not met
pub const VALIDATION_ERROR: i32 = 5;

/// Registry lookup failed
pub const REGISTRY_ERROR: i32 = 6;

/// Exit code for an error returned by a command
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<LockstepError>() {
        Some(LockstepError::Config(_) | LockstepError::Toml(_)) => CONFIG_ERROR,
        Some(LockstepError::Git(_)) => GIT_ERROR,
        Some(LockstepError::Version(_)) => VERSION_ERROR,
        Some(LockstepError::Workflow(_)) => VALIDATION_ERROR,
        Some(LockstepError::Registry(_)) => REGISTRY_ERROR,
        _ => ERROR,
    }
}
