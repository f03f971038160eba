//! Stable exit codes for autolabel CLI commands.

/// Command succeeded (labels reconciled, plan printed, config valid).
pub const OK: i32 = 0;
/// Command failed: invalid config, remote call error, or git error.
pub const FAILURE: i32 = 1;
/// Nothing to do: no config file, or an event the labeler does not act on.
///
/// GitHub Actions renders this code as a neutral check.
pub const NEUTRAL: i32 = 78;
