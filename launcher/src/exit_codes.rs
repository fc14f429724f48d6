//! Stable exit codes for launcher CLI commands.

/// Handoff succeeded and the target exited normally, or a helper command succeeded.
pub const OK: i32 = 0;
/// Invalid configuration or usage, or a failed helper command (e.g. branch sync).
pub const INVALID: i32 = 1;
/// No usable Python interpreter was found.
pub const MISSING_DEPENDENCY: i32 = 2;
/// The isolated environment could not be created.
pub const ENV_CREATION: i32 = 3;
/// The isolated environment could not be activated.
pub const ACTIVATION: i32 = 4;
/// Installing the dependency manifest failed.
pub const INSTALL: i32 = 5;
/// The target application could not be started.
pub const LAUNCH: i32 = 6;
/// The target application started but exited with a non-zero status.
pub const APP_FAILED: i32 = 7;
/// The operator interrupted the running target (Ctrl-C).
pub const INTERRUPTED: i32 = 130;
