//! Environment bootstrap and handoff for a Python web app.
//!
//! `launcher` brings an isolated Python environment from "unknown" to
//! "ready" and hands control to the app's development server. Re-running it
//! is cheap: an existing environment is reused, never recreated.
//!
//! - **[`core`]**: Pure, deterministic logic (state machine, failure
//!   taxonomy, manifest and version parsing, environment layout).
//! - **[`io`]**: Side-effecting operations (configuration, subprocesses, the
//!   Python toolchain, git). The [`io::toolchain::Toolchain`] trait is the
//!   seam tests replace.
//!
//! Orchestration modules ([`bootstrap`], [`setup`], [`sync`]) coordinate
//! core logic with I/O to implement CLI commands.
//!
//! Running two launchers against the same environment directory at the same
//! time is unsupported.

pub mod bootstrap;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod setup;
pub mod sync;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
