//! I/O helpers for launcher commands.

pub mod config;
pub mod environment;
pub mod git;
pub mod interrupt;
pub mod paths;
pub mod permissions;
pub mod process;
pub mod toolchain;
