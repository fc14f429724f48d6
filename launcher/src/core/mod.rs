//! Deterministic, pure logic shared by the launcher.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod failure;
pub mod layout;
pub mod manifest;
pub mod state;
pub mod version;
