//! CLI command implementations.

pub mod cleanup;
