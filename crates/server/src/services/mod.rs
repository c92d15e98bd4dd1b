//! Business logic services.

pub mod provision;
