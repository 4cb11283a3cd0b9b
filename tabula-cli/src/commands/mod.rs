//! CLI command implementations.

pub mod plan;
pub mod validate;
pub mod version;
