//! CLI command implementations.

pub mod backends;
pub mod common;
pub mod result;
pub mod status;
pub mod submit;
pub mod version;
pub mod wait;
