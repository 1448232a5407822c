//! CLI command implementations.

pub mod common;
pub mod download;
pub mod ignition;
pub mod list;
pub mod output;
