//! Subcommand implementations.

pub mod build;
pub mod clear;
pub mod dump;
pub mod get;
pub mod query;
pub mod status;
