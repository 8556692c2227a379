//! Subcommand implementations.

/// Clone a repository and report its history analytics.
pub mod analyze;

/// Result alias shared by every command.
pub type Result<T = ()> = anyhow::Result<T>;
