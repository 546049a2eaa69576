//! Command implementations for the `stagehand` CLI.
//!
//! Each function backs one subcommand and reports failures as
//! [`anyhow::Error`] with context for the operator.

/// Project scaffolding (`stagehand create <name>`).
///
/// Copies the template tree, expands `*.template*` files, then installs
/// packages and initializes git through single tagged process runs.
pub mod create;

/// Toolchain orchestration (`stagehand dev`, `stagehand build`, `stagehand clean`).
pub mod orchestrate;
