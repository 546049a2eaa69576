//! # stagehand
//!
//! Scaffolding and build orchestration for TypeScript server/client projects.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stagehand create <name>` | Copy and expand the project template |
//! | `stagehand dev` | Type-checker + bundler in watch mode, auto-restarting server |
//! | `stagehand build` | One-shot type-check and bundle |
//! | `stagehand clean` | Remove previous build output |
//!
//! The interesting part is [`supervisor`]: tagged output relays, per-process
//! exit policies and the orchestrator that sequences the toolchain.

pub mod commands;
pub mod config;
pub mod logging;
pub mod shutdown;
pub mod supervisor;
pub mod template;
pub mod toolchain;
