// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # hexzip-observability
//!
//! Logging infrastructure shared by the hexzip crates.
//!
//! Provides consistent `tracing` setup with per-crate debug flag support.
//!
//! ## Features
//! - `file-logging` (default): JSON log files in timestamped run folders with retention

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known hexzip crate names (also used as tracing targets) for debug flags
pub const KNOWN_CRATES: &[&str] = &["hexzip-builder", "hexzip-config", "hexzip-cli"];
