// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `hexzip.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HexzipConfig {
    pub build: BuildConfig,
    pub scoring: ScoringConfig,
    pub orphans: OrphanConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

/// Batch pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Geometries rasterized and committed per batch
    pub batch_size: usize,
    /// Rasterization worker threads
    pub workers: usize,
    /// Cap on duplicate/orphan fix-point iterations
    pub max_repair_iterations: usize,
    /// Log a with/without-cells progress summary every N batches (0 = never)
    pub progress_every_batches: usize,
    /// Batches kept in the rolling per-geometry average used for the ETA
    pub eta_window_batches: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            workers: 4,
            max_repair_iterations: 10,
            progress_every_batches: 5,
            eta_window_batches: 10,
        }
    }
}

/// Duplicate-claim scoring weights
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub area_weight: f64,
    pub population_weight: f64,
    pub proximity_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            area_weight: 0.3,
            population_weight: 0.4,
            proximity_weight: 0.3,
        }
    }
}

/// Orphan repair policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrphanConfig {
    /// Cells transferred to each orphan
    pub top_k: usize,
    /// Search radii in km, tried in order until a neighbour is found
    pub radius_schedule_km: Vec<f64>,
}

impl Default for OrphanConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            radius_schedule_km: vec![5.0, 10.0, 20.0],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Write JSON log files in addition to the console
    pub file_logging: bool,
    pub log_dir: PathBuf,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

/// Export destination
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    /// Pretty-print exported JSON
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data"),
            pretty: true,
        }
    }
}
