// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Build audit record
//!
//! Written after every build, successful or not, as the build's health signal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{BuildResult, ZctaId};

/// An input item that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    /// ZCTA id, ZIP or feature position identifying the item
    pub item: String,
    pub reason: String,
}

impl SkippedItem {
    pub fn new(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildAudit {
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub succeeded: bool,
    #[serde(default)]
    pub failure: Option<String>,

    pub geometries_total: usize,
    pub geometries_processed: usize,
    pub geometries_skipped: Vec<SkippedItem>,
    /// Geometries rasterized to an empty set for a reportable reason
    #[serde(default)]
    pub geometry_warnings: Vec<SkippedItem>,
    pub batches: usize,
    /// Raw claims produced by rasterization (before repair)
    pub cells_claimed: usize,
    /// Cells with an owner after repair
    pub cells_assigned: usize,

    pub zip_rows: usize,
    /// ZCTAs given a synthetic 1:1 ZIP row
    pub fallback_zips: usize,
    pub regions_skipped: Vec<SkippedItem>,
    pub zips_skipped: Vec<SkippedItem>,

    pub duplicates_found: usize,
    pub duplicates_fixed: usize,
    pub orphans_found: usize,
    pub orphans_fixed: usize,
    pub repair_iterations: usize,
    /// Orphans with no neighbour at any search radius
    pub unresolved_zctas: Vec<ZctaId>,
    /// ZCTAs missing from the region table
    #[serde(default)]
    pub unmapped_zctas: Vec<ZctaId>,

    pub final_violations: usize,
    pub duration_ms: u64,
}

impl BuildAudit {
    pub fn new(geometries_total: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            succeeded: false,
            failure: None,
            geometries_total,
            geometries_processed: 0,
            geometries_skipped: Vec::new(),
            geometry_warnings: Vec::new(),
            batches: 0,
            cells_claimed: 0,
            cells_assigned: 0,
            zip_rows: 0,
            fallback_zips: 0,
            regions_skipped: Vec::new(),
            zips_skipped: Vec::new(),
            duplicates_found: 0,
            duplicates_fixed: 0,
            orphans_found: 0,
            orphans_fixed: 0,
            repair_iterations: 0,
            unresolved_zctas: Vec::new(),
            unmapped_zctas: Vec::new(),
            final_violations: 0,
            duration_ms: 0,
        }
    }

    pub fn finish(&mut self, succeeded: bool, failure: Option<String>, duration_ms: u64) {
        self.finished_at = Some(Utc::now());
        self.succeeded = succeeded;
        self.failure = failure;
        self.duration_ms = duration_ms;
    }

    /// Succeeded with a clean final validation
    pub fn is_healthy(&self) -> bool {
        self.succeeded && self.final_violations == 0
    }

    pub fn write_json(&self, path: &Path) -> BuildResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> BuildResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_requires_success_and_clean_validation() {
        let mut audit = BuildAudit::new(3);
        assert!(!audit.is_healthy());
        audit.finish(true, None, 12);
        assert!(audit.is_healthy());
        audit.final_violations = 1;
        assert!(!audit.is_healthy());
    }

    #[test]
    fn test_audit_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audit.json");
        let mut audit = BuildAudit::new(2);
        audit.geometries_skipped.push(SkippedItem::new("99999", "bad ring"));
        audit.finish(false, Some("boom".into()), 5);

        audit.write_json(&path).unwrap();
        assert_eq!(BuildAudit::read_json(&path).unwrap(), audit);
    }
}
