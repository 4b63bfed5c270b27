// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # hexzip - HRR / HSA / ZCTA / H3 hierarchy builder
//!
//! Builds a four-level spatial hierarchy for US healthcare geography: Hospital
//! Referral Regions contain Health Service Areas, which contain ZIP Code
//! Tabulation Areas, which are tiled by resolution-7 H3 cells.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! hexzip = "0.1"  # Default: parallel rasterization
//! ```
//!
//! ## Feature Flags
//! - **`parallel`** (default): rasterize batches on a rayon thread pool
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hexzip::prelude::*;
//! use std::path::Path;
//!
//! let loaded = load_geometries(Path::new("zcta.geojson"))?;
//! let input = BuildInput {
//!     geometries: loaded.geometries,
//!     zip_crosswalk: load_zip_crosswalk(Path::new("zip_zcta.json"))?,
//!     regions: load_regions(Path::new("regions.json"))?,
//!     rejected: loaded.rejected,
//! };
//!
//! let mut index = HierarchyIndex::new();
//! let audit = BuildPipeline::new(BuildOptions::default())?.run(&mut index, input)?;
//! assert!(audit.is_healthy());
//!
//! let path = index.resolve_zip(&ZipCode::from("10001"));
//! # Ok::<(), BuildError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! hexzip
//! ├── builder        - rasterizer, hierarchy index, duplicate / orphan repair, pipeline
//! ├── config         - TOML configuration with environment and CLI overrides
//! └── observability  - logging initialisation and per-crate debug flags
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use hexzip_builder as builder;
pub use hexzip_config as config;
pub use hexzip_observability as observability;

/// Convenience prelude
pub mod prelude {
    pub use crate::builder::{
        load_geometries, load_index, load_regions, load_zip_crosswalk, save_index, BuildAudit,
        BuildError, BuildInput, BuildOptions, BuildPipeline, BuildResult, CellIndex,
        ExportBundle, HierarchyIndex, HierarchyPath, HrrId, HsaId, LonLat, ZctaId, ZipCode,
    };
    pub use crate::config::{load_config_or_default, validate_config, HexzipConfig};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let index = HierarchyIndex::new();
        assert_eq!(index.zcta_count(), 0);
        assert!(BuildOptions::default().validate().is_ok());
    }
}
