// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# hexzip-builder

Builds the HRR ⊃ HSA ⊃ ZCTA ⊃ H3 cell hierarchy:
- Rasterization of ZCTA boundaries into resolution-7 H3 cells
- Hierarchy index with bidirectional cell ownership and consistency checks
- Duplicate resolution (area / population / proximity scoring)
- Orphan resolution (neighbour cell transfer with widening search radius)
- Batch pipeline with parallel rasterization, audit record and export tables

## Architecture

```text
geometries ──► Rasterizer ──► raw claims ──► HierarchyIndex
                                                  │
                           DuplicateResolver ◄────┤
                           OrphanResolver    ◄────┘
                                                  │
                                validate ──► ExportBundle / BuildAudit
```

## Features
- `parallel` (default): rasterize each batch on a rayon thread pool
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod audit;
pub mod dedup;
pub mod export;
pub mod geometry;
pub mod grid;
pub mod index;
pub mod input;
pub mod orphan;
pub mod pipeline;
pub mod progress;
pub mod rasterizer;
pub mod scoring;
pub mod types;

pub use h3o::CellIndex;

pub use audit::{BuildAudit, SkippedItem};
pub use dedup::{DuplicateAnalysis, DuplicateReport, DuplicateResolver};
pub use export::{load_index, save_index, ExportBundle};
pub use geometry::{Geometry, GeometryRecord, LonLat, Shape};
pub use grid::{CELL_EDGE_KM, CELL_RESOLUTION};
pub use index::{HierarchyIndex, HierarchyPath, Violation, ZctaRecord};
pub use input::{load_geometries, load_regions, load_zip_crosswalk, RegionRecord, ZipZctaRecord};
pub use orphan::{OrphanOutcome, OrphanPolicy, OrphanReport, OrphanResolver};
pub use pipeline::{BuildInput, BuildOptions, BuildPipeline};
pub use progress::{BuildProgress, BuildStage};
pub use rasterizer::{RasterOutcome, RasterWarning, Rasterizer};
pub use scoring::ScoreWeights;
pub use types::{BuildError, BuildResult, HrrId, HsaId, ZctaId, ZipCode};
