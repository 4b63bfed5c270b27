// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Batch Pipeline

Orchestrates a full build:

1. **Loading**: register ZCTAs, attach HSA/HRR parents, load the ZIP crosswalk
2. **Rasterization**: geometries are rasterized in parallel batches; each
   batch's raw claims are staged and committed to the index in one step
3. **Duplicate resolution**: every contested cell gets a single owner
4. **Orphan resolution**: ZCTAs without cells borrow cells from neighbours,
   widening the search radius per the schedule
5. **Validation**: the repaired hierarchy must be free of violations

Repair works on a copy of the index. The caller's index only receives the
repaired hierarchy if validation passes; on failure it keeps the raw claims
from stage 2.
*/

use h3o::CellIndex;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::audit::{BuildAudit, SkippedItem};
use crate::dedup::DuplicateResolver;
use crate::geometry::Geometry;
use crate::index::{HierarchyIndex, ZctaRecord};
use crate::input::{RegionRecord, ZipZctaRecord};
use crate::orphan::{OrphanPolicy, OrphanResolver};
use crate::progress::{format_duration, BuildProgress, BuildStage, EtaEstimator};
use crate::rasterizer::{RasterOutcome, RasterWarning, Rasterizer};
use crate::scoring::ScoreWeights;
use crate::types::{BuildError, BuildResult, ZctaId, ZipCode};

#[cfg(feature = "parallel")]
type WorkerPool = rayon::ThreadPool;
#[cfg(not(feature = "parallel"))]
type WorkerPool = ();

/// Tunables for a build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Geometries per committed batch
    pub batch_size: usize,
    /// Rasterization worker threads
    pub workers: usize,
    /// Transfer/duplicate passes allowed per search radius
    pub max_repair_iterations: usize,
    pub weights: ScoreWeights,
    /// Cells transferred to each orphan
    pub top_k: usize,
    /// Orphan search radii, tried in order
    pub radius_schedule_km: Vec<f64>,
    /// Log ZCTA coverage every N batches
    pub progress_every_batches: usize,
    /// Batches in the ETA rolling window
    pub eta_window_batches: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            workers: 4,
            max_repair_iterations: 10,
            weights: ScoreWeights::default(),
            top_k: 3,
            radius_schedule_km: vec![5.0, 10.0, 20.0],
            progress_every_batches: 5,
            eta_window_batches: 10,
        }
    }
}

impl BuildOptions {
    pub fn validate(&self) -> BuildResult<()> {
        let invalid = |msg: &str| Err(BuildError::InvalidOptions(msg.to_string()));
        if self.batch_size == 0 {
            return invalid("batch_size must be positive");
        }
        if self.workers == 0 {
            return invalid("workers must be positive");
        }
        if self.max_repair_iterations == 0 {
            return invalid("max_repair_iterations must be positive");
        }
        self.weights.check().map_err(BuildError::InvalidOptions)?;
        if self.top_k == 0 {
            return invalid("top_k must be positive");
        }
        if self.radius_schedule_km.is_empty() {
            return invalid("radius schedule must not be empty");
        }
        if self
            .radius_schedule_km
            .iter()
            .any(|r| !r.is_finite() || *r <= 0.0)
        {
            return invalid("search radii must be positive");
        }
        Ok(())
    }

    fn orphan_policy(&self) -> OrphanPolicy {
        OrphanPolicy {
            top_k: self.top_k,
            population_weight: self.weights.population,
            proximity_weight: self.weights.proximity,
            max_iterations: self.max_repair_iterations,
        }
    }
}

/// Everything a build consumes
#[derive(Debug, Clone, Default)]
pub struct BuildInput {
    pub geometries: Vec<Geometry>,
    pub zip_crosswalk: Vec<ZipZctaRecord>,
    pub regions: Vec<RegionRecord>,
    /// Features rejected while reading the boundary file
    pub rejected: Vec<SkippedItem>,
}

/// Build orchestrator
pub struct BuildPipeline {
    options: BuildOptions,
    rasterizer: Rasterizer,
    dedup: DuplicateResolver,
    orphans: OrphanResolver,
    progress: Arc<RwLock<BuildProgress>>,
    start_time: Instant,
}

impl BuildPipeline {
    pub fn new(options: BuildOptions) -> BuildResult<Self> {
        options.validate()?;
        Ok(Self {
            rasterizer: Rasterizer::new(),
            dedup: DuplicateResolver::new(options.weights),
            orphans: OrphanResolver::new(options.orphan_policy()),
            progress: Arc::new(RwLock::new(BuildProgress::default())),
            start_time: Instant::now(),
            options,
        })
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Get current build progress
    pub fn get_progress(&self) -> BuildProgress {
        self.progress.read().clone()
    }

    /// Shared handle for observing progress from another thread
    pub fn progress_handle(&self) -> Arc<RwLock<BuildProgress>> {
        Arc::clone(&self.progress)
    }

    /// Run a complete build into `index`
    ///
    /// On failure the returned [`BuildError::BuildFailed`] carries the audit.
    pub fn run(&mut self, index: &mut HierarchyIndex, input: BuildInput) -> BuildResult<BuildAudit> {
        self.start_time = Instant::now();
        *self.progress.write() = BuildProgress {
            geometries_total: input.geometries.len(),
            ..BuildProgress::default()
        };
        let mut audit = BuildAudit::new(input.geometries.len());

        info!(target: "hexzip-builder",
            "🏗️  Building hierarchy: {} geometries, {} ZIP rows, {} region rows",
            input.geometries.len(),
            input.zip_crosswalk.len(),
            input.regions.len()
        );

        let result = self.run_stages(index, input, &mut audit);
        let duration_ms = self.start_time.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                audit.finish(true, None, duration_ms);
                self.update_stage(BuildStage::Completed, 100);
                info!(target: "hexzip-builder",
                    "✅ Build completed in {}: {} cells assigned, {} duplicates fixed, {} orphans fixed, {} unresolved",
                    format_duration(std::time::Duration::from_millis(duration_ms)),
                    audit.cells_assigned,
                    audit.duplicates_fixed,
                    audit.orphans_fixed,
                    audit.unresolved_zctas.len()
                );
                Ok(audit)
            }
            Err(e) => {
                audit.finish(false, Some(e.to_string()), duration_ms);
                self.update_stage(BuildStage::Failed, 0);
                error!(target: "hexzip-builder", "❌ Build failed: {}", e);
                Err(BuildError::BuildFailed {
                    audit: Box::new(audit),
                    source: Box::new(e),
                })
            }
        }
    }

    fn run_stages(
        &mut self,
        index: &mut HierarchyIndex,
        input: BuildInput,
        audit: &mut BuildAudit,
    ) -> BuildResult<()> {
        let BuildInput {
            geometries,
            zip_crosswalk,
            regions,
            rejected,
        } = input;

        if zip_crosswalk.is_empty() {
            return Err(BuildError::MissingSupportingData("ZIP crosswalk is empty".into()));
        }
        if regions.is_empty() {
            return Err(BuildError::MissingSupportingData("region table is empty".into()));
        }
        audit.geometries_skipped.extend(rejected);

        // Stage 1: Loading
        let accepted = self.load_zctas(index, &geometries, audit);
        self.load_regions(index, &regions, audit)?;
        self.load_zip_crosswalk(index, &zip_crosswalk, audit)?;

        // Stage 2: Rasterization
        self.rasterize(index, &accepted, audit)?;

        // Stages 3-4 run on a copy
        let mut working = index.clone();
        self.repair(&mut working, audit)?;

        // Stage 5: Validation
        self.update_stage(BuildStage::Validation, 0);
        let violations = working.validate();
        audit.final_violations = violations.len();
        if !violations.is_empty() {
            for violation in violations.iter().take(10) {
                error!(target: "hexzip-builder", "   {}", violation);
            }
            return Err(BuildError::Inconsistent {
                violations: violations.len(),
            });
        }
        self.update_stage(BuildStage::Validation, 100);

        audit.cells_assigned = working.cell_count();
        *index = working;
        Ok(())
    }

    // ═════════════════════════════════════════════════════════════════
    // Stage 1: Loading
    // ═════════════════════════════════════════════════════════════════

    /// Register one ZCTA per geometry; returns the geometries to rasterize
    fn load_zctas<'a>(
        &self,
        index: &mut HierarchyIndex,
        geometries: &'a [Geometry],
        audit: &mut BuildAudit,
    ) -> Vec<&'a Geometry> {
        self.update_stage(BuildStage::Loading, 0);
        let mut accepted = Vec::with_capacity(geometries.len());
        for geometry in geometries {
            if let Err(reason) = check_attributes(geometry) {
                warn!(target: "hexzip-builder", "Skipping geometry for {}: {}", geometry.zcta, reason);
                audit
                    .geometries_skipped
                    .push(SkippedItem::new(geometry.zcta.as_str(), reason));
                continue;
            }
            let record = ZctaRecord::new(
                geometry.zcta.clone(),
                geometry.area_km2,
                geometry.population,
                geometry.centroid,
            );
            match index.register_zcta(record) {
                Ok(()) => accepted.push(geometry),
                Err(e) => {
                    warn!(target: "hexzip-builder", "Skipping geometry for {}: {}", geometry.zcta, e);
                    audit
                        .geometries_skipped
                        .push(SkippedItem::new(geometry.zcta.as_str(), e.to_string()));
                }
            }
        }
        info!(target: "hexzip-builder", "📍 Registered {} ZCTAs", accepted.len());
        accepted
    }

    fn load_regions(
        &self,
        index: &mut HierarchyIndex,
        regions: &[RegionRecord],
        audit: &mut BuildAudit,
    ) -> BuildResult<()> {
        for row in regions {
            match index.assign_region(&row.zcta, row.hsa.clone(), row.hrr.clone()) {
                Ok(()) => {}
                Err(e) if e.is_per_item() => {
                    debug!(target: "hexzip-builder", "Region row for {} skipped: {}", row.zcta, e);
                    audit
                        .regions_skipped
                        .push(SkippedItem::new(row.zcta.as_str(), e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        // ZCTAs without an HSA cannot be placed in the hierarchy
        let unmapped: Vec<ZctaId> = index
            .zctas()
            .filter(|r| r.hsa.is_none())
            .map(|r| r.zcta.clone())
            .collect();
        for zcta in &unmapped {
            index.mark_unresolved(zcta)?;
        }
        if !unmapped.is_empty() {
            warn!(target: "hexzip-builder",
                "⚠️  {} ZCTAs have no HSA/HRR assignment and are excluded pending review",
                unmapped.len()
            );
        }
        audit.unmapped_zctas = unmapped;

        if !audit.regions_skipped.is_empty() {
            warn!(target: "hexzip-builder", "⚠️  {} region rows skipped", audit.regions_skipped.len());
        }
        Ok(())
    }

    /// Load crosswalk rows, add 1:1 rows for ZCTAs without any, and reconcile
    /// each ZCTA's population to its crosswalk total
    fn load_zip_crosswalk(
        &self,
        index: &mut HierarchyIndex,
        rows: &[ZipZctaRecord],
        audit: &mut BuildAudit,
    ) -> BuildResult<()> {
        let mut by_zcta: BTreeMap<&ZctaId, Vec<&ZipZctaRecord>> = BTreeMap::new();
        for row in rows {
            if index.zcta(&row.zcta).is_none() {
                audit
                    .zips_skipped
                    .push(SkippedItem::new(row.zip.as_str(), format!("unknown ZCTA {}", row.zcta)));
                continue;
            }
            by_zcta.entry(&row.zcta).or_default().push(row);
        }

        for (zcta, zcta_rows) in by_zcta {
            let unweighted = zcta_rows.iter().all(|r| r.population.is_none());
            let zcta_population = index.zcta(zcta).map(|r| r.population).unwrap_or(0);
            for (i, row) in zcta_rows.iter().enumerate() {
                // Without weights the whole population goes to the first ZIP
                let population = match row.population {
                    Some(p) => p,
                    None if unweighted && i == 0 => zcta_population,
                    None => 0,
                };
                if index.add_zip(row.zip.clone(), zcta, population)? {
                    audit.zip_rows += 1;
                } else {
                    debug!(target: "hexzip-builder", "Duplicate crosswalk row {} → {}", row.zip, zcta);
                }
            }
        }

        let covered: BTreeSet<ZctaId> = index.zip_rows().map(|(_, z, _)| z.clone()).collect();
        let missing: Vec<(ZctaId, u64)> = index
            .zctas()
            .filter(|r| !covered.contains(&r.zcta))
            .map(|r| (r.zcta.clone(), r.population))
            .collect();
        for (zcta, population) in missing {
            index.add_zip(ZipCode::new(zcta.as_str()), &zcta, population)?;
            audit.zip_rows += 1;
            audit.fallback_zips += 1;
        }

        let mut totals: BTreeMap<ZctaId, u64> = BTreeMap::new();
        for (_, zcta, population) in index.zip_rows() {
            *totals.entry(zcta.clone()).or_default() += population;
        }
        for (zcta, total) in totals {
            index.set_population(&zcta, total)?;
        }

        info!(target: "hexzip-builder",
            "📮 ZIP crosswalk: {} rows ({} 1:1 fallbacks, {} skipped)",
            audit.zip_rows,
            audit.fallback_zips,
            audit.zips_skipped.len()
        );
        self.update_stage(BuildStage::Loading, 100);
        Ok(())
    }

    // ═════════════════════════════════════════════════════════════════
    // Stage 2: Rasterization
    // ═════════════════════════════════════════════════════════════════

    #[cfg(feature = "parallel")]
    fn build_pool(&self) -> BuildResult<WorkerPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .thread_name(|i| format!("hexzip-raster-{}", i))
            .build()
            .map_err(|e| BuildError::WorkerPool(e.to_string()))
    }

    #[cfg(not(feature = "parallel"))]
    fn build_pool(&self) -> BuildResult<WorkerPool> {
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn rasterize_batch(
        &self,
        pool: &WorkerPool,
        batch: &[&Geometry],
    ) -> Vec<(ZctaId, BuildResult<RasterOutcome>)> {
        use rayon::prelude::*;
        let rasterizer = &self.rasterizer;
        pool.install(|| {
            batch
                .par_iter()
                .map(|g| (g.zcta.clone(), rasterizer.rasterize(g)))
                .collect()
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn rasterize_batch(
        &self,
        _pool: &WorkerPool,
        batch: &[&Geometry],
    ) -> Vec<(ZctaId, BuildResult<RasterOutcome>)> {
        batch
            .iter()
            .map(|g| (g.zcta.clone(), self.rasterizer.rasterize(g)))
            .collect()
    }

    fn rasterize(
        &self,
        index: &mut HierarchyIndex,
        geometries: &[&Geometry],
        audit: &mut BuildAudit,
    ) -> BuildResult<()> {
        self.update_stage(BuildStage::Rasterization, 0);
        let pool = self.build_pool()?;
        let total = geometries.len();
        let total_batches = total.div_ceil(self.options.batch_size);
        let mut eta = EtaEstimator::new(self.options.eta_window_batches);
        let mut processed = 0usize;

        info!(target: "hexzip-builder",
            "🔷 Rasterizing {} geometries in {} batches ({} workers)",
            total, total_batches, self.options.workers
        );

        for (batch_no, batch) in geometries.chunks(self.options.batch_size).enumerate() {
            let batch_start = Instant::now();
            let results = self.rasterize_batch(&pool, batch);

            let mut staged: Vec<(CellIndex, ZctaId)> = Vec::new();
            for (zcta, result) in results {
                match result {
                    Ok(outcome) => {
                        if let Some(RasterWarning::UnsupportedShape { kind }) = &outcome.warning {
                            audit.geometry_warnings.push(SkippedItem::new(
                                zcta.as_str(),
                                format!("unsupported geometry type {}", kind),
                            ));
                        }
                        staged.extend(outcome.cells.into_iter().map(|c| (c, zcta.clone())));
                        audit.geometries_processed += 1;
                    }
                    Err(e) => {
                        warn!(target: "hexzip-builder", "Skipping geometry for {}: {}", zcta, e);
                        audit
                            .geometries_skipped
                            .push(SkippedItem::new(zcta.as_str(), e.to_string()));
                    }
                }
            }

            let added = index.commit_claims(&staged)?;
            audit.cells_claimed += added;
            audit.batches += 1;
            processed += batch.len();
            eta.record(batch.len(), batch_start.elapsed());
            let remaining_eta = eta.eta(total - processed);

            self.update_progress(|p| {
                p.progress = (processed * 100 / total.max(1)) as u8;
                p.geometries_processed = processed;
                p.batches_committed = batch_no + 1;
                p.cells_claimed = audit.cells_claimed;
                p.eta = remaining_eta;
            });

            let last = batch_no + 1 == total_batches;
            if (batch_no + 1) % self.options.progress_every_batches.max(1) == 0 || last {
                let (with_cells, without_cells) = index.coverage();
                info!(target: "hexzip-builder",
                    "📊 Batch {}/{}: {}/{} geometries, {} claims, ZCTAs with cells {} / without {}, ETA {}",
                    batch_no + 1,
                    total_batches,
                    processed,
                    total,
                    audit.cells_claimed,
                    with_cells,
                    without_cells,
                    remaining_eta.map(format_duration).unwrap_or_else(|| "unknown".into())
                );
            } else {
                debug!(target: "hexzip-builder",
                    "Batch {}/{} committed: {} new claims", batch_no + 1, total_batches, added
                );
            }
        }

        self.update_stage(BuildStage::Rasterization, 100);
        Ok(())
    }

    // ═════════════════════════════════════════════════════════════════
    // Stages 3-4: Repair
    // ═════════════════════════════════════════════════════════════════

    fn repair(&self, working: &mut HierarchyIndex, audit: &mut BuildAudit) -> BuildResult<()> {
        self.update_stage(BuildStage::DuplicateResolution, 0);
        self.dedup.analyze(working);
        let initial = self.dedup.resolve(working)?;
        audit.duplicates_found += initial.found;
        audit.duplicates_fixed += initial.fixed;
        self.update_stage(BuildStage::DuplicateResolution, 100);

        self.update_stage(BuildStage::OrphanResolution, 0);
        let orphans = working.orphan_zctas();
        audit.orphans_found = orphans.len();
        if orphans.is_empty() {
            self.update_stage(BuildStage::OrphanResolution, 100);
            return Ok(());
        }
        info!(target: "hexzip-builder", "🧩 {} ZCTAs own no cells", orphans.len());

        let schedule = &self.options.radius_schedule_km;
        for (step, radius_km) in schedule.iter().enumerate() {
            let report = self.orphans.resolve(working, &self.dedup, *radius_km)?;
            audit.orphans_fixed += report.fixed.len();
            audit.duplicates_found += report.duplicates.found;
            audit.duplicates_fixed += report.duplicates.fixed;
            audit.repair_iterations += report.iterations;

            self.update_progress(|p| p.progress = ((step + 1) * 100 / schedule.len()) as u8);
            if report.no_neighbour.is_empty() {
                break;
            }
            if let Some(next) = schedule.get(step + 1) {
                info!(target: "hexzip-builder",
                    "🔁 {} orphans without neighbours at {} km, retrying at {} km",
                    report.no_neighbour.len(),
                    radius_km,
                    next
                );
            }
        }

        let max_radius = schedule.last().copied().unwrap_or_default();
        for zcta in working.orphan_zctas() {
            warn!(target: "hexzip-builder",
                "⚠️  ZCTA {} has no neighbour within {} km, marked unresolved for manual review",
                zcta, max_radius
            );
            working.mark_unresolved(&zcta)?;
            audit.unresolved_zctas.push(zcta);
        }
        self.update_stage(BuildStage::OrphanResolution, 100);
        Ok(())
    }

    // ═════════════════════════════════════════════════════════════════
    // Progress
    // ═════════════════════════════════════════════════════════════════

    fn update_stage(&self, stage: BuildStage, progress: u8) {
        let mut p = self.progress.write();
        p.stage = stage;
        p.progress = progress;
        p.duration_ms = self.start_time.elapsed().as_millis() as u64;
    }

    fn update_progress<F>(&self, f: F)
    where
        F: FnOnce(&mut BuildProgress),
    {
        let mut p = self.progress.write();
        f(&mut p);
        p.duration_ms = self.start_time.elapsed().as_millis() as u64;
    }
}

/// Scoring attributes a geometry must carry to be registered
fn check_attributes(geometry: &Geometry) -> Result<(), String> {
    if !geometry.centroid.is_valid() {
        return Err(format!(
            "centroid out of range (lat={}, lng={})",
            geometry.centroid.lat, geometry.centroid.lon
        ));
    }
    if !geometry.area_km2.is_finite() || geometry.area_km2 < 0.0 {
        return Err(format!("invalid area {}", geometry.area_km2));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{LonLat, Shape};

    #[test]
    fn test_default_options_are_valid() {
        assert!(BuildOptions::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = BuildOptions {
            radius_schedule_km: vec![],
            ..BuildOptions::default()
        };
        assert!(matches!(
            BuildPipeline::new(options),
            Err(BuildError::InvalidOptions(_))
        ));
        let options = BuildOptions {
            batch_size: 0,
            ..BuildOptions::default()
        };
        assert!(BuildPipeline::new(options).is_err());
    }

    #[test]
    fn test_bad_weights_are_rejected() {
        for weights in [
            ScoreWeights { area: -0.1, ..ScoreWeights::default() },
            ScoreWeights { population: f64::NAN, ..ScoreWeights::default() },
            ScoreWeights { area: 0.0, population: 0.0, proximity: 0.0 },
        ] {
            let options = BuildOptions { weights, ..BuildOptions::default() };
            assert!(matches!(
                options.validate(),
                Err(BuildError::InvalidOptions(_))
            ));
        }
    }

    #[test]
    fn test_invalid_centroid_skips_only_that_geometry() {
        let origin = crate::grid::cell_at(LonLat::new(-100.0, 40.0)).unwrap();
        let good = Geometry::from_shape(
            ZctaId::from("10001"),
            Shape::Polygon(crate::grid::cell_polygon(origin)),
            100,
        )
        .unwrap();
        let bad = Geometry {
            zcta: ZctaId::from("10002"),
            shape: Shape::Unsupported { kind: "Point".into() },
            area_km2: 0.0,
            population: 10,
            centroid: LonLat::new(f64::NAN, 40.0),
        };
        let input = BuildInput {
            geometries: vec![good, bad],
            zip_crosswalk: vec![ZipZctaRecord {
                zip: "10001".into(),
                zcta: "10001".into(),
                population: Some(100),
            }],
            regions: ["10001", "10002"]
                .into_iter()
                .map(|z| RegionRecord {
                    zcta: z.into(),
                    hsa: "H1".into(),
                    hrr: "R1".into(),
                })
                .collect(),
            rejected: vec![],
        };

        let mut index = HierarchyIndex::new();
        let audit = BuildPipeline::new(BuildOptions::default())
            .unwrap()
            .run(&mut index, input)
            .unwrap();
        assert!(audit.is_healthy());
        assert_eq!(audit.geometries_skipped.len(), 1);
        assert_eq!(audit.geometries_skipped[0].item, "10002");
        assert!(index.zcta(&ZctaId::from("10002")).is_none());
        assert_eq!(index.cells_of(&ZctaId::from("10001")).len(), 1);
        assert_eq!(audit.regions_skipped.len(), 1);
    }

    #[test]
    fn test_empty_crosswalk_is_fatal_before_mutation() {
        let mut pipeline = BuildPipeline::new(BuildOptions::default()).unwrap();
        let mut index = HierarchyIndex::new();
        let input = BuildInput {
            regions: vec![RegionRecord {
                zcta: ZctaId::from("00001"),
                hsa: "1".into(),
                hrr: "1".into(),
            }],
            ..BuildInput::default()
        };

        let err = pipeline.run(&mut index, input).unwrap_err();
        let BuildError::BuildFailed { audit, source } = err else {
            panic!("expected BuildFailed");
        };
        assert!(matches!(*source, BuildError::MissingSupportingData(_)));
        assert!(!audit.succeeded);
        assert_eq!(index.zcta_count(), 0);
        assert_eq!(pipeline.get_progress().stage, BuildStage::Failed);
    }
}
