// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Duplicate Resolver

Reduces every multiply-claimed cell to a single owner. A pinned claim wins
outright; otherwise claimants are scored on area, population and proximity
of their centroid to the cell center (see [`crate::scoring`]).
*/

use h3o::CellIndex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::grid::{cell_center, cell_serde};
use crate::index::{HierarchyIndex, Violation};
use crate::scoring::{pick_winner, ScoreWeights};
use crate::types::{BuildError, BuildResult, ZctaId};

/// Number of example duplicates included in an analysis
const SAMPLE_SIZE: usize = 3;

/// Counts from one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateReport {
    /// Contested cells settled by scoring
    pub found: usize,
    pub fixed: usize,
    /// Contested cells settled in favour of a pinned orphan claim
    pub pinned_settled: usize,
    pub claims_removed: usize,
}

impl DuplicateReport {
    pub fn absorb(&mut self, other: &DuplicateReport) {
        self.found += other.found;
        self.fixed += other.fixed;
        self.pinned_settled += other.pinned_settled;
        self.claims_removed += other.claims_removed;
    }
}

/// Example of a contested cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateSample {
    #[serde(with = "cell_serde")]
    pub cell: CellIndex,
    pub claimants: Vec<ZctaId>,
}

/// Summary of the duplicates present in an index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateAnalysis {
    pub contested_cells: usize,
    /// Claims on contested cells
    pub contested_claims: usize,
    pub samples: Vec<DuplicateSample>,
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateResolver {
    weights: ScoreWeights,
}

impl DuplicateResolver {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Describe the current duplicates without changing anything
    pub fn analyze(&self, index: &HierarchyIndex) -> DuplicateAnalysis {
        let duplicates = index.duplicate_cells();
        let analysis = DuplicateAnalysis {
            contested_cells: duplicates.len(),
            contested_claims: duplicates.iter().map(|(_, owners)| owners.len()).sum(),
            samples: duplicates
                .iter()
                .take(SAMPLE_SIZE)
                .map(|(cell, owners)| DuplicateSample {
                    cell: *cell,
                    claimants: owners.clone(),
                })
                .collect(),
        };
        if analysis.contested_cells > 0 {
            info!(target: "hexzip-builder",
                "🔍 {} contested cells ({} claims)",
                analysis.contested_cells, analysis.contested_claims
            );
            for sample in &analysis.samples {
                debug!(target: "hexzip-builder", "   {} claimed by {:?}", sample.cell, sample.claimants);
            }
        }
        analysis
    }

    /// Settle every contested cell, then confirm none remain
    pub fn resolve(&self, index: &mut HierarchyIndex) -> BuildResult<DuplicateReport> {
        let mut report = DuplicateReport::default();

        for (cell, claimants) in index.duplicate_cells() {
            let pinned = index
                .pinned_owner(cell)
                .filter(|z| claimants.contains(z))
                .cloned();

            let winner = match pinned {
                Some(owner) => {
                    report.pinned_settled += 1;
                    owner
                }
                None => {
                    report.found += 1;
                    let records: Vec<_> = claimants.iter().filter_map(|z| index.zcta(z)).collect();
                    let Some(best) = pick_winner(&self.weights, cell_center(cell), &records) else {
                        warn!(target: "hexzip-builder", "No scorable claimant for cell {}", cell);
                        continue;
                    };
                    debug!(target: "hexzip-builder",
                        "Cell {} → {} (score {:.3}, {} claimants)",
                        cell, best.zcta, best.score, claimants.len()
                    );
                    report.fixed += 1;
                    best.zcta
                }
            };

            report.claims_removed += index.retain_owner(cell, &winner).len();
        }

        let remaining = index
            .validate()
            .iter()
            .filter(|v| matches!(v, Violation::DuplicateOwner { .. }))
            .count();
        if remaining > 0 {
            return Err(BuildError::UnresolvedDuplicates { remaining });
        }

        if report.found + report.pinned_settled > 0 {
            info!(target: "hexzip-builder",
                "✅ Settled {} contested cells ({} by score, {} pinned), removed {} claims",
                report.fixed + report.pinned_settled,
                report.fixed,
                report.pinned_settled,
                report.claims_removed
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LonLat;
    use crate::grid;
    use crate::index::ZctaRecord;

    fn setup(pop_a: u64, pop_b: u64) -> (HierarchyIndex, CellIndex) {
        let cell = grid::cell_at(LonLat::new(-100.0, 40.0)).unwrap();
        let centroid = grid::cell_center(cell);
        let mut index = HierarchyIndex::new();
        for (id, pop) in [("10001", pop_a), ("10002", pop_b)] {
            index
                .register_zcta(ZctaRecord::new(ZctaId::from(id), 5.0, pop, centroid))
                .unwrap();
            index.claim(cell, &ZctaId::from(id)).unwrap();
        }
        (index, cell)
    }

    #[test]
    fn test_population_decides_when_all_else_equal() {
        let resolver = DuplicateResolver::default();

        let (mut index, cell) = setup(1000, 2000);
        let report = resolver.resolve(&mut index).unwrap();
        assert_eq!(index.owners(cell).iter().next(), Some(&ZctaId::from("10002")));
        assert_eq!(report.found, 1);
        assert_eq!(report.fixed, 1);
        assert_eq!(report.claims_removed, 1);

        let (mut index, cell) = setup(2000, 1000);
        resolver.resolve(&mut index).unwrap();
        assert_eq!(index.owners(cell).iter().next(), Some(&ZctaId::from("10001")));
    }

    #[test]
    fn test_exact_tie_goes_to_lowest_zcta() {
        let (mut index, cell) = setup(500, 500);
        DuplicateResolver::default().resolve(&mut index).unwrap();
        assert_eq!(index.owners(cell).iter().next(), Some(&ZctaId::from("10001")));
    }

    #[test]
    fn test_pinned_claim_wins() {
        let (mut index, cell) = setup(0, 5000);
        index.pin(cell, &ZctaId::from("10001")).unwrap();

        let report = DuplicateResolver::default().resolve(&mut index).unwrap();
        assert_eq!(index.owners(cell).iter().next(), Some(&ZctaId::from("10001")));
        assert_eq!(report.found, 0);
        assert_eq!(report.pinned_settled, 1);
        assert_eq!(index.pinned_owner(cell), None);
    }

    #[test]
    fn test_analysis_and_idempotence() {
        let (mut index, _) = setup(1, 2);
        let resolver = DuplicateResolver::default();
        let analysis = resolver.analyze(&index);
        assert_eq!(analysis.contested_cells, 1);
        assert_eq!(analysis.contested_claims, 2);
        assert_eq!(analysis.samples.len(), 1);

        resolver.resolve(&mut index).unwrap();
        let second = resolver.resolve(&mut index).unwrap();
        assert_eq!(second, DuplicateReport::default());
        assert!(index.duplicate_cells().is_empty());
    }
}
