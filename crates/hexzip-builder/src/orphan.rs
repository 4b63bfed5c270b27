// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Orphan Resolver

An orphan is a registered ZCTA that owns no cells, usually because its
polygon is smaller than a cell or fell entirely on cells won by a
neighbour. The resolver finds single-owner cells within a search radius of
the orphan's centroid and moves the best `top_k` of them to the orphan.

A transfer adds a *pinned* claim for the orphan rather than removing the
donor's claim. The following duplicate-resolution pass settles the cell in
the orphan's favour. [`OrphanResolver::resolve`] alternates transfer and
duplicate passes until neither has anything left to do.
*/

use h3o::CellIndex;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::dedup::{DuplicateReport, DuplicateResolver};
use crate::geometry::LonLat;
use crate::grid::{self, cell_center, haversine_km};
use crate::index::{HierarchyIndex, Violation};
use crate::scoring::{normalize, proximity};
use crate::types::{BuildError, BuildResult, ZctaId};

/// Orphan transfer settings
#[derive(Debug, Clone, PartialEq)]
pub struct OrphanPolicy {
    /// Cells transferred per orphan
    pub top_k: usize,
    pub population_weight: f64,
    pub proximity_weight: f64,
    /// Transfer/duplicate passes allowed per `resolve` call
    pub max_iterations: usize,
}

impl Default for OrphanPolicy {
    fn default() -> Self {
        Self {
            top_k: 3,
            population_weight: 0.4,
            proximity_weight: 0.3,
            max_iterations: 10,
        }
    }
}

/// What happened to one orphan in a transfer pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OrphanOutcome {
    Transferred {
        zcta: ZctaId,
        #[serde(serialize_with = "serialize_cells")]
        cells: Vec<CellIndex>,
        donors: Vec<ZctaId>,
    },
    NoNeighbour {
        zcta: ZctaId,
        radius_km: f64,
    },
}

fn serialize_cells<S: serde::Serializer>(cells: &[CellIndex], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(cells.iter().map(|c| c.to_string()))
}

/// Result of a fix-point run at one search radius
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrphanReport {
    pub radius_km: f64,
    pub found: usize,
    pub fixed: BTreeSet<ZctaId>,
    pub no_neighbour: BTreeSet<ZctaId>,
    pub iterations: usize,
    pub duplicates: DuplicateReport,
    pub outcomes: Vec<OrphanOutcome>,
}

#[derive(Debug, Clone)]
struct Candidate {
    cell: CellIndex,
    owner: ZctaId,
    score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct OrphanResolver {
    policy: OrphanPolicy,
}

impl OrphanResolver {
    pub fn new(policy: OrphanPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &OrphanPolicy {
        &self.policy
    }

    /// Give each orphan up to `top_k` cells from neighbours within `radius_km`
    ///
    /// Donor cells stay claimed by the donor until the next duplicate pass.
    /// A donor never gives away its last cell.
    pub fn transfer_pass(
        &self,
        index: &mut HierarchyIndex,
        orphans: &[ZctaId],
        radius_km: f64,
    ) -> BuildResult<Vec<OrphanOutcome>> {
        let rings = grid::rings_for_radius(radius_km);
        let mut outcomes = Vec::with_capacity(orphans.len());

        for orphan in orphans {
            let record = index
                .zcta(orphan)
                .ok_or_else(|| BuildError::UnknownZcta(orphan.clone()))?;
            let centroid = record.centroid;
            let origin = match grid::cell_at(centroid) {
                Ok(cell) => cell,
                Err(e) => {
                    warn!(target: "hexzip-builder", "⚠️  Orphan ZCTA {}: {}, no search origin", orphan, e);
                    outcomes.push(OrphanOutcome::NoNeighbour {
                        zcta: orphan.clone(),
                        radius_km,
                    });
                    continue;
                }
            };

            let candidates = self.rank_candidates(index, orphan, origin, rings, centroid);

            let mut cells = Vec::new();
            let mut donors = BTreeSet::new();
            for candidate in candidates {
                if cells.len() >= self.policy.top_k {
                    break;
                }
                // Cells already pinned away are gone once duplicates are settled
                let available = index
                    .cells_of(&candidate.owner)
                    .iter()
                    .filter(|c| index.pinned_owner(**c).is_none())
                    .count();
                if available <= 1 {
                    continue;
                }
                index.claim(candidate.cell, orphan)?;
                index.pin(candidate.cell, orphan)?;
                donors.insert(candidate.owner);
                cells.push(candidate.cell);
            }

            if cells.is_empty() {
                warn!(target: "hexzip-builder",
                    "⚠️  Orphan ZCTA {}: no neighbour cells within {} km", orphan, radius_km
                );
                outcomes.push(OrphanOutcome::NoNeighbour {
                    zcta: orphan.clone(),
                    radius_km,
                });
            } else {
                debug!(target: "hexzip-builder",
                    "Orphan ZCTA {} takes {} cells from {:?}", orphan, cells.len(), donors
                );
                outcomes.push(OrphanOutcome::Transferred {
                    zcta: orphan.clone(),
                    cells,
                    donors: donors.into_iter().collect(),
                });
            }
        }
        Ok(outcomes)
    }

    /// Single-owner, unpinned neighbour cells, best first
    fn rank_candidates(
        &self,
        index: &HierarchyIndex,
        orphan: &ZctaId,
        origin: CellIndex,
        rings: u32,
        centroid: LonLat,
    ) -> Vec<Candidate> {
        let mut raw: Vec<(CellIndex, ZctaId, f64, f64)> = Vec::new();
        for cell in grid::disk(origin, rings) {
            let owners = index.owners(cell);
            if owners.len() != 1 || index.pinned_owner(cell).is_some() {
                continue;
            }
            let Some(owner) = owners.iter().next() else {
                continue;
            };
            if owner == orphan {
                continue;
            }
            let population = index.zcta(owner).map(|r| r.population as f64).unwrap_or(0.0);
            let distance = haversine_km(centroid, cell_center(cell));
            raw.push((cell, owner.clone(), population, distance));
        }

        let max_pop = raw.iter().map(|r| r.2).fold(0.0, f64::max);
        let max_distance = raw.iter().map(|r| r.3).fold(0.0, f64::max);

        let mut candidates: Vec<Candidate> = raw
            .into_iter()
            .map(|(cell, owner, population, distance)| Candidate {
                cell,
                owner,
                score: self.policy.population_weight * normalize(population, max_pop)
                    + self.policy.proximity_weight * proximity(distance, max_distance),
            })
            .collect();
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.cell.cmp(&b.cell)));
        candidates
    }

    /// Alternate duplicate and transfer passes at one radius until stable
    ///
    /// Orphans with no neighbour at this radius are reported in
    /// `no_neighbour` and left for a larger radius. Exceeding
    /// `max_iterations` is an error.
    pub fn resolve(
        &self,
        index: &mut HierarchyIndex,
        dedup: &DuplicateResolver,
        radius_km: f64,
    ) -> BuildResult<OrphanReport> {
        let mut report = OrphanReport {
            radius_km,
            found: index.orphan_zctas().len(),
            ..Default::default()
        };

        loop {
            if report.iterations >= self.policy.max_iterations {
                let remaining = index
                    .validate()
                    .iter()
                    .filter(|v| match v {
                        Violation::DuplicateOwner { .. } => true,
                        Violation::EmptyZcta { zcta } => !report.no_neighbour.contains(zcta),
                        _ => false,
                    })
                    .count();
                return Err(BuildError::NotConverged {
                    iterations: report.iterations,
                    remaining,
                });
            }
            report.iterations += 1;

            let dup = dedup.resolve(index)?;
            report.duplicates.absorb(&dup);

            let pending: Vec<ZctaId> = index
                .orphan_zctas()
                .into_iter()
                .filter(|z| !report.no_neighbour.contains(z))
                .collect();
            if pending.is_empty() {
                break;
            }

            for outcome in self.transfer_pass(index, &pending, radius_km)? {
                match &outcome {
                    OrphanOutcome::Transferred { zcta, .. } => {
                        report.fixed.insert(zcta.clone());
                    }
                    OrphanOutcome::NoNeighbour { zcta, .. } => {
                        report.no_neighbour.insert(zcta.clone());
                    }
                }
                report.outcomes.push(outcome);
            }
        }

        if report.found > 0 {
            info!(target: "hexzip-builder",
                "🧩 Orphans at {} km: {} found, {} fixed, {} without neighbours ({} iterations)",
                radius_km,
                report.found,
                report.fixed.len(),
                report.no_neighbour.len(),
                report.iterations
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ZctaRecord;

    const ORPHAN: &str = "00002";
    const NEIGHBOUR: &str = "00001";

    fn origin() -> CellIndex {
        grid::cell_at(LonLat::new(-100.0, 40.0)).unwrap()
    }

    /// Neighbour owns `owned` cells around the origin; orphan centroid sits on a ring-2 cell
    fn setup(owned: usize) -> HierarchyIndex {
        let o = origin();
        let ring1: Vec<CellIndex> = grid::disk(o, 1).into_iter().filter(|c| *c != o).collect();
        let ring2: Vec<CellIndex> = grid::disk(o, 2)
            .into_iter()
            .filter(|c| !grid::disk(o, 1).contains(c))
            .collect();

        let mut index = HierarchyIndex::new();
        index
            .register_zcta(ZctaRecord::new(ZctaId::from(NEIGHBOUR), 20.0, 5000, cell_center(o)))
            .unwrap();
        index
            .register_zcta(ZctaRecord::new(ZctaId::from(ORPHAN), 0.5, 40, cell_center(ring2[0])))
            .unwrap();

        let mut cells = vec![o];
        cells.extend(ring1.into_iter().take(owned - 1));
        for c in cells {
            index.claim(c, &ZctaId::from(NEIGHBOUR)).unwrap();
        }
        index
    }

    #[test]
    fn test_orphan_receives_top_three_cells() {
        let mut index = setup(5);
        let resolver = OrphanResolver::default();
        let report = resolver
            .resolve(&mut index, &DuplicateResolver::default(), 5.0)
            .unwrap();

        assert_eq!(report.found, 1);
        assert!(report.fixed.contains(&ZctaId::from(ORPHAN)));
        assert_eq!(index.cells_of(&ZctaId::from(ORPHAN)).len(), 3);
        assert_eq!(index.cells_of(&ZctaId::from(NEIGHBOUR)).len(), 2);
        assert!(index.duplicate_cells().is_empty());
        assert!(index.orphan_zctas().is_empty());
        // Pinned settlements are not counted as scored duplicates
        assert_eq!(report.duplicates.found, 0);
        assert_eq!(report.duplicates.pinned_settled, 3);
    }

    #[test]
    fn test_donor_keeps_its_last_cell() {
        let mut index = setup(2);
        OrphanResolver::default()
            .resolve(&mut index, &DuplicateResolver::default(), 5.0)
            .unwrap();
        assert_eq!(index.cells_of(&ZctaId::from(ORPHAN)).len(), 1);
        assert_eq!(index.cells_of(&ZctaId::from(NEIGHBOUR)).len(), 1);
    }

    #[test]
    fn test_nearest_cells_are_preferred() {
        let mut index = setup(7);
        let orphan_centroid = index.zcta(&ZctaId::from(ORPHAN)).unwrap().centroid;
        OrphanResolver::default()
            .resolve(&mut index, &DuplicateResolver::default(), 5.0)
            .unwrap();

        let taken: Vec<f64> = index
            .cells_of(&ZctaId::from(ORPHAN))
            .iter()
            .map(|c| haversine_km(orphan_centroid, cell_center(*c)))
            .collect();
        let kept_min = index
            .cells_of(&ZctaId::from(NEIGHBOUR))
            .iter()
            .map(|c| haversine_km(orphan_centroid, cell_center(*c)))
            .fold(f64::INFINITY, f64::min);
        assert!(taken.iter().all(|d| *d <= kept_min + 1e-9));
    }

    #[test]
    fn test_no_neighbour_within_radius() {
        let mut index = HierarchyIndex::new();
        index
            .register_zcta(ZctaRecord::new(ZctaId::from(NEIGHBOUR), 20.0, 5000, LonLat::new(-100.0, 40.0)))
            .unwrap();
        index.claim(origin(), &ZctaId::from(NEIGHBOUR)).unwrap();
        index
            .register_zcta(ZctaRecord::new(ZctaId::from(ORPHAN), 1.0, 10, LonLat::new(-90.0, 35.0)))
            .unwrap();

        let report = OrphanResolver::default()
            .resolve(&mut index, &DuplicateResolver::default(), 5.0)
            .unwrap();
        assert!(report.fixed.is_empty());
        assert!(report.no_neighbour.contains(&ZctaId::from(ORPHAN)));
        assert_eq!(index.orphan_zctas(), vec![ZctaId::from(ORPHAN)]);
    }

    #[test]
    fn test_unusable_centroid_is_reported_per_orphan() {
        let mut index = setup(5);
        index
            .register_zcta(ZctaRecord::new(ZctaId::from("00003"), 0.0, 5, LonLat::new(f64::NAN, 40.0)))
            .unwrap();

        let report = OrphanResolver::default()
            .resolve(&mut index, &DuplicateResolver::default(), 5.0)
            .unwrap();
        assert!(report.no_neighbour.contains(&ZctaId::from("00003")));
        assert!(report.fixed.contains(&ZctaId::from(ORPHAN)));
        assert_eq!(index.cells_of(&ZctaId::from(ORPHAN)).len(), 3);
    }

    #[test]
    fn test_iteration_cap_is_an_error() {
        let mut index = setup(5);
        let resolver = OrphanResolver::new(OrphanPolicy {
            max_iterations: 1,
            ..OrphanPolicy::default()
        });
        let result = resolver.resolve(&mut index, &DuplicateResolver::default(), 5.0);
        assert!(matches!(result, Err(BuildError::NotConverged { iterations: 1, .. })));
    }
}
