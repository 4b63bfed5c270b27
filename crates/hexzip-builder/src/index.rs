// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Hierarchy Index

Keeps the HRR ⊃ HSA ⊃ ZCTA ⊃ cell hierarchy plus the ZIP crosswalk.

Cell ownership is tracked in both directions (cell → claimants and
ZCTA → cells) so that lookups are O(1) either way. During a build a cell
may be claimed by several ZCTAs; the repair stage reduces every cell to a
single owner and [`HierarchyIndex::validate`] reports anything left over.

A *pinned* claim marks a cell that an orphan ZCTA received from a
neighbour. The duplicate resolver settles a pinned cell in favour of the
pinned claimant instead of scoring it.
*/

use ahash::AHashMap;
use h3o::CellIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::LonLat;
use crate::grid::{self, cell_serde};
use crate::types::{BuildError, BuildResult, HrrId, HsaId, ZctaId, ZipCode};

static NO_OWNERS: BTreeSet<ZctaId> = BTreeSet::new();
static NO_CELLS: BTreeSet<CellIndex> = BTreeSet::new();

/// Attributes of one ZCTA
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZctaRecord {
    pub zcta: ZctaId,
    pub area_km2: f64,
    pub population: u64,
    pub centroid: LonLat,
    #[serde(default)]
    pub hsa: Option<HsaId>,
    /// Excluded from coverage and parent checks pending manual review
    #[serde(default)]
    pub unresolved: bool,
}

impl ZctaRecord {
    pub fn new(zcta: ZctaId, area_km2: f64, population: u64, centroid: LonLat) -> Self {
        Self {
            zcta,
            area_km2,
            population,
            centroid,
            hsa: None,
            unresolved: false,
        }
    }
}

/// Hierarchy consistency problems reported by [`HierarchyIndex::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("cell {cell} has {} owners", .owners.len())]
    DuplicateOwner {
        #[serde(with = "cell_serde")]
        cell: CellIndex,
        owners: Vec<ZctaId>,
    },
    #[error("ZCTA {zcta} owns no cells")]
    EmptyZcta { zcta: ZctaId },
    #[error("ZCTA {zcta} has no HSA")]
    MissingHsa { zcta: ZctaId },
    #[error("HSA {hsa} has no HRR")]
    MissingHrr { hsa: HsaId },
    #[error("ZCTA {zcta} population {recorded} != crosswalk total {crosswalk}")]
    PopulationMismatch {
        zcta: ZctaId,
        recorded: u64,
        crosswalk: u64,
    },
}

/// Full hierarchy path of a cell or ZIP
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyPath {
    pub zcta: ZctaId,
    pub hsa: Option<HsaId>,
    pub hrr: Option<HrrId>,
    #[serde(with = "cell_serde_opt")]
    pub cell: Option<CellIndex>,
}

mod cell_serde_opt {
    use h3o::CellIndex;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(cell: &Option<CellIndex>, serializer: S) -> Result<S::Ok, S::Error> {
        match cell {
            Some(c) => serializer.collect_str(c),
            None => serializer.serialize_none(),
        }
    }
}

/// The cell hierarchy and its supporting tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "IndexSnapshot", try_from = "IndexSnapshot")]
pub struct HierarchyIndex {
    zctas: BTreeMap<ZctaId, ZctaRecord>,
    hsa_parent: BTreeMap<HsaId, HrrId>,
    /// (zip, zcta) → population weight
    zip_rows: BTreeMap<(ZipCode, ZctaId), u64>,
    claims: AHashMap<CellIndex, BTreeSet<ZctaId>>,
    cells_by_zcta: AHashMap<ZctaId, BTreeSet<CellIndex>>,
    pinned: AHashMap<CellIndex, ZctaId>,
}

impl HierarchyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // ═════════════════════════════════════════════════════════════════
    // Registration
    // ═════════════════════════════════════════════════════════════════

    /// Register a ZCTA; registering the same ZCTA twice is an error
    pub fn register_zcta(&mut self, record: ZctaRecord) -> BuildResult<()> {
        if self.zctas.contains_key(&record.zcta) {
            return Err(BuildError::DuplicateZcta(record.zcta));
        }
        self.zctas.insert(record.zcta.clone(), record);
        Ok(())
    }

    /// Attach a ZCTA to an HSA and that HSA to an HRR
    ///
    /// An HSA has exactly one HRR; a conflicting parent is rejected and the
    /// existing mapping is kept.
    pub fn assign_region(&mut self, zcta: &ZctaId, hsa: HsaId, hrr: HrrId) -> BuildResult<()> {
        if !self.zctas.contains_key(zcta) {
            return Err(BuildError::UnknownZcta(zcta.clone()));
        }
        if let Some(existing) = self.hsa_parent.get(&hsa) {
            if *existing != hrr {
                return Err(BuildError::ConflictingParent {
                    hsa,
                    existing: existing.clone(),
                    requested: hrr,
                });
            }
        } else {
            self.hsa_parent.insert(hsa.clone(), hrr);
        }
        if let Some(record) = self.zctas.get_mut(zcta) {
            record.hsa = Some(hsa);
        }
        Ok(())
    }

    /// Add a ZIP → ZCTA crosswalk row; returns `false` if the pair already exists
    pub fn add_zip(&mut self, zip: ZipCode, zcta: &ZctaId, population: u64) -> BuildResult<bool> {
        if !self.zctas.contains_key(zcta) {
            return Err(BuildError::UnknownZcta(zcta.clone()));
        }
        let key = (zip, zcta.clone());
        if self.zip_rows.contains_key(&key) {
            return Ok(false);
        }
        self.zip_rows.insert(key, population);
        Ok(true)
    }

    pub fn set_population(&mut self, zcta: &ZctaId, population: u64) -> BuildResult<()> {
        let record = self
            .zctas
            .get_mut(zcta)
            .ok_or_else(|| BuildError::UnknownZcta(zcta.clone()))?;
        record.population = population;
        Ok(())
    }

    pub fn mark_unresolved(&mut self, zcta: &ZctaId) -> BuildResult<()> {
        let record = self
            .zctas
            .get_mut(zcta)
            .ok_or_else(|| BuildError::UnknownZcta(zcta.clone()))?;
        record.unresolved = true;
        Ok(())
    }

    // ═════════════════════════════════════════════════════════════════
    // Claims
    // ═════════════════════════════════════════════════════════════════

    /// Record that `zcta` claims `cell`; competing claims are kept
    ///
    /// Returns `true` if this is a new claim.
    pub fn claim(&mut self, cell: CellIndex, zcta: &ZctaId) -> BuildResult<bool> {
        if !self.zctas.contains_key(zcta) {
            return Err(BuildError::UnknownZcta(zcta.clone()));
        }
        let added = self.claims.entry(cell).or_default().insert(zcta.clone());
        if added {
            self.cells_by_zcta.entry(zcta.clone()).or_default().insert(cell);
        }
        Ok(added)
    }

    /// Apply a batch of claims atomically
    ///
    /// Every ZCTA is checked before anything is written, so a rejected batch
    /// leaves the index untouched. Returns the number of new claims.
    pub fn commit_claims(&mut self, claims: &[(CellIndex, ZctaId)]) -> BuildResult<usize> {
        if let Some((_, unknown)) = claims.iter().find(|(_, z)| !self.zctas.contains_key(z)) {
            return Err(BuildError::UnknownZcta(unknown.clone()));
        }
        let mut added = 0;
        for (cell, zcta) in claims {
            if self.claim(*cell, zcta)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Drop one claim; returns `true` if it existed
    pub fn release(&mut self, cell: CellIndex, zcta: &ZctaId) -> bool {
        let removed = match self.claims.get_mut(&cell) {
            Some(owners) => {
                let removed = owners.remove(zcta);
                if owners.is_empty() {
                    self.claims.remove(&cell);
                }
                removed
            }
            None => false,
        };
        if removed {
            if let Some(cells) = self.cells_by_zcta.get_mut(zcta) {
                cells.remove(&cell);
                if cells.is_empty() {
                    self.cells_by_zcta.remove(zcta);
                }
            }
            if self.pinned.get(&cell) == Some(zcta) {
                self.pinned.remove(&cell);
            }
        }
        removed
    }

    /// Keep only `winner`'s claim on `cell`; returns the claimants removed
    pub fn retain_owner(&mut self, cell: CellIndex, winner: &ZctaId) -> Vec<ZctaId> {
        let losers: Vec<ZctaId> = self
            .owners(cell)
            .iter()
            .filter(|z| *z != winner)
            .cloned()
            .collect();
        for loser in &losers {
            self.release(cell, loser);
        }
        self.pinned.remove(&cell);
        losers
    }

    /// Mark `zcta`'s existing claim on `cell` as winning any later conflict
    pub fn pin(&mut self, cell: CellIndex, zcta: &ZctaId) -> BuildResult<()> {
        if !self.owners(cell).contains(zcta) {
            return Err(BuildError::InvalidCell(format!(
                "cannot pin {} to {}: no such claim",
                cell, zcta
            )));
        }
        self.pinned.insert(cell, zcta.clone());
        Ok(())
    }

    pub fn pinned_owner(&self, cell: CellIndex) -> Option<&ZctaId> {
        self.pinned.get(&cell)
    }

    /// Current claimants of a cell (empty if unclaimed)
    pub fn owners(&self, cell: CellIndex) -> &BTreeSet<ZctaId> {
        self.claims.get(&cell).unwrap_or(&NO_OWNERS)
    }

    /// Cells currently claimed by a ZCTA
    pub fn cells_of(&self, zcta: &ZctaId) -> &BTreeSet<CellIndex> {
        self.cells_by_zcta.get(zcta).unwrap_or(&NO_CELLS)
    }

    /// Cells with more than one claimant, sorted by cell
    pub fn duplicate_cells(&self) -> Vec<(CellIndex, Vec<ZctaId>)> {
        let mut dups: Vec<(CellIndex, Vec<ZctaId>)> = self
            .claims
            .iter()
            .filter(|(_, owners)| owners.len() > 1)
            .map(|(cell, owners)| (*cell, owners.iter().cloned().collect()))
            .collect();
        dups.sort_unstable_by_key(|(cell, _)| *cell);
        dups
    }

    /// Registered ZCTAs that own no cells and are not marked unresolved
    pub fn orphan_zctas(&self) -> Vec<ZctaId> {
        self.zctas
            .values()
            .filter(|r| !r.unresolved && self.cells_of(&r.zcta).is_empty())
            .map(|r| r.zcta.clone())
            .collect()
    }

    // ═════════════════════════════════════════════════════════════════
    // Queries
    // ═════════════════════════════════════════════════════════════════

    pub fn zcta(&self, zcta: &ZctaId) -> Option<&ZctaRecord> {
        self.zctas.get(zcta)
    }

    pub fn zctas(&self) -> impl Iterator<Item = &ZctaRecord> {
        self.zctas.values()
    }

    pub fn hrr_of_hsa(&self, hsa: &HsaId) -> Option<&HrrId> {
        self.hsa_parent.get(hsa)
    }

    pub fn hsa_parents(&self) -> impl Iterator<Item = (&HsaId, &HrrId)> {
        self.hsa_parent.iter()
    }

    /// Crosswalk rows as (zip, zcta, population), sorted by ZIP
    pub fn zip_rows(&self) -> impl Iterator<Item = (&ZipCode, &ZctaId, u64)> {
        self.zip_rows.iter().map(|((zip, zcta), pop)| (zip, zcta, *pop))
    }

    /// Single owner of each claimed cell, sorted by cell
    ///
    /// Cells that are still contested are skipped.
    pub fn assignments(&self) -> Vec<(CellIndex, &ZctaId)> {
        let mut rows: Vec<(CellIndex, &ZctaId)> = self
            .claims
            .iter()
            .filter(|(_, owners)| owners.len() == 1)
            .filter_map(|(cell, owners)| owners.iter().next().map(|z| (*cell, z)))
            .collect();
        rows.sort_unstable_by_key(|(cell, _)| *cell);
        rows
    }

    pub fn zcta_count(&self) -> usize {
        self.zctas.len()
    }

    pub fn cell_count(&self) -> usize {
        self.claims.len()
    }

    pub fn claim_count(&self) -> usize {
        self.claims.values().map(BTreeSet::len).sum()
    }

    /// (ZCTAs with cells, ZCTAs without cells)
    pub fn coverage(&self) -> (usize, usize) {
        let with = self
            .zctas
            .keys()
            .filter(|z| !self.cells_of(z).is_empty())
            .count();
        (with, self.zctas.len() - with)
    }

    fn path_for(&self, zcta: &ZctaId, cell: Option<CellIndex>) -> Option<HierarchyPath> {
        let record = self.zctas.get(zcta)?;
        let hrr = record
            .hsa
            .as_ref()
            .and_then(|h| self.hsa_parent.get(h))
            .cloned();
        Some(HierarchyPath {
            zcta: zcta.clone(),
            hsa: record.hsa.clone(),
            hrr,
            cell,
        })
    }

    /// Resolve a ZIP to its hierarchy path via the heaviest crosswalk row
    pub fn resolve_zip(&self, zip: &ZipCode) -> Option<HierarchyPath> {
        let (_, zcta) = self
            .zip_rows
            .iter()
            .filter(|((z, _), _)| z == zip)
            .map(|((_, zcta), pop)| (*pop, zcta))
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(a.1)))?;
        self.path_for(zcta, None)
    }

    /// Resolve a point to the owner of the cell containing it
    pub fn resolve_point(&self, point: LonLat) -> BuildResult<Option<HierarchyPath>> {
        let cell = grid::cell_at(point)?;
        let owners = self.owners(cell);
        if owners.len() != 1 {
            return Ok(None);
        }
        Ok(owners.iter().next().and_then(|z| self.path_for(z, Some(cell))))
    }

    // ═════════════════════════════════════════════════════════════════
    // Validation
    // ═════════════════════════════════════════════════════════════════

    /// Check hierarchy invariants
    ///
    /// Reports, in order: cells with several owners, ZCTAs without cells,
    /// ZCTAs without an HSA, HSAs without an HRR, and ZCTAs whose population
    /// differs from their crosswalk total. Unresolved ZCTAs are exempt from
    /// the coverage and parent checks.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations: Vec<Violation> = self
            .duplicate_cells()
            .into_iter()
            .map(|(cell, owners)| Violation::DuplicateOwner { cell, owners })
            .collect();

        for zcta in self.orphan_zctas() {
            violations.push(Violation::EmptyZcta { zcta });
        }

        let mut referenced_hsas = BTreeSet::new();
        for record in self.zctas.values().filter(|r| !r.unresolved) {
            match &record.hsa {
                Some(hsa) => {
                    referenced_hsas.insert(hsa);
                }
                None => violations.push(Violation::MissingHsa {
                    zcta: record.zcta.clone(),
                }),
            }
        }
        for hsa in referenced_hsas {
            if !self.hsa_parent.contains_key(hsa) {
                violations.push(Violation::MissingHrr { hsa: hsa.clone() });
            }
        }

        let mut crosswalk_totals: BTreeMap<&ZctaId, u64> = BTreeMap::new();
        for ((_, zcta), pop) in &self.zip_rows {
            *crosswalk_totals.entry(zcta).or_default() += pop;
        }
        for (zcta, total) in crosswalk_totals {
            if let Some(record) = self.zctas.get(zcta) {
                if record.population != total {
                    violations.push(Violation::PopulationMismatch {
                        zcta: zcta.clone(),
                        recorded: record.population,
                        crosswalk: total,
                    });
                }
            }
        }

        violations
    }
}

// ═════════════════════════════════════════════════════════════════════
// Snapshot (JSON object keys must be strings, so maps are flattened)
// ═════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HsaParentRow {
    hsa: HsaId,
    hrr: HrrId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ZipRow {
    zip: ZipCode,
    zcta: ZctaId,
    population: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClaimRow {
    #[serde(with = "cell_serde")]
    cell: CellIndex,
    zcta: ZctaId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexSnapshot {
    zctas: Vec<ZctaRecord>,
    hsa_parents: Vec<HsaParentRow>,
    zips: Vec<ZipRow>,
    claims: Vec<ClaimRow>,
    #[serde(default)]
    pinned: Vec<ClaimRow>,
}

impl From<HierarchyIndex> for IndexSnapshot {
    fn from(index: HierarchyIndex) -> Self {
        let mut claims: Vec<ClaimRow> = index
            .claims
            .iter()
            .flat_map(|(cell, owners)| {
                owners.iter().map(move |zcta| ClaimRow {
                    cell: *cell,
                    zcta: zcta.clone(),
                })
            })
            .collect();
        claims.sort_unstable_by(|a, b| a.cell.cmp(&b.cell).then_with(|| a.zcta.cmp(&b.zcta)));

        let mut pinned: Vec<ClaimRow> = index
            .pinned
            .iter()
            .map(|(cell, zcta)| ClaimRow {
                cell: *cell,
                zcta: zcta.clone(),
            })
            .collect();
        pinned.sort_unstable_by_key(|row| row.cell);

        IndexSnapshot {
            zctas: index.zctas.into_values().collect(),
            hsa_parents: index
                .hsa_parent
                .into_iter()
                .map(|(hsa, hrr)| HsaParentRow { hsa, hrr })
                .collect(),
            zips: index
                .zip_rows
                .into_iter()
                .map(|((zip, zcta), population)| ZipRow {
                    zip,
                    zcta,
                    population,
                })
                .collect(),
            claims,
            pinned,
        }
    }
}

impl TryFrom<IndexSnapshot> for HierarchyIndex {
    type Error = BuildError;

    fn try_from(snapshot: IndexSnapshot) -> Result<Self, Self::Error> {
        let mut index = HierarchyIndex::new();
        for record in snapshot.zctas {
            index.register_zcta(record)?;
        }
        for row in snapshot.hsa_parents {
            index.hsa_parent.insert(row.hsa, row.hrr);
        }
        for row in snapshot.zips {
            index.add_zip(row.zip, &row.zcta, row.population)?;
        }
        for row in snapshot.claims {
            index.claim(row.cell, &row.zcta)?;
        }
        for row in snapshot.pinned {
            index.pin(row.cell, &row.zcta)?;
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(n: u32) -> Vec<CellIndex> {
        let origin = grid::cell_at(LonLat::new(-100.0, 40.0)).unwrap();
        grid::disk(origin, 2).into_iter().take(n as usize).collect()
    }

    fn index_with(zctas: &[&str]) -> HierarchyIndex {
        let mut index = HierarchyIndex::new();
        for z in zctas {
            index
                .register_zcta(ZctaRecord::new(ZctaId::from(*z), 1.0, 100, LonLat::new(-100.0, 40.0)))
                .unwrap();
            index
                .assign_region(&ZctaId::from(*z), HsaId::from("H1"), HrrId::from("R1"))
                .unwrap();
        }
        index
    }

    #[test]
    fn test_claim_tracks_both_directions() {
        let mut index = index_with(&["A", "B"]);
        let c = cells(1)[0];
        let a = ZctaId::from("A");
        let b = ZctaId::from("B");

        assert!(index.claim(c, &a).unwrap());
        assert!(!index.claim(c, &a).unwrap());
        assert!(index.claim(c, &b).unwrap());

        assert_eq!(index.owners(c).len(), 2);
        assert!(index.cells_of(&a).contains(&c));
        assert!(index.cells_of(&b).contains(&c));
        assert_eq!(index.duplicate_cells(), vec![(c, vec![a, b])]);
    }

    #[test]
    fn test_claim_for_unknown_zcta_fails() {
        let mut index = index_with(&["A"]);
        let result = index.claim(cells(1)[0], &ZctaId::from("Z"));
        assert!(matches!(result, Err(BuildError::UnknownZcta(_))));
    }

    #[test]
    fn test_commit_claims_is_all_or_nothing() {
        let mut index = index_with(&["A"]);
        let cs = cells(2);
        let batch = vec![(cs[0], ZctaId::from("A")), (cs[1], ZctaId::from("Z"))];
        assert!(index.commit_claims(&batch).is_err());
        assert_eq!(index.cell_count(), 0);
    }

    #[test]
    fn test_retain_owner_keeps_both_maps_consistent() {
        let mut index = index_with(&["A", "B", "C"]);
        let c = cells(1)[0];
        for z in ["A", "B", "C"] {
            index.claim(c, &ZctaId::from(z)).unwrap();
        }

        let removed = index.retain_owner(c, &ZctaId::from("B"));
        assert_eq!(removed, vec![ZctaId::from("A"), ZctaId::from("C")]);
        assert_eq!(index.owners(c).len(), 1);
        assert!(index.cells_of(&ZctaId::from("A")).is_empty());
        assert!(index.cells_of(&ZctaId::from("C")).is_empty());
    }

    #[test]
    fn test_release_clears_pin() {
        let mut index = index_with(&["A"]);
        let c = cells(1)[0];
        let a = ZctaId::from("A");
        index.claim(c, &a).unwrap();
        index.pin(c, &a).unwrap();
        assert_eq!(index.pinned_owner(c), Some(&a));
        assert!(index.release(c, &a));
        assert_eq!(index.pinned_owner(c), None);
        assert!(index.owners(c).is_empty());
    }

    #[test]
    fn test_conflicting_parent_keeps_first() {
        let mut index = index_with(&["A", "B"]);
        let result = index.assign_region(&ZctaId::from("B"), HsaId::from("H1"), HrrId::from("R2"));
        assert!(matches!(result, Err(BuildError::ConflictingParent { .. })));
        assert_eq!(index.hrr_of_hsa(&HsaId::from("H1")), Some(&HrrId::from("R1")));
    }

    #[test]
    fn test_validate_reports_each_kind() {
        let mut index = index_with(&["A", "B"]);
        index
            .register_zcta(ZctaRecord::new(ZctaId::from("C"), 1.0, 10, LonLat::new(-100.0, 40.0)))
            .unwrap();
        let cs = cells(2);
        index.claim(cs[0], &ZctaId::from("A")).unwrap();
        index.claim(cs[0], &ZctaId::from("B")).unwrap();
        index.claim(cs[1], &ZctaId::from("C")).unwrap();
        index.add_zip(ZipCode::from("00001"), &ZctaId::from("A"), 99).unwrap();

        let violations = index.validate();
        assert!(matches!(violations[0], Violation::DuplicateOwner { .. }));
        assert!(violations.contains(&Violation::MissingHsa { zcta: ZctaId::from("C") }));
        assert!(violations.contains(&Violation::PopulationMismatch {
            zcta: ZctaId::from("A"),
            recorded: 100,
            crosswalk: 99,
        }));
        // B still has its contested cell
        assert!(!violations.contains(&Violation::EmptyZcta { zcta: ZctaId::from("B") }));
    }

    #[test]
    fn test_unresolved_zcta_is_exempt() {
        let mut index = HierarchyIndex::new();
        let z = ZctaId::from("99999");
        index
            .register_zcta(ZctaRecord::new(z.clone(), 1.0, 0, LonLat::new(-150.0, 60.0)))
            .unwrap();
        assert_eq!(index.validate().len(), 2);
        index.mark_unresolved(&z).unwrap();
        assert!(index.validate().is_empty());
        assert!(index.orphan_zctas().is_empty());
    }

    #[test]
    fn test_resolve_zip_and_point() {
        let mut index = index_with(&["A", "B"]);
        let c = grid::cell_at(LonLat::new(-100.0, 40.0)).unwrap();
        index.claim(c, &ZctaId::from("A")).unwrap();
        index.add_zip(ZipCode::from("12345"), &ZctaId::from("A"), 10).unwrap();
        index.add_zip(ZipCode::from("12345"), &ZctaId::from("B"), 90).unwrap();

        let by_zip = index.resolve_zip(&ZipCode::from("12345")).unwrap();
        assert_eq!(by_zip.zcta, ZctaId::from("B"));
        assert_eq!(by_zip.hrr, Some(HrrId::from("R1")));

        let by_point = index.resolve_point(LonLat::new(-100.0, 40.0)).unwrap().unwrap();
        assert_eq!(by_point.zcta, ZctaId::from("A"));
        assert_eq!(by_point.cell, Some(c));
        assert!(index.resolve_zip(&ZipCode::from("00000")).is_none());
    }

    #[test]
    fn test_snapshot_preserves_claims_and_pins() {
        let mut index = index_with(&["A", "B"]);
        let cs = cells(3);
        index.claim(cs[0], &ZctaId::from("A")).unwrap();
        index.claim(cs[1], &ZctaId::from("B")).unwrap();
        index.claim(cs[1], &ZctaId::from("A")).unwrap();
        index.pin(cs[1], &ZctaId::from("A")).unwrap();
        index.add_zip(ZipCode::from("11111"), &ZctaId::from("A"), 100).unwrap();

        let json = serde_json::to_string(&index).unwrap();
        let restored: HierarchyIndex = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.owners(cs[1]), index.owners(cs[1]));
        assert_eq!(restored.pinned_owner(cs[1]), Some(&ZctaId::from("A")));
        assert_eq!(restored.cells_of(&ZctaId::from("A")), index.cells_of(&ZctaId::from("A")));
        assert_eq!(restored.validate(), index.validate());
    }
}
