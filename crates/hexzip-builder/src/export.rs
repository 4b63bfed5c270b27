// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Export tables derived from a repaired hierarchy.

Each table is written as a JSON array to its own file under the output
directory. All tables are sorted by their leading key so that repeated
builds of the same input produce identical files.
*/

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::index::HierarchyIndex;
use crate::types::{BuildError, BuildResult, HrrId, HsaId, ZctaId, ZipCode};

/// Cell → ZCTA → HSA → HRR, unique on `cell_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellAssignment {
    pub cell_id: String,
    pub zcta_id: ZctaId,
    pub hsa_id: Option<HsaId>,
    pub hrr_id: Option<HrrId>,
}

/// Deduplicated ZIP → ZCTA crosswalk row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZipZctaRow {
    pub zip: ZipCode,
    pub zcta: ZctaId,
    pub population: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZctaCells {
    pub zcta_id: ZctaId,
    pub cell_ids: Vec<String>,
    pub hsa_id: Option<HsaId>,
    pub hrr_id: Option<HrrId>,
    pub population: u64,
    pub area_km2: f64,
    pub unresolved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HsaRegion {
    pub region_id: HsaId,
    pub cell_ids: Vec<String>,
    pub member_zcta_ids: Vec<ZctaId>,
    pub hrr_id: HrrId,
    pub population: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HrrRegion {
    pub region_id: HrrId,
    pub cell_ids: Vec<String>,
    pub member_zcta_ids: Vec<ZctaId>,
    pub member_hsa_ids: Vec<HsaId>,
    pub population: u64,
}

/// Per-ZCTA ZIP summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZctaSummary {
    pub zcta_id: ZctaId,
    /// ZIP with the largest population weight
    pub primary_zip: Option<ZipCode>,
    pub zips: Vec<ZipCode>,
    /// Exactly one ZIP maps to this ZCTA
    pub is_simple: bool,
    pub population: u64,
    pub hsa_id: Option<HsaId>,
    pub hrr_id: Option<HrrId>,
    pub cell_count: usize,
}

/// ZIP → cells of its ZCTA
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZipCells {
    pub zip: ZipCode,
    pub zcta_id: ZctaId,
    pub cell_ids: Vec<String>,
}

/// All export tables
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportBundle {
    pub assignments: Vec<CellAssignment>,
    pub zip_zcta: Vec<ZipZctaRow>,
    pub zcta_cells: Vec<ZctaCells>,
    pub hsa_regions: Vec<HsaRegion>,
    pub hrr_regions: Vec<HrrRegion>,
    pub zcta_summary: Vec<ZctaSummary>,
    pub zip_cells: Vec<ZipCells>,
}

impl ExportBundle {
    /// Derive the tables; a hierarchy with contested cells cannot be exported
    pub fn from_index(index: &HierarchyIndex) -> BuildResult<Self> {
        let remaining = index.duplicate_cells().len();
        if remaining > 0 {
            return Err(BuildError::UnresolvedDuplicates { remaining });
        }

        let hrr_of = |hsa: &Option<HsaId>| hsa.as_ref().and_then(|h| index.hrr_of_hsa(h)).cloned();
        let cell_strings = |zcta: &ZctaId| -> Vec<String> {
            index.cells_of(zcta).iter().map(|c| c.to_string()).collect()
        };

        let assignments = index
            .assignments()
            .into_iter()
            .map(|(cell, zcta)| {
                let hsa = index.zcta(zcta).and_then(|r| r.hsa.clone());
                CellAssignment {
                    cell_id: cell.to_string(),
                    zcta_id: zcta.clone(),
                    hrr_id: hrr_of(&hsa),
                    hsa_id: hsa,
                }
            })
            .collect();

        let zip_zcta: Vec<ZipZctaRow> = index
            .zip_rows()
            .map(|(zip, zcta, population)| ZipZctaRow {
                zip: zip.clone(),
                zcta: zcta.clone(),
                population,
            })
            .collect();

        let zcta_cells = index
            .zctas()
            .map(|r| ZctaCells {
                zcta_id: r.zcta.clone(),
                cell_ids: cell_strings(&r.zcta),
                hsa_id: r.hsa.clone(),
                hrr_id: hrr_of(&r.hsa),
                population: r.population,
                area_km2: r.area_km2,
                unresolved: r.unresolved,
            })
            .collect();

        let mut hsa_members: BTreeMap<&HsaId, Vec<ZctaId>> = BTreeMap::new();
        for record in index.zctas() {
            if let Some(hsa) = &record.hsa {
                hsa_members.entry(hsa).or_default().push(record.zcta.clone());
            }
        }
        let hsa_regions: Vec<HsaRegion> = index
            .hsa_parents()
            .map(|(hsa, hrr)| {
                let members = hsa_members.remove(hsa).unwrap_or_default();
                HsaRegion {
                    region_id: hsa.clone(),
                    cell_ids: member_cells(index, &members),
                    hrr_id: hrr.clone(),
                    population: members
                        .iter()
                        .filter_map(|z| index.zcta(z))
                        .map(|r| r.population)
                        .sum(),
                    member_zcta_ids: members,
                }
            })
            .collect();

        let mut by_hrr: BTreeMap<HrrId, Vec<&HsaRegion>> = BTreeMap::new();
        for region in &hsa_regions {
            by_hrr.entry(region.hrr_id.clone()).or_default().push(region);
        }
        let hrr_regions = by_hrr
            .into_iter()
            .map(|(hrr, members)| {
                let zctas: Vec<ZctaId> = members
                    .iter()
                    .flat_map(|m| m.member_zcta_ids.iter().cloned())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                HrrRegion {
                    region_id: hrr,
                    cell_ids: member_cells(index, &zctas),
                    member_zcta_ids: zctas,
                    member_hsa_ids: members.iter().map(|m| m.region_id.clone()).collect(),
                    population: members.iter().map(|m| m.population).sum(),
                }
            })
            .collect();

        let mut zips_by_zcta: BTreeMap<&ZctaId, Vec<&ZipZctaRow>> = BTreeMap::new();
        for row in &zip_zcta {
            zips_by_zcta.entry(&row.zcta).or_default().push(row);
        }
        let zcta_summary = index
            .zctas()
            .map(|r| {
                let rows = zips_by_zcta.get(&r.zcta).map(Vec::as_slice).unwrap_or(&[]);
                let primary_zip = rows
                    .iter()
                    .max_by(|a, b| a.population.cmp(&b.population).then_with(|| b.zip.cmp(&a.zip)))
                    .map(|row| row.zip.clone());
                ZctaSummary {
                    zcta_id: r.zcta.clone(),
                    primary_zip,
                    zips: rows.iter().map(|row| row.zip.clone()).collect(),
                    is_simple: rows.len() == 1,
                    population: r.population,
                    hsa_id: r.hsa.clone(),
                    hrr_id: hrr_of(&r.hsa),
                    cell_count: index.cells_of(&r.zcta).len(),
                }
            })
            .collect();

        let zip_cells = zip_zcta
            .iter()
            .map(|row| ZipCells {
                zip: row.zip.clone(),
                zcta_id: row.zcta.clone(),
                cell_ids: cell_strings(&row.zcta),
            })
            .collect();

        Ok(Self {
            assignments,
            zip_zcta,
            zcta_cells,
            hsa_regions,
            hrr_regions,
            zcta_summary,
            zip_cells,
        })
    }

    /// Write one JSON file per table; returns the files written
    pub fn write_to_dir(&self, dir: &Path, pretty: bool) -> BuildResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let files = vec![
            write_table(dir, "assignments.json", &self.assignments, pretty)?,
            write_table(dir, "zip_zcta.json", &self.zip_zcta, pretty)?,
            write_table(dir, "zcta_cells.json", &self.zcta_cells, pretty)?,
            write_table(dir, "hsa_regions.json", &self.hsa_regions, pretty)?,
            write_table(dir, "hrr_regions.json", &self.hrr_regions, pretty)?,
            write_table(dir, "zcta_summary.json", &self.zcta_summary, pretty)?,
            write_table(dir, "zip_cells.json", &self.zip_cells, pretty)?,
        ];
        info!(target: "hexzip-builder", "💾 Wrote {} export tables to {}", files.len(), dir.display());
        Ok(files)
    }
}

/// Sorted cell ids owned by any of `zctas`
fn member_cells(index: &HierarchyIndex, zctas: &[ZctaId]) -> Vec<String> {
    let cells: BTreeSet<_> = zctas.iter().flat_map(|z| index.cells_of(z).iter().copied()).collect();
    cells.into_iter().map(|c| c.to_string()).collect()
}

fn write_table<T: Serialize>(dir: &Path, name: &str, rows: &T, pretty: bool) -> BuildResult<PathBuf> {
    let path = dir.join(name);
    let json = if pretty {
        serde_json::to_string_pretty(rows)?
    } else {
        serde_json::to_string(rows)?
    };
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Persist the index as a JSON snapshot
pub fn save_index(index: &HierarchyIndex, path: &Path, pretty: bool) -> BuildResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = if pretty {
        serde_json::to_string_pretty(index)?
    } else {
        serde_json::to_string(index)?
    };
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_index(path: &Path) -> BuildResult<HierarchyIndex> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
