// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Input tables for a build.

- ZCTA boundaries: a GeoJSON `FeatureCollection`; each feature's
  `properties` carry `zcta`, `population` and optionally `area_km2` and
  `centroid` (`{"lon": .., "lat": ..}`).
- ZIP crosswalk: a JSON array of `{"zip", "zcta", "population"}`.
- Region table: a JSON array of `{"zcta", "hsa", "hrr"}`.

A feature that cannot be turned into a [`Geometry`] is skipped and
reported; a file that is not valid JSON is an error.
*/

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::audit::SkippedItem;
use crate::geometry::{Geometry, GeometryRecord, Shape};
use crate::types::{BuildResult, HrrId, HsaId, ZctaId, ZipCode};

/// One row of the ZIP → ZCTA crosswalk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZipZctaRecord {
    #[serde(alias = "ZIP_CODE")]
    pub zip: ZipCode,
    #[serde(alias = "ZCTA")]
    pub zcta: ZctaId,
    /// Population weight of this ZIP within the ZCTA
    #[serde(default)]
    pub population: Option<u64>,
}

/// ZCTA → HSA → HRR assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub zcta: ZctaId,
    #[serde(alias = "hsanum")]
    pub hsa: HsaId,
    #[serde(alias = "hrrnum")]
    pub hrr: HrrId,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<serde_json::Value>,
}

/// Geometries read from a boundary file plus the features that were rejected
#[derive(Debug, Default)]
pub struct LoadedGeometries {
    pub geometries: Vec<Geometry>,
    pub rejected: Vec<SkippedItem>,
}

fn feature_label(position: usize, value: &serde_json::Value) -> String {
    ["zcta", "ZCTA5CE20", "zcta5"]
        .iter()
        .find_map(|k| value.get("properties")?.get(*k)?.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("feature #{}", position))
}

fn parse_feature(position: usize, value: serde_json::Value) -> Result<Geometry, SkippedItem> {
    let label = feature_label(position, &value);
    let skip = |reason: String| SkippedItem::new(label.clone(), reason);

    let feature = geojson::Feature::from_json_value(value).map_err(|e| skip(e.to_string()))?;
    let properties = feature.properties.unwrap_or_default();
    let record: GeometryRecord = serde_json::from_value(serde_json::Value::Object(properties))
        .map_err(|e| skip(e.to_string()))?;
    let shape = feature
        .geometry
        .ok_or_else(|| skip("feature has no geometry".to_string()))
        .and_then(|g| Shape::try_from(g).map_err(skip))?;
    record
        .into_geometry(shape)
        .map_err(|e| skip(e.to_string()))
}

/// Parse a GeoJSON feature collection
pub fn parse_geometries(json: &str) -> BuildResult<LoadedGeometries> {
    let collection: FeatureCollection = serde_json::from_str(json)?;
    let mut loaded = LoadedGeometries::default();
    for (position, value) in collection.features.into_iter().enumerate() {
        match parse_feature(position, value) {
            Ok(geometry) => loaded.geometries.push(geometry),
            Err(skipped) => {
                warn!(target: "hexzip-builder", "Skipping {}: {}", skipped.item, skipped.reason);
                loaded.rejected.push(skipped);
            }
        }
    }
    Ok(loaded)
}

pub fn load_geometries(path: &Path) -> BuildResult<LoadedGeometries> {
    let loaded = parse_geometries(&std::fs::read_to_string(path)?)?;
    info!(target: "hexzip-builder",
        "📂 Loaded {} geometries from {} ({} rejected)",
        loaded.geometries.len(),
        path.display(),
        loaded.rejected.len()
    );
    Ok(loaded)
}

pub fn load_zip_crosswalk(path: &Path) -> BuildResult<Vec<ZipZctaRecord>> {
    let rows: Vec<ZipZctaRecord> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    info!(target: "hexzip-builder", "📂 Loaded {} ZIP crosswalk rows from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn load_regions(path: &Path) -> BuildResult<Vec<RegionRecord>> {
    let rows: Vec<RegionRecord> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    info!(target: "hexzip-builder", "📂 Loaded {} region rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Polygon", "coordinates": [[[-100.0, 40.0], [-99.9, 40.0], [-99.9, 40.1], [-100.0, 40.1], [-100.0, 40.0]]]},
                "properties": {"ZCTA5CE20": "68001", "pop_total": 1200}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-100.0, 40.0]},
                "properties": {"zcta": "68002", "population": 5}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Polygon", "coordinates": "garbage"},
                "properties": {"zcta": "68003"}
            }
        ]
    }"#;

    #[test]
    fn test_parse_geometries_skips_bad_features() {
        let loaded = parse_geometries(COLLECTION).unwrap();
        assert_eq!(loaded.geometries.len(), 1);
        assert_eq!(loaded.geometries[0].zcta, ZctaId::from("68001"));
        assert_eq!(loaded.geometries[0].population, 1200);
        assert!(loaded.geometries[0].area_km2 > 0.0);

        // The point has no usable centroid source, the third feature is malformed
        let skipped: Vec<&str> = loaded.rejected.iter().map(|s| s.item.as_str()).collect();
        assert_eq!(skipped, vec!["68002", "68003"]);
    }

    #[test]
    fn test_multipolygon_with_hole_and_null_geometry() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "MultiPolygon", "coordinates": [
                        [[[-100.0, 40.0], [-99.0, 40.0], [-99.0, 41.0], [-100.0, 41.0], [-100.0, 40.0]],
                         [[-99.75, 40.25], [-99.25, 40.25], [-99.25, 40.75], [-99.75, 40.75], [-99.75, 40.25]]],
                        [[[-98.0, 40.0], [-97.9, 40.0], [-97.9, 40.1], [-98.0, 40.0]]]
                    ]},
                    "properties": {"zcta": "68010", "population": 300}
                },
                {
                    "type": "Feature",
                    "geometry": null,
                    "properties": {"zcta": "68011"}
                }
            ]
        }"#;
        let loaded = parse_geometries(json).unwrap();
        assert_eq!(loaded.geometries.len(), 1);
        assert_eq!(loaded.geometries[0].shape.polygons().len(), 2);
        assert_eq!(loaded.geometries[0].shape.polygons()[0].interiors().len(), 1);
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.rejected[0].item, "68011");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(parse_geometries("{not json").is_err());
    }

    #[test]
    fn test_crosswalk_and_regions_files() {
        let dir = tempfile::tempdir().unwrap();
        let zips = dir.path().join("zips.json");
        let regions = dir.path().join("regions.json");
        std::fs::write(&zips, r#"[{"zip": "68001", "zcta": "68001", "population": 1200}, {"zip": "68099", "zcta": "68001"}]"#).unwrap();
        std::fs::write(&regions, r#"[{"zcta": "68001", "hsanum": "28001", "hrrnum": "277"}]"#).unwrap();

        let rows = load_zip_crosswalk(&zips).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].population, None);

        let regions = load_regions(&regions).unwrap();
        assert_eq!(regions[0].hsa, HsaId::from("28001"));
        assert_eq!(regions[0].hrr, HrrId::from("277"));
    }
}
