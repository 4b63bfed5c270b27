// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Polygon to H3 cell rasterization.

A cell belongs to a geometry when its center point lies inside the
geometry (inside the exterior ring, outside every hole). Coverage is
computed by the h3o polygon tiler in centroid-containment mode.
*/

use h3o::geom::{ContainmentMode, TilerBuilder};
use h3o::CellIndex;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::geometry::{self, Geometry, Shape};
use crate::grid::CELL_RESOLUTION;
use crate::types::{BuildError, BuildResult};

/// Non-fatal conditions reported alongside a (possibly empty) cell set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterWarning {
    UnsupportedShape { kind: String },
    Degenerate,
}

/// Cells covering one geometry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasterOutcome {
    pub cells: BTreeSet<CellIndex>,
    pub warning: Option<RasterWarning>,
}

/// Converts boundary shapes into cell sets
#[derive(Debug, Clone, Copy, Default)]
pub struct Rasterizer;

impl Rasterizer {
    pub fn new() -> Self {
        Self
    }

    /// Rasterize a ZCTA geometry
    ///
    /// Unsupported shape types yield an empty set with a warning; malformed
    /// coordinates are an error for this geometry only.
    pub fn rasterize(&self, geometry: &Geometry) -> BuildResult<RasterOutcome> {
        let outcome = self.rasterize_shape(&geometry.shape).map_err(|e| match e {
            BuildError::InvalidCoordinate { lat, lng } => BuildError::InvalidGeometry {
                zcta: geometry.zcta.to_string(),
                reason: format!("coordinate out of range (lat={}, lng={})", lat, lng),
            },
            BuildError::InvalidGeometry { reason, .. } => BuildError::InvalidGeometry {
                zcta: geometry.zcta.to_string(),
                reason,
            },
            other => other,
        })?;

        match &outcome.warning {
            Some(RasterWarning::UnsupportedShape { kind }) => {
                warn!(target: "hexzip-builder", "ZCTA {}: unsupported geometry type {}, no cells", geometry.zcta, kind);
            }
            Some(RasterWarning::Degenerate) => {
                debug!(target: "hexzip-builder", "ZCTA {}: zero-area geometry, no cells", geometry.zcta);
            }
            None if outcome.cells.is_empty() => {
                debug!(target: "hexzip-builder", "ZCTA {}: no cell center inside geometry", geometry.zcta);
            }
            None => {}
        }
        Ok(outcome)
    }

    /// Rasterize a bare shape
    pub fn rasterize_shape(&self, shape: &Shape) -> BuildResult<RasterOutcome> {
        let mut outcome = RasterOutcome::default();
        if let Shape::Unsupported { kind } = shape {
            outcome.warning = Some(RasterWarning::UnsupportedShape { kind: kind.clone() });
            return Ok(outcome);
        }

        let mut tiler = TilerBuilder::new(CELL_RESOLUTION)
            .containment_mode(ContainmentMode::ContainsCentroid)
            .build();
        let mut filled_any = false;
        for polygon in shape.polygons() {
            geometry::ensure_valid(polygon)?;
            if geometry::is_degenerate(polygon) {
                continue;
            }
            tiler
                .add(polygon.clone())
                .map_err(|e| BuildError::InvalidGeometry {
                    zcta: String::new(),
                    reason: e.to_string(),
                })?;
            filled_any = true;
        }
        if !filled_any {
            outcome.warning = Some(RasterWarning::Degenerate);
            return Ok(outcome);
        }

        outcome.cells = tiler.into_coverage().collect();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LonLat;
    use crate::grid::{cell_at, cell_center, cell_polygon, disk};
    use geo::{polygon, MultiPolygon, Polygon};

    fn origin() -> CellIndex {
        cell_at(LonLat::new(-100.0, 40.0)).unwrap()
    }

    fn hexagons(cells: &[CellIndex]) -> Shape {
        Shape::MultiPolygon(MultiPolygon(cells.iter().copied().map(cell_polygon).collect()))
    }

    #[test]
    fn test_single_hexagon_yields_its_cell() {
        let cell = origin();
        let outcome = Rasterizer::new()
            .rasterize_shape(&Shape::Polygon(cell_polygon(cell)))
            .unwrap();
        assert_eq!(outcome.cells.into_iter().collect::<Vec<_>>(), vec![cell]);
        assert!(outcome.warning.is_none());
    }

    #[test]
    fn test_disk_of_hexagons_yields_disk() {
        let cells = disk(origin(), 2);
        let outcome = Rasterizer::new().rasterize_shape(&hexagons(&cells)).unwrap();
        assert_eq!(outcome.cells.into_iter().collect::<Vec<_>>(), cells);
    }

    #[test]
    fn test_hole_excludes_cells() {
        let center = origin();
        let c = cell_center(center);
        let outer = polygon![
            (x: c.lon - 0.1, y: c.lat - 0.1),
            (x: c.lon + 0.1, y: c.lat - 0.1),
            (x: c.lon + 0.1, y: c.lat + 0.1),
            (x: c.lon - 0.1, y: c.lat + 0.1),
        ];
        let hole = cell_polygon(center).exterior().clone();
        let with_hole = Shape::Polygon(Polygon::new(outer.exterior().clone(), vec![hole]));
        let without_hole = Shape::Polygon(outer);

        let r = Rasterizer::new();
        let full = r.rasterize_shape(&without_hole).unwrap().cells;
        let holed = r.rasterize_shape(&with_hole).unwrap().cells;
        assert!(full.contains(&center));
        assert!(!holed.contains(&center));
        assert_eq!(full.len(), holed.len() + 1);
    }

    #[test]
    fn test_shape_crossing_antimeridian() {
        let west = cell_at(LonLat::new(179.98, 10.0)).unwrap();
        let east = cell_at(LonLat::new(-179.98, 10.0)).unwrap();
        let strip = polygon![
            (x: 179.9, y: 9.9),
            (x: -179.9, y: 9.9),
            (x: -179.9, y: 10.1),
            (x: 179.9, y: 10.1),
        ];
        let cells = Rasterizer::new()
            .rasterize_shape(&Shape::Polygon(strip))
            .unwrap()
            .cells;
        assert!(cells.contains(&west));
        assert!(cells.contains(&east));
        // A strip 0.2° wide must not wrap the globe
        assert!(cells.len() < 1_000, "{} cells", cells.len());
    }

    #[test]
    fn test_unsupported_shape_warns() {
        let outcome = Rasterizer::new()
            .rasterize_shape(&Shape::Unsupported { kind: "LineString".into() })
            .unwrap();
        assert!(outcome.cells.is_empty());
        assert_eq!(
            outcome.warning,
            Some(RasterWarning::UnsupportedShape { kind: "LineString".into() })
        );
    }

    #[test]
    fn test_degenerate_polygon_is_empty() {
        let line = polygon![(x: -100.0, y: 40.0), (x: -99.9, y: 40.0), (x: -99.8, y: 40.0)];
        let outcome = Rasterizer::new()
            .rasterize_shape(&Shape::Polygon(line))
            .unwrap();
        assert!(outcome.cells.is_empty());
        assert_eq!(outcome.warning, Some(RasterWarning::Degenerate));
    }

    #[test]
    fn test_out_of_range_coordinates_fail() {
        let bad = polygon![(x: -100.0, y: 95.0), (x: -99.0, y: 95.0), (x: -99.0, y: 96.0)];
        let result = Rasterizer::new().rasterize_shape(&Shape::Polygon(bad));
        assert!(matches!(result, Err(BuildError::InvalidCoordinate { .. })));
    }

    #[test]
    fn test_rasterize_is_idempotent() {
        let shape = hexagons(&disk(origin(), 1));
        let r = Rasterizer::new();
        assert_eq!(
            r.rasterize_shape(&shape).unwrap(),
            r.rasterize_shape(&shape).unwrap()
        );
    }
}
