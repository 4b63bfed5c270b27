// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
H3 grid helpers at the fixed build resolution.
*/

use geo::{LineString, Polygon};
use h3o::{CellIndex, LatLng, Resolution};

use crate::geometry::LonLat;
use crate::types::{BuildError, BuildResult};

/// Every cell in the hierarchy lives at this resolution (~5.16 km² per cell)
pub const CELL_RESOLUTION: Resolution = Resolution::Seven;

/// Average hexagon edge length at [`CELL_RESOLUTION`]
pub const CELL_EDGE_KM: f64 = 1.406_475_763;

const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Cell containing a point
pub fn cell_at(point: LonLat) -> BuildResult<CellIndex> {
    let ll = LatLng::new(point.lat, point.lon).map_err(|_| BuildError::InvalidCoordinate {
        lat: point.lat,
        lng: point.lon,
    })?;
    Ok(ll.to_cell(CELL_RESOLUTION))
}

/// Center point of a cell
pub fn cell_center(cell: CellIndex) -> LonLat {
    let ll = LatLng::from(cell);
    LonLat::new(ll.lng_radians().to_degrees(), ll.lat_radians().to_degrees())
}

/// Boundary vertices of a cell (open ring)
pub fn cell_boundary(cell: CellIndex) -> Vec<LonLat> {
    cell.boundary()
        .iter()
        .map(|v| LonLat::new(v.lng_radians().to_degrees(), v.lat_radians().to_degrees()))
        .collect()
}

/// Cell outline as a polygon in degrees
pub fn cell_polygon(cell: CellIndex) -> Polygon<f64> {
    let ring: Vec<(f64, f64)> = cell_boundary(cell).iter().map(|p| (p.lon, p.lat)).collect();
    Polygon::new(LineString::from(ring), vec![])
}

/// Cells within `k` grid steps of `origin` (origin included)
pub fn disk(origin: CellIndex, k: u32) -> Vec<CellIndex> {
    let mut cells: Vec<CellIndex> = origin.grid_disk_safe(k).collect();
    cells.sort_unstable();
    cells.dedup();
    cells
}

/// Number of rings needed to cover `radius_km` around a cell
pub fn rings_for_radius(radius_km: f64) -> u32 {
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return 1;
    }
    ((radius_km / CELL_EDGE_KM).ceil() as u32).max(1)
}

/// Great-circle distance in km
pub fn haversine_km(a: LonLat, b: LonLat) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Parse a cell from its hexadecimal form
pub fn parse_cell(text: &str) -> BuildResult<CellIndex> {
    text.parse::<CellIndex>()
        .map_err(|e| BuildError::InvalidCell(format!("{}: {}", text, e)))
}

/// Serde adapter storing cells as their hexadecimal string
pub mod cell_serde {
    use h3o::CellIndex;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(cell: &CellIndex, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(cell)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CellIndex, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse::<CellIndex>().map_err(serde::de::Error::custom)
    }
}
