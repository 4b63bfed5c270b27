// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
ZCTA boundary geometry and the attribute record that travels with it.

Shapes are parsed from GeoJSON geometries into `geo` polygons. Positions
are `[lng, lat]` in degrees. Only `Polygon` and `MultiPolygon` are
rasterizable; any other type is kept as [`Shape::Unsupported`] so that the
rasterizer can report it instead of failing the whole input file.
*/

use geo::{Area, Centroid, CoordsIter, GeodesicArea, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::types::{BuildError, BuildResult, ZctaId};

/// Polygons below this planar area (deg²) are treated as zero-area
const DEGENERATE_AREA_DEG2: f64 = 1e-14;

/// A point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    pub fn ensure_valid(&self) -> BuildResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(BuildError::InvalidCoordinate {
                lat: self.lat,
                lng: self.lon,
            })
        }
    }
}

impl From<Point<f64>> for LonLat {
    fn from(point: Point<f64>) -> Self {
        Self::new(point.x(), point.y())
    }
}

/// Every vertex of the polygon, holes included, is a valid lng/lat
pub fn ensure_valid(polygon: &Polygon<f64>) -> BuildResult<()> {
    polygon
        .coords_iter()
        .try_for_each(|c| LonLat::new(c.x, c.y).ensure_valid())
}

/// Fewer than three distinct vertices, or no planar area
pub fn is_degenerate(polygon: &Polygon<f64>) -> bool {
    polygon.exterior().0.len() < 4 || polygon.unsigned_area() < DEGENERATE_AREA_DEG2
}

/// Boundary shape of a ZCTA
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "geojson::Geometry")]
pub enum Shape {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
    /// Geometry type the rasterizer cannot handle (Point, LineString, ...)
    Unsupported { kind: String },
}

impl Shape {
    /// Shape type name as it appears in GeoJSON
    pub fn kind(&self) -> &str {
        match self {
            Shape::Polygon(_) => "Polygon",
            Shape::MultiPolygon(_) => "MultiPolygon",
            Shape::Unsupported { kind } => kind,
        }
    }

    /// Polygons making up the shape (empty for unsupported shapes)
    pub fn polygons(&self) -> &[Polygon<f64>] {
        match self {
            Shape::Polygon(p) => std::slice::from_ref(p),
            Shape::MultiPolygon(mp) => &mp.0,
            Shape::Unsupported { .. } => &[],
        }
    }

    pub fn ensure_valid(&self) -> BuildResult<()> {
        self.polygons().iter().try_for_each(ensure_valid)
    }

    /// Geodesic area in km², holes excluded
    pub fn area_km2(&self) -> f64 {
        self.polygons()
            .iter()
            .map(|p| p.geodesic_area_unsigned())
            .sum::<f64>()
            / 1_000_000.0
    }

    /// Area-weighted centroid; zero-area shapes fall back to their outline
    pub fn centroid(&self) -> Option<LonLat> {
        match self {
            Shape::Polygon(p) => p.centroid(),
            Shape::MultiPolygon(mp) => mp.centroid(),
            Shape::Unsupported { .. } => None,
        }
        .map(LonLat::from)
    }
}

fn kind_name(value: &geojson::Value) -> &'static str {
    #[allow(unreachable_patterns)]
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
        _ => "Geometry",
    }
}

impl TryFrom<geojson::Geometry> for Shape {
    type Error = String;

    fn try_from(geometry: geojson::Geometry) -> Result<Self, Self::Error> {
        match geometry.value {
            value @ geojson::Value::Polygon(_) => Polygon::try_from(value)
                .map(Shape::Polygon)
                .map_err(|e| format!("malformed Polygon: {}", e)),
            value @ geojson::Value::MultiPolygon(_) => MultiPolygon::try_from(value)
                .map(Shape::MultiPolygon)
                .map_err(|e| format!("malformed MultiPolygon: {}", e)),
            other => Ok(Shape::Unsupported {
                kind: kind_name(&other).to_string(),
            }),
        }
    }
}

/// One ZCTA boundary with the attributes used for scoring
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub zcta: ZctaId,
    pub shape: Shape,
    pub area_km2: f64,
    pub population: u64,
    pub centroid: LonLat,
}

impl Geometry {
    /// Create a geometry, deriving area and centroid from the shape
    pub fn from_shape(zcta: ZctaId, shape: Shape, population: u64) -> BuildResult<Self> {
        GeometryRecord {
            zcta,
            population,
            area_km2: None,
            centroid: None,
        }
        .into_geometry(shape)
    }
}

/// Feature properties read alongside a boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryRecord {
    #[serde(alias = "ZCTA5CE20", alias = "zcta5")]
    pub zcta: ZctaId,
    #[serde(default, alias = "pop_total", alias = "POP")]
    pub population: u64,
    /// Land area in km²; computed from the shape when absent
    #[serde(default)]
    pub area_km2: Option<f64>,
    /// Representative point; computed from the shape when absent
    #[serde(default)]
    pub centroid: Option<LonLat>,
}

impl GeometryRecord {
    pub fn into_geometry(self, shape: Shape) -> BuildResult<Geometry> {
        let invalid = |reason: String| BuildError::InvalidGeometry {
            zcta: self.zcta.to_string(),
            reason,
        };

        let centroid = match self.centroid {
            Some(c) => c,
            None => shape
                .centroid()
                .ok_or_else(|| invalid("no centroid given and none derivable".to_string()))?,
        };
        if !centroid.is_valid() {
            return Err(invalid(format!(
                "centroid out of range ({}, {})",
                centroid.lon, centroid.lat
            )));
        }

        let area_km2 = match self.area_km2 {
            Some(area) => area,
            None => {
                shape.ensure_valid().map_err(|e| invalid(e.to_string()))?;
                shape.area_km2()
            }
        };
        if !area_km2.is_finite() || area_km2 < 0.0 {
            return Err(invalid(format!("invalid area {}", area_km2)));
        }

        Ok(Geometry {
            zcta: self.zcta,
            shape,
            area_km2,
            population: self.population,
            centroid,
        })
    }
}
