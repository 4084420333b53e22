//! Geometry boundary: WKT parsing, reprojection and polygon conversion.

use std::str::FromStr;

use geo::{Coord, Geometry, MapCoords, MultiPolygon};
use thiserror::Error;
use wkt::{ToWkt, Wkt};

/// EPSG code of geographic WGS84 coordinates.
pub const EPSG_WGS84: i32 = 4326;
/// EPSG code of spherical web-mercator coordinates.
pub const EPSG_WEB_MERCATOR: i32 = 3857;

const MERCATOR_HALF_WORLD: f64 = 20_037_508.342_789_244;

#[derive(Debug, Error, Clone)]
pub enum GeometryError {
    #[error("invalid area wkt: {0}")]
    InvalidWkt(String),

    #[error("no transform available from EPSG:{from} to EPSG:{to}")]
    UnsupportedReprojection { from: i32, to: i32 },

    #[error("restricted area is not polygonal: {0}")]
    NotPolygonal(String),
}

/// Parses, reprojects and converts restricted-area geometries.
pub trait GeometryAdapter: Send + Sync {
    fn parse_wkt(&self, text: &str) -> Result<Geometry<f64>, GeometryError>;

    fn reproject(
        &self,
        geometry: &Geometry<f64>,
        from_srid: i32,
        to_srid: i32,
    ) -> Result<Geometry<f64>, GeometryError>;

    fn to_multi_polygon(&self, geometry: &Geometry<f64>) -> Result<MultiPolygon<f64>, GeometryError>;

    fn to_wkt(&self, geometry: &Geometry<f64>) -> String;
}

/// Built-in adapter covering the WGS84 / web-mercator pair. Deployments
/// needing a full projection database plug their own [`GeometryAdapter`]
/// into the manager; unknown pairs fail closed.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultGeometryAdapter;

impl GeometryAdapter for DefaultGeometryAdapter {
    fn parse_wkt(&self, text: &str) -> Result<Geometry<f64>, GeometryError> {
        let parsed = Wkt::<f64>::from_str(text.trim())
            .map_err(|err| GeometryError::InvalidWkt(err.to_string()))?;
        Geometry::try_from(parsed).map_err(|err| GeometryError::InvalidWkt(format!("{err:?}")))
    }

    fn reproject(
        &self,
        geometry: &Geometry<f64>,
        from_srid: i32,
        to_srid: i32,
    ) -> Result<Geometry<f64>, GeometryError> {
        if from_srid == to_srid {
            return Ok(geometry.clone());
        }
        match (from_srid, to_srid) {
            (EPSG_WGS84, EPSG_WEB_MERCATOR) => Ok(geometry.map_coords(wgs84_to_mercator)),
            (EPSG_WEB_MERCATOR, EPSG_WGS84) => Ok(geometry.map_coords(mercator_to_wgs84)),
            (from, to) => Err(GeometryError::UnsupportedReprojection { from, to }),
        }
    }

    fn to_multi_polygon(&self, geometry: &Geometry<f64>) -> Result<MultiPolygon<f64>, GeometryError> {
        match geometry {
            Geometry::Polygon(polygon) => Ok(MultiPolygon(vec![polygon.clone()])),
            Geometry::MultiPolygon(multi) => Ok(multi.clone()),
            Geometry::GeometryCollection(collection) => {
                let mut polygons = Vec::new();
                for member in &collection.0 {
                    match member {
                        Geometry::Polygon(polygon) => polygons.push(polygon.clone()),
                        Geometry::MultiPolygon(multi) => polygons.extend(multi.0.iter().cloned()),
                        other => return Err(GeometryError::NotPolygonal(kind_name(other).into())),
                    }
                }
                Ok(MultiPolygon(polygons))
            }
            other => Err(GeometryError::NotPolygonal(kind_name(other).into())),
        }
    }

    fn to_wkt(&self, geometry: &Geometry<f64>) -> String {
        geometry.wkt_string()
    }
}

fn wgs84_to_mercator(coord: Coord<f64>) -> Coord<f64> {
    let x = coord.x * MERCATOR_HALF_WORLD / 180.0;
    let y = ((90.0 + coord.y) * std::f64::consts::PI / 360.0).tan().ln() * MERCATOR_HALF_WORLD
        / std::f64::consts::PI;
    Coord { x, y }
}

fn mercator_to_wgs84(coord: Coord<f64>) -> Coord<f64> {
    let x = coord.x / MERCATOR_HALF_WORLD * 180.0;
    let y = (coord.y * std::f64::consts::PI / MERCATOR_HALF_WORLD)
        .exp()
        .atan()
        * 360.0
        / std::f64::consts::PI
        - 90.0;
    Coord { x, y }
}

fn kind_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
