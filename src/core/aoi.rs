//! Polygon geometry for the area of interest, parsed from GeoJSON.
//!
//! Coordinates are `(x, y)` pairs; for an `AreaOfInterest` that means
//! `(longitude, latitude)` in WGS84. Projected copies of the polygon carry
//! raster CRS coordinates instead.
use serde_json::Value;

use crate::core::grid::BBox;
use crate::error::{Error, Result};

pub type Ring = Vec<(f64, f64)>;

/// A polygon with one exterior ring and zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

impl Polygon {
    /// Build a polygon, validating every ring (at least 3 distinct finite vertices).
    pub fn new(exterior: Ring, holes: Vec<Ring>) -> Result<Self> {
        validate_ring(&exterior, "exterior")?;
        for hole in &holes {
            validate_ring(hole, "hole")?;
        }
        Ok(Self { exterior, holes })
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_points(self.exterior.iter().copied()).unwrap_or(BBox::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Even-odd rule across the exterior and all holes: a point inside a hole is outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let mut inside = ring_crossings_odd(&self.exterior, x, y);
        for hole in &self.holes {
            if ring_crossings_odd(hole, x, y) {
                inside = !inside;
            }
        }
        inside
    }

    /// Apply `f` to every vertex, producing a new polygon.
    pub fn try_map<F>(&self, mut f: F) -> Result<Polygon>
    where
        F: FnMut(f64, f64) -> Result<(f64, f64)>,
    {
        let mut map_ring = |ring: &Ring| -> Result<Ring> {
            ring.iter().map(|&(x, y)| f(x, y)).collect()
        };
        let exterior = map_ring(&self.exterior)?;
        let holes = self
            .holes
            .iter()
            .map(&mut map_ring)
            .collect::<Result<Vec<_>>>()?;
        Polygon::new(exterior, holes)
    }
}

fn validate_ring(ring: &Ring, which: &str) -> Result<()> {
    if ring.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(Error::Geometry(format!("{} ring has non-finite coordinates", which)));
    }
    let mut distinct: Vec<(f64, f64)> = Vec::with_capacity(ring.len());
    for &p in ring {
        if !distinct.contains(&p) {
            distinct.push(p);
        }
        if distinct.len() >= 3 {
            return Ok(());
        }
    }
    Err(Error::Geometry(format!(
        "{} ring needs at least 3 distinct vertices, got {}",
        which,
        distinct.len()
    )))
}

/// Ray casting towards +x; works for open and closed rings alike.
fn ring_crossings_odd(ring: &Ring, x: f64, y: f64) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// The caller's area of interest: a WGS84 polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaOfInterest {
    polygon: Polygon,
}

impl AreaOfInterest {
    pub fn new(polygon: Polygon) -> Self {
        Self { polygon }
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    /// Longitude/latitude envelope of the exterior ring.
    pub fn bbox(&self) -> BBox {
        self.polygon.bbox()
    }

    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_geojson(&value)
    }

    /// Accepts a `Polygon` geometry, a `Feature` wrapping one, or a
    /// `FeatureCollection` whose first feature is a polygon.
    pub fn from_geojson(value: &Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::geometry("GeoJSON object has no 'type'"))?;
        match kind {
            "Polygon" => {
                let coords = value
                    .get("coordinates")
                    .ok_or_else(|| Error::geometry("Polygon has no 'coordinates'"))?;
                Ok(Self::new(parse_polygon_coordinates(coords)?))
            }
            "Feature" => {
                let geometry = value
                    .get("geometry")
                    .filter(|g| !g.is_null())
                    .ok_or_else(|| Error::geometry("Feature has no geometry"))?;
                Self::from_geojson(geometry)
            }
            "FeatureCollection" => {
                let first = value
                    .get("features")
                    .and_then(Value::as_array)
                    .and_then(|features| features.first())
                    .ok_or_else(|| Error::geometry("FeatureCollection has no features"))?;
                Self::from_geojson(first)
            }
            other => Err(Error::Geometry(format!(
                "unsupported geometry type '{}', expected a Polygon",
                other
            ))),
        }
    }
}

fn parse_polygon_coordinates(coords: &Value) -> Result<Polygon> {
    let rings = coords
        .as_array()
        .ok_or_else(|| Error::geometry("Polygon coordinates must be an array of rings"))?;
    let mut parsed = rings
        .iter()
        .map(parse_ring)
        .collect::<Result<Vec<Ring>>>()?;
    if parsed.is_empty() {
        return Err(Error::geometry("Polygon has no rings"));
    }
    let exterior = parsed.remove(0);
    Polygon::new(exterior, parsed)
}

fn parse_ring(ring: &Value) -> Result<Ring> {
    let positions = ring
        .as_array()
        .ok_or_else(|| Error::geometry("ring must be an array of positions"))?;
    positions
        .iter()
        .map(|pos| {
            let xy = pos
                .as_array()
                .filter(|a| a.len() >= 2)
                .ok_or_else(|| Error::geometry("position must have at least 2 numbers"))?;
            match (xy[0].as_f64(), xy[1].as_f64()) {
                (Some(x), Some(y)) => Ok((x, y)),
                _ => Err(Error::geometry("position coordinates must be numbers")),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]],
                        [[4.0, 4.0], [6.0, 4.0], [6.0, 6.0], [4.0, 6.0], [4.0, 4.0]]]
    }"#;

    #[test]
    fn test_contains_respects_holes() {
        let aoi = AreaOfInterest::from_geojson_str(SQUARE).unwrap();
        let poly = aoi.polygon();
        assert!(poly.contains(1.0, 1.0));
        assert!(!poly.contains(5.0, 5.0));
        assert!(!poly.contains(11.0, 5.0));
        assert_eq!(aoi.bbox(), BBox::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_feature_and_collection_are_unwrapped() {
        let feature = format!(r#"{{"type":"Feature","properties":{{}},"geometry":{}}}"#, SQUARE);
        let collection = format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, feature);
        let a = AreaOfInterest::from_geojson_str(&feature).unwrap();
        let b = AreaOfInterest::from_geojson_str(&collection).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.polygon().holes.len(), 1);
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let line = r#"{"type":"Polygon","coordinates":[[[0,0],[1,1],[0,0]]]}"#;
        assert!(matches!(
            AreaOfInterest::from_geojson_str(line),
            Err(Error::Geometry(_))
        ));
    }

    #[test]
    fn test_non_polygon_rejected() {
        let point = r#"{"type":"Point","coordinates":[1.0,2.0]}"#;
        assert!(matches!(
            AreaOfInterest::from_geojson_str(point),
            Err(Error::Geometry(_))
        ));
        let empty = r#"{"type":"FeatureCollection","features":[]}"#;
        assert!(AreaOfInterest::from_geojson_str(empty).is_err());
    }

    #[test]
    fn test_try_map_transforms_every_vertex() {
        let aoi = AreaOfInterest::from_geojson_str(SQUARE).unwrap();
        let shifted = aoi.polygon().try_map(|x, y| Ok((x + 100.0, y * 2.0))).unwrap();
        assert_eq!(shifted.bbox(), BBox::new(100.0, 0.0, 110.0, 20.0));
        assert!(shifted.contains(101.0, 2.0));
        assert!(!shifted.contains(105.0, 10.0));
    }
}
