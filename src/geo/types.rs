//! Geographic value types for restricted zones.
//!
//! A zone is only ever built through [`RestrictedZone::new`], which validates
//! the vertex list and caches the bounding box, so every zone held by a
//! registry is known to be well formed.

use serde::{Deserialize, Serialize};

use super::containment::{center_point, validate_polygon, ValidationError};

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Axis-aligned latitude/longitude rectangle enclosing a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Smallest box containing every vertex. Returns `None` for an empty slice.
    pub fn from_vertices(vertices: &[GeoPoint]) -> Option<Self> {
        let first = vertices.first()?;
        let init = Self {
            min_lat: first.latitude,
            max_lat: first.latitude,
            min_lng: first.longitude,
            max_lng: first.longitude,
        };

        Some(vertices.iter().skip(1).fold(init, |b, p| Self {
            min_lat: b.min_lat.min(p.latitude),
            max_lat: b.max_lat.max(p.latitude),
            min_lng: b.min_lng.min(p.longitude),
            max_lng: b.max_lng.max(p.longitude),
        }))
    }
}

/// A validated polygonal zone in which camera use is not allowed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestrictedZone {
    id: String,
    name: String,
    vertices: Vec<GeoPoint>,
    bounding_box: BoundingBox,
}

impl RestrictedZone {
    /// Validate the vertices and build the zone.
    ///
    /// Vertex order is kept as given and defines the polygon winding.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        vertices: Vec<GeoPoint>,
    ) -> Result<Self, ValidationError> {
        validate_polygon(&vertices)?;

        // validate_polygon guarantees at least three vertices
        let bounding_box =
            BoundingBox::from_vertices(&vertices).ok_or(ValidationError::TooFewPoints { count: 0 })?;

        Ok(Self {
            id: id.into(),
            name: name.into(),
            vertices,
            bounding_box,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[GeoPoint] {
        &self.vertices
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Mean of the vertices, for display.
    pub fn center(&self) -> GeoPoint {
        center_point(&self.vertices)
    }
}

/// A zone record as supplied by the zone configuration source.
///
/// Every field is optional so that a single incomplete record can be reported
/// and skipped instead of failing the whole document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Vec<RawCoordinate>>,
}

/// One `{lat, lng}` entry of a zone descriptor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawCoordinate {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
}

impl From<RawCoordinate> for GeoPoint {
    fn from(raw: RawCoordinate) -> Self {
        GeoPoint::new(raw.lat, raw.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(1.0, 0.0),
        ]
    }

    #[test]
    fn test_bounding_box_from_vertices() {
        let bbox = BoundingBox::from_vertices(&[
            GeoPoint::new(10.0, -5.0),
            GeoPoint::new(12.5, 3.0),
            GeoPoint::new(11.0, -7.25),
        ])
        .unwrap();

        assert_eq!(bbox.min_lat, 10.0);
        assert_eq!(bbox.max_lat, 12.5);
        assert_eq!(bbox.min_lng, -7.25);
        assert_eq!(bbox.max_lng, 3.0);

        assert!(BoundingBox::from_vertices(&[]).is_none());
    }

    #[test]
    fn test_zone_caches_bounding_box() {
        let zone = RestrictedZone::new("z1", "Square", square()).unwrap();

        assert_eq!(zone.id(), "z1");
        assert_eq!(zone.name(), "Square");
        assert_eq!(zone.vertices().len(), 4);
        assert_eq!(zone.bounding_box().max_lat, 1.0);
        assert_eq!(zone.center(), GeoPoint::new(0.5, 0.5));
    }

    #[test]
    fn test_zone_rejects_invalid_vertices() {
        let err = RestrictedZone::new("z1", "Line", square()[..2].to_vec()).unwrap_err();
        assert!(matches!(err, ValidationError::TooFewPoints { count: 2 }));
    }

    #[test]
    fn test_descriptor_accepts_long_field_names() {
        let descriptor: ZoneDescriptor = serde_json::from_str(
            r#"{"id":"a","name":"A","coordinates":[{"latitude":1.0,"longitude":2.0}]}"#,
        )
        .unwrap();

        let coords = descriptor.coordinates.unwrap();
        assert_eq!(GeoPoint::from(coords[0]), GeoPoint::new(1.0, 2.0));
    }
}
