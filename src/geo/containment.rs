//! Point-in-polygon containment and polygon validation.
//!
//! Containment works on raw latitude/longitude as a planar grid: the ray is
//! cast along the point's latitude and edges are intersected in longitude.
//! Zones are small enough that curvature does not matter for the test itself;
//! only [`polygon_area`] uses a spherical approximation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{BoundingBox, GeoPoint, RestrictedZone};

/// Equatorial earth radius in meters used for area estimates.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Fewest vertices a zone may have.
pub const MIN_VERTICES: usize = 3;

/// Most vertices a zone may have.
pub const MAX_VERTICES: usize = 100;

/// Smallest accepted zone area in square meters.
pub const MIN_AREA_M2: f64 = 1.0;

/// Machine-readable category of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorReason {
    TooFewPoints,
    TooManyPoints,
    LatitudeOutOfRange,
    LongitudeOutOfRange,
    AreaTooSmall,
    DuplicateId,
}

/// Why a zone was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("polygon must have at least 3 points, got {count}")]
    TooFewPoints { count: usize },

    #[error("polygon cannot have more than 100 points, got {count}")]
    TooManyPoints { count: usize },

    #[error("invalid latitude: {0}")]
    LatitudeOutOfRange(f64),

    #[error("invalid longitude: {0}")]
    LongitudeOutOfRange(f64),

    #[error("polygon area too small or points are collinear ({area_m2:.3} m²)")]
    AreaTooSmall { area_m2: f64 },

    #[error("duplicate zone id: {0}")]
    DuplicateId(String),
}

impl ValidationError {
    pub fn reason(&self) -> ErrorReason {
        match self {
            ValidationError::TooFewPoints { .. } => ErrorReason::TooFewPoints,
            ValidationError::TooManyPoints { .. } => ErrorReason::TooManyPoints,
            ValidationError::LatitudeOutOfRange(_) => ErrorReason::LatitudeOutOfRange,
            ValidationError::LongitudeOutOfRange(_) => ErrorReason::LongitudeOutOfRange,
            ValidationError::AreaTooSmall { .. } => ErrorReason::AreaTooSmall,
            ValidationError::DuplicateId(_) => ErrorReason::DuplicateId,
        }
    }
}

/// Inclusive range check against a bounding box.
pub fn bounding_box_contains(point: &GeoPoint, bbox: &BoundingBox) -> bool {
    point.latitude >= bbox.min_lat
        && point.latitude <= bbox.max_lat
        && point.longitude >= bbox.min_lng
        && point.longitude <= bbox.max_lng
}

/// Even-odd ray casting test.
///
/// Self-intersecting polygons are accepted; the answer is whatever the
/// even-odd rule gives. Fewer than three vertices is never inside.
pub fn point_in_polygon(point: &GeoPoint, vertices: &[GeoPoint]) -> bool {
    if vertices.len() < MIN_VERTICES {
        return false;
    }

    let x = point.longitude;
    let y = point.latitude;
    let mut inside = false;

    let mut j = vertices.len() - 1;
    for (i, vi) in vertices.iter().enumerate() {
        let vj = &vertices[j];
        let (xi, yi) = (vi.longitude, vi.latitude);
        let (xj, yj) = (vj.longitude, vj.latitude);

        // The straddle check guarantees yj != yi, so the division is safe.
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Exact containment of a point in a zone, with bounding-box rejection first.
pub fn is_inside(point: &GeoPoint, zone: &RestrictedZone) -> bool {
    if !bounding_box_contains(point, zone.bounding_box()) {
        return false;
    }
    point_in_polygon(point, zone.vertices())
}

/// Approximate polygon area in square meters on a spherical earth.
pub fn polygon_area(vertices: &[GeoPoint]) -> f64 {
    if vertices.len() < MIN_VERTICES {
        return 0.0;
    }

    let n = vertices.len();
    let sum: f64 = (0..n)
        .map(|i| {
            let a = &vertices[i];
            let b = &vertices[(i + 1) % n];
            let lat1 = a.latitude.to_radians();
            let lat2 = b.latitude.to_radians();
            let lng1 = a.longitude.to_radians();
            let lng2 = b.longitude.to_radians();
            (lng2 - lng1) * (2.0 + lat1.sin() + lat2.sin())
        })
        .sum();

    sum.abs() * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0
}

/// Check a vertex list against the zone invariants, stopping at the first
/// violation.
pub fn validate_polygon(vertices: &[GeoPoint]) -> Result<(), ValidationError> {
    if vertices.len() < MIN_VERTICES {
        return Err(ValidationError::TooFewPoints {
            count: vertices.len(),
        });
    }
    if vertices.len() > MAX_VERTICES {
        return Err(ValidationError::TooManyPoints {
            count: vertices.len(),
        });
    }

    for point in vertices {
        if !(-90.0..=90.0).contains(&point.latitude) {
            return Err(ValidationError::LatitudeOutOfRange(point.latitude));
        }
        if !(-180.0..=180.0).contains(&point.longitude) {
            return Err(ValidationError::LongitudeOutOfRange(point.longitude));
        }
    }

    let area_m2 = polygon_area(vertices);
    // NaN area (non-finite input) is rejected as well
    if !(area_m2 >= MIN_AREA_M2) {
        return Err(ValidationError::AreaTooSmall { area_m2 });
    }

    Ok(())
}

/// Arithmetic mean of the vertices.
pub fn center_point(vertices: &[GeoPoint]) -> GeoPoint {
    if vertices.is_empty() {
        return GeoPoint::new(0.0, 0.0);
    }
    let n = vertices.len() as f64;
    let lat: f64 = vertices.iter().map(|p| p.latitude).sum();
    let lng: f64 = vertices.iter().map(|p| p.longitude).sum();
    GeoPoint::new(lat / n, lng / n)
}
