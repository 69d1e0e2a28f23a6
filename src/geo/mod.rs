//! Restricted-zone geometry.
//!
//! This module contains:
//! - Value types for points, bounding boxes and validated zones
//! - The containment engine (bounding-box pre-filter plus ray casting)
//! - The zone registry answering "which zones contain this point"

pub mod containment;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use containment::{
    bounding_box_contains, center_point, is_inside, point_in_polygon, polygon_area,
    validate_polygon, ErrorReason, ValidationError,
};
pub use registry::{
    ConfigurationError, RejectedZone, RejectionCause, SharedZoneStore, ZoneRegistry, ZoneStore,
    ZoneSummary,
};
pub use types::{BoundingBox, GeoPoint, RawCoordinate, RestrictedZone, ZoneDescriptor};
