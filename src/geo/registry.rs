//! The active set of restricted zones.
//!
//! A [`ZoneRegistry`] is immutable once loaded. Reloading builds a fresh
//! registry and swaps it into a [`ZoneStore`], so readers either see the old
//! set or the new one, never a mix.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::containment::{is_inside, ValidationError};
use super::types::{GeoPoint, RestrictedZone, ZoneDescriptor};

/// Problems with the raw zone configuration itself.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("could not read zone file: {0}")]
    Io(#[from] std::io::Error),

    #[error("zone document is not a JSON array of zones: {0}")]
    Parse(String),

    #[error("malformed zone entry: {0}")]
    MalformedEntry(String),
}

/// Why an individual descriptor was dropped at load time.
#[derive(Debug, Error)]
pub enum RejectionCause {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Malformed(#[from] ConfigurationError),
}

/// A descriptor that did not make it into the registry.
#[derive(Debug)]
pub struct RejectedZone {
    /// Position of the entry in the source document
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub cause: RejectionCause,
}

/// Immutable, ordered collection of validated zones.
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    zones: Vec<RestrictedZone>,
    rejected: Vec<RejectedZone>,
}

impl ZoneRegistry {
    /// An empty registry. Every containment query answers "not inside".
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate each descriptor independently and keep the good ones.
    ///
    /// Bad entries are logged and recorded in [`rejected`](Self::rejected);
    /// they never fail the load.
    pub fn load(descriptors: impl IntoIterator<Item = ZoneDescriptor>) -> Self {
        let mut registry = Self::default();
        let mut seen_ids = HashSet::new();

        for (index, descriptor) in descriptors.into_iter().enumerate() {
            let id = descriptor.id.clone();
            let name = descriptor.name.clone();

            match build_zone(descriptor, &seen_ids) {
                Ok(zone) => {
                    debug!(id = zone.id(), name = zone.name(), "Loaded restricted zone");
                    seen_ids.insert(zone.id().to_string());
                    registry.zones.push(zone);
                }
                Err(cause) => registry.reject(index, id, name, cause),
            }
        }

        info!(
            loaded = registry.zones.len(),
            rejected = registry.rejected.len(),
            "Zone registry loaded"
        );
        registry
    }

    /// Parse a JSON array of zone records.
    ///
    /// Only a document that is not an array at all is an error; entries that
    /// do not deserialize are rejected one by one.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let entries: Vec<serde_json::Value> =
            serde_json::from_str(json).map_err(|e| ConfigurationError::Parse(e.to_string()))?;

        let mut malformed = Vec::new();
        let mut descriptors = Vec::with_capacity(entries.len());
        let mut positions = Vec::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            let id = entry.get("id").and_then(|v| v.as_str()).map(str::to_string);
            let name = entry.get("name").and_then(|v| v.as_str()).map(str::to_string);

            match serde_json::from_value::<ZoneDescriptor>(entry) {
                Ok(descriptor) => {
                    descriptors.push(descriptor);
                    positions.push(index);
                }
                Err(e) => malformed.push((index, id, name, e.to_string())),
            }
        }

        let mut registry = Self::load(descriptors);

        // Report positions relative to the source document
        for rejection in &mut registry.rejected {
            rejection.index = positions[rejection.index];
        }
        for (index, id, name, message) in malformed {
            registry.reject(
                index,
                id,
                name,
                ConfigurationError::MalformedEntry(message).into(),
            );
        }
        registry.rejected.sort_by_key(|r| r.index);

        Ok(registry)
    }

    /// Read and parse a zone file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Every zone containing the point, in registry order.
    pub fn zones_containing(&self, point: &GeoPoint) -> Vec<&RestrictedZone> {
        self.zones.iter().filter(|z| is_inside(point, z)).collect()
    }

    /// The first zone in registry order that contains the point.
    pub fn first_containing(&self, point: &GeoPoint) -> Option<&RestrictedZone> {
        self.zones.iter().find(|z| is_inside(point, z))
    }

    pub fn zones(&self) -> &[RestrictedZone] {
        &self.zones
    }

    pub fn rejected(&self) -> &[RejectedZone] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Short listing of the loaded zones for display.
    pub fn summaries(&self) -> Vec<ZoneSummary> {
        self.zones.iter().map(ZoneSummary::from).collect()
    }

    fn reject(
        &mut self,
        index: usize,
        id: Option<String>,
        name: Option<String>,
        cause: RejectionCause,
    ) {
        warn!(index, ?id, ?name, %cause, "Dropping restricted zone");
        self.rejected.push(RejectedZone {
            index,
            id,
            name,
            cause,
        });
    }
}

fn build_zone(
    descriptor: ZoneDescriptor,
    seen_ids: &HashSet<String>,
) -> Result<RestrictedZone, RejectionCause> {
    let name = descriptor
        .name
        .ok_or_else(|| ConfigurationError::MalformedEntry("missing field `name`".to_string()))?;
    let coordinates = descriptor.coordinates.ok_or_else(|| {
        ConfigurationError::MalformedEntry("missing field `coordinates`".to_string())
    })?;

    let id = descriptor
        .id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    if seen_ids.contains(&id) {
        return Err(ValidationError::DuplicateId(id).into());
    }

    let vertices = coordinates.into_iter().map(GeoPoint::from).collect();
    Ok(RestrictedZone::new(id, name, vertices)?)
}

/// Display-oriented view of a zone.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneSummary {
    pub id: String,
    pub name: String,
    pub points: usize,
    pub center: GeoPoint,
    pub area_km2: f64,
}

impl From<&RestrictedZone> for ZoneSummary {
    fn from(zone: &RestrictedZone) -> Self {
        Self {
            id: zone.id().to_string(),
            name: zone.name().to_string(),
            points: zone.vertices().len(),
            center: zone.center(),
            area_km2: super::containment::polygon_area(zone.vertices()) / 1_000_000.0,
        }
    }
}

/// Shared handle to the current registry with atomic replacement.
#[derive(Debug, Default)]
pub struct ZoneStore {
    current: RwLock<Arc<ZoneRegistry>>,
}

impl ZoneStore {
    pub fn new(registry: ZoneRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// The registry as of now. Later reloads do not affect the returned value.
    pub fn snapshot(&self) -> Arc<ZoneRegistry> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replace the whole registry.
    pub fn replace(&self, registry: ZoneRegistry) {
        let registry = Arc::new(registry);
        match self.current.write() {
            Ok(mut guard) => *guard = registry,
            Err(poisoned) => *poisoned.into_inner() = registry,
        }
    }
}

/// Thread-safe shared zone store.
pub type SharedZoneStore = Arc<ZoneStore>;
