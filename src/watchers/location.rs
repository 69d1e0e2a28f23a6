//! Bridges location fixes to zone membership.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::config::LocationPolicy;
use crate::coordinator::{Decision, SignalCoordinator};
use crate::geo::{GeoPoint, SharedZoneStore};
use crate::presenter::PresentationError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CurrentZone {
    id: String,
    name: String,
}

/// Looks up each fix in the zone registry and feeds the result to the
/// coordinator, logging zone entries and exits along the way.
pub struct LocationTracker {
    zones: SharedZoneStore,
    coordinator: SignalCoordinator,
    policy: LocationPolicy,
    current: Mutex<Option<CurrentZone>>,
}

impl LocationTracker {
    pub fn new(
        zones: SharedZoneStore,
        coordinator: SignalCoordinator,
        policy: LocationPolicy,
    ) -> Self {
        Self {
            zones,
            coordinator,
            policy,
            current: Mutex::new(None),
        }
    }

    /// Handle a location fix.
    pub fn on_fix(&self, point: GeoPoint) -> Result<Decision, PresentationError> {
        // Held across the coordinator call so fixes apply in arrival order
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let activity = self.coordinator.activity();
        activity.record_location_fix();

        let registry = self.zones.snapshot();
        let matched = registry.first_containing(&point).map(|z| CurrentZone {
            id: z.id().to_string(),
            name: z.name().to_string(),
        });

        if *current != matched {
            if let Some(prev) = current.as_ref() {
                info!(id = %prev.id, name = %prev.name, "Left restricted zone");
                activity.record_zone_exit();
            }
            if let Some(next) = matched.as_ref() {
                info!(id = %next.id, name = %next.name, "Entered restricted zone");
                activity.record_zone_entry();
            }
        }
        debug!(
            lat = point.latitude,
            lng = point.longitude,
            zone = matched.as_ref().map(|z| z.name.as_str()).unwrap_or("-"),
            "Location fix"
        );

        let name = matched.as_ref().map(|z| z.name.clone());
        *current = matched;
        self.coordinator.set_zone_membership(name.is_some(), name)
    }

    /// Handle loss of location, applying the configured policy.
    pub fn on_location_unavailable(&self) -> Result<Decision, PresentationError> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(prev) = current.take() {
            info!(id = %prev.id, name = %prev.name, "Lost location while in restricted zone");
            self.coordinator.activity().record_zone_exit();
        }

        let inside = self.policy == LocationPolicy::Inside;
        info!(policy = ?self.policy, inside, "Location unavailable");
        self.coordinator.set_zone_membership(inside, None)
    }

    /// Name of the zone the last fix fell in.
    pub fn current_zone_name(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|z| z.name.clone())
    }
}
