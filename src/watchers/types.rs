//! Signal events delivered by the platform watchers.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// One update from a camera, location, or power/foreground watcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalEvent {
    /// Camera hardware became busy or idle
    Camera { active: bool },
    /// A new location fix
    Location(GeoPoint),
    /// Location services are off or no fix could be obtained
    LocationUnavailable,
    /// Screen turned on or off
    Screen { on: bool },
    /// The app entered or left the foreground
    Foreground { foreground: bool },
}

impl SignalEvent {
    /// Short name of the watcher this event comes from, for logging.
    pub fn source(&self) -> &'static str {
        match self {
            SignalEvent::Camera { .. } => "camera",
            SignalEvent::Location(_) | SignalEvent::LocationUnavailable => "location",
            SignalEvent::Screen { .. } | SignalEvent::Foreground { .. } => "power",
        }
    }
}
