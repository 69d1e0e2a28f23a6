//! Camzone Agent - restricted-zone camera guard.
//!
//! Watches camera usage and device location and raises an alert whenever the
//! camera is in use inside one of a set of polygonal restricted zones.
//!
//! # Guarantees
//!
//! - **Exact geometry**: containment is an even-odd ray cast over validated
//!   polygons, with a bounding-box pre-filter
//! - **One alert at a time**: the presentation guard never issues a second
//!   start for the same mode, nor a stop without a prior start
//! - **No flicker**: a start requested right after the app leaves the
//!   foreground is held back for a short debounce window
//! - **No location history**: only counters are recorded, never positions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Camzone Agent                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Watchers   │──▶│   Signal    │──▶│Presentation │──▶ UI │
//! │  │(cam/loc/pwr)│   │ Coordinator │   │    Guard    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                 │                                 │
//! │         ▼                 ▼                                 │
//! │  ┌─────────────┐   ┌─────────────┐                         │
//! │  │    Zone     │   │  Activity   │                         │
//! │  │  Registry   │   │     Log     │                         │
//! │  └─────────────┘   └─────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use camzone_agent::coordinator::{CoordinatorConfig, SignalCoordinator};
//! use camzone_agent::geo::{GeoPoint, ZoneRegistry};
//! use camzone_agent::presenter::ConsolePresenter;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let registry = ZoneRegistry::load_file("restricted_zones.json".as_ref())?;
//! let coordinator = SignalCoordinator::new(
//!     CoordinatorConfig::default(),
//!     ConsolePresenter::new(),
//!     tokio::runtime::Handle::current(),
//! );
//!
//! let here = GeoPoint::new(37.4219, -122.0840);
//! let zone = registry.first_containing(&here);
//! coordinator.set_zone_membership(zone.is_some(), zone.map(|z| z.name().to_string()))?;
//! coordinator.set_camera_active(true)?;
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod config;
pub mod coordinator;
pub mod geo;
pub mod presenter;
pub mod watchers;

// Re-export key types at crate root for convenience
pub use activity::{ActivityLog, ActivityStats, SharedActivityLog};
pub use config::{Config, ConfigError, LocationPolicy};
pub use coordinator::{
    decide, CoordinatorConfig, Decision, PresentationMode, SignalCoordinator, SignalState,
};
pub use geo::{
    ConfigurationError, GeoPoint, RestrictedZone, SharedZoneStore, ValidationError, ZoneRegistry,
    ZoneStore,
};
pub use presenter::{AlertPresenter, ConsolePresenter, PresentationError};
pub use watchers::{LocationTracker, SignalEvent, SignalPump, SignalRouter};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Text shown by every alert surface.
pub const ALERT_MESSAGE: &str = "⚠️ CAUTION!\nThis is a RESTRICTED ZONE.\nClose the camera.";
