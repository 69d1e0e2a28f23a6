//! Signal intake from the platform watchers.
//!
//! Camera, location and power watchers run on their own threads and push
//! [`SignalEvent`]s into a [`SignalPump`]. The pump applies them to the
//! coordinator in arrival order; location fixes go through the
//! [`LocationTracker`] first so they arrive as zone membership.

pub mod location;
pub mod pump;
pub mod types;

// Re-export commonly used types
pub use location::LocationTracker;
pub use pump::{PumpError, PumpStats, SignalPump, SignalRouter};
pub use types::SignalEvent;
