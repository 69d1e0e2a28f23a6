//! Signal coordination for the Restricted-Zone Camera Guard.
//!
//! This module contains:
//! - The signal state and the pure decision function
//! - The presentation lifecycle guard (idempotent start/stop with debounce)
//! - The coordinator that serializes signal updates and drives the guard

pub mod decision;
pub mod engine;
pub mod guard;

// Re-export commonly used types
pub use decision::{decide, Decision, PresentationMode, SignalState};
pub use engine::{
    CoordinatorConfig, CoordinatorStatus, SignalCoordinator, DEFAULT_DEBOUNCE_WINDOW,
};
pub use guard::{GuardAction, PresentationGuard};
