//! Activity accounting for the agent.
//!
//! Tracks how many signals, zone transitions and alerts the agent handled so
//! the user can see what it has been doing.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log_with_persistence, ActivityLog, ActivityStats, SharedActivityLog};
