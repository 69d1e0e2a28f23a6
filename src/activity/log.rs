//! Session activity log.
//!
//! Counts what the agent did (signal updates, zone entries, alerts shown)
//! without recording where the device was. Counters can be persisted so the
//! `status` command can show cumulative numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Activity counters for the current session.
#[derive(Debug)]
pub struct ActivityLog {
    signal_updates: AtomicU64,
    location_fixes: AtomicU64,
    zone_entries: AtomicU64,
    zone_exits: AtomicU64,
    alerts_started: AtomicU64,
    alerts_stopped: AtomicU64,
    deferred_cancelled: AtomicU64,
    presentation_failures: AtomicU64,
    zones_rejected: AtomicU64,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl ActivityLog {
    /// Create an empty log for a new session.
    pub fn new() -> Self {
        Self {
            signal_updates: AtomicU64::new(0),
            location_fixes: AtomicU64::new(0),
            zone_entries: AtomicU64::new(0),
            zone_exits: AtomicU64::new(0),
            alerts_started: AtomicU64::new(0),
            alerts_stopped: AtomicU64::new(0),
            deferred_cancelled: AtomicU64::new(0),
            presentation_failures: AtomicU64::new(0),
            zones_rejected: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create an activity log that continues from counters saved at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            warn!("Could not load previous activity stats: {e}");
        }

        log
    }

    /// Record a coordinator signal update.
    pub fn record_signal_update(&self) {
        self.signal_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a location fix.
    pub fn record_location_fix(&self) {
        self.location_fixes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record entering a restricted zone.
    pub fn record_zone_entry(&self) {
        self.zone_entries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record leaving a restricted zone.
    pub fn record_zone_exit(&self) {
        self.zone_exits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an alert start.
    pub fn record_alert_started(&self) {
        self.alerts_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an alert stop.
    pub fn record_alert_stopped(&self) {
        self.alerts_stopped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a deferred start that was cancelled before firing.
    pub fn record_deferred_cancelled(&self) {
        self.deferred_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed presenter call.
    pub fn record_presentation_failure(&self) {
        self.presentation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record zones dropped at load time.
    pub fn record_zones_rejected(&self, count: u64) {
        self.zones_rejected.fetch_add(count, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> ActivityStats {
        ActivityStats {
            signal_updates: self.signal_updates.load(Ordering::Relaxed),
            location_fixes: self.location_fixes.load(Ordering::Relaxed),
            zone_entries: self.zone_entries.load(Ordering::Relaxed),
            zone_exits: self.zone_exits.load(Ordering::Relaxed),
            alerts_started: self.alerts_started.load(Ordering::Relaxed),
            alerts_stopped: self.alerts_stopped.load(Ordering::Relaxed),
            deferred_cancelled: self.deferred_cancelled.load(Ordering::Relaxed),
            presentation_failures: self.presentation_failures.load(Ordering::Relaxed),
            zones_rejected: self.zones_rejected.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Signal updates: {}\n\
             - Location fixes: {}\n\
             - Zone entries / exits: {} / {}\n\
             - Alerts started / stopped: {} / {}\n\
             - Deferred starts cancelled: {}\n\
             - Presentation failures: {}\n\
             - Zones rejected at load: {}\n\
             - Session duration: {} seconds",
            stats.signal_updates,
            stats.location_fixes,
            stats.zone_entries,
            stats.zone_exits,
            stats.alerts_started,
            stats.alerts_stopped,
            stats.deferred_cancelled,
            stats.presentation_failures,
            stats.zones_rejected,
            stats.session_duration_secs
        )
    }

    /// Save counters to disk, if persistence is enabled.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                signal_updates: stats.signal_updates,
                location_fixes: stats.location_fixes,
                zone_entries: stats.zone_entries,
                zone_exits: stats.zone_exits,
                alerts_started: stats.alerts_started,
                alerts_stopped: stats.alerts_stopped,
                deferred_cancelled: stats.deferred_cancelled,
                presentation_failures: stats.presentation_failures,
                zones_rejected: stats.zones_rejected,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let p: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.signal_updates.store(p.signal_updates, Ordering::Relaxed);
                self.location_fixes.store(p.location_fixes, Ordering::Relaxed);
                self.zone_entries.store(p.zone_entries, Ordering::Relaxed);
                self.zone_exits.store(p.zone_exits, Ordering::Relaxed);
                self.alerts_started.store(p.alerts_started, Ordering::Relaxed);
                self.alerts_stopped.store(p.alerts_stopped, Ordering::Relaxed);
                self.deferred_cancelled
                    .store(p.deferred_cancelled, Ordering::Relaxed);
                self.presentation_failures
                    .store(p.presentation_failures, Ordering::Relaxed);
                self.zones_rejected.store(p.zones_rejected, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of activity counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityStats {
    pub signal_updates: u64,
    pub location_fixes: u64,
    pub zone_entries: u64,
    pub zone_exits: u64,
    pub alerts_started: u64,
    pub alerts_stopped: u64,
    pub deferred_cancelled: u64,
    pub presentation_failures: u64,
    pub zones_rejected: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// On-disk format.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    #[serde(default)]
    signal_updates: u64,
    #[serde(default)]
    location_fixes: u64,
    #[serde(default)]
    zone_entries: u64,
    #[serde(default)]
    zone_exits: u64,
    #[serde(default)]
    alerts_started: u64,
    #[serde(default)]
    alerts_stopped: u64,
    #[serde(default)]
    deferred_cancelled: u64,
    #[serde(default)]
    presentation_failures: u64,
    #[serde(default)]
    zones_rejected: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared activity log.
pub type SharedActivityLog = Arc<ActivityLog>;

/// Create a shared log that loads from and saves to `path`.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedActivityLog {
    Arc::new(ActivityLog::with_persistence(path))
}
