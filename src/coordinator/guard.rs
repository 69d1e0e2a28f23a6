//! Presentation lifecycle guard.
//!
//! Turns a stream of decisions into start/stop calls on the alert presenter,
//! issuing at most one call per logical change. The guard itself never waits:
//! when a start has to be deferred it hands back a token and delay, and the
//! owner schedules [`PresentationGuard::fire_pending`] once the delay elapses.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info};

use super::decision::{Decision, PresentationMode};
use crate::presenter::{AlertPresenter, PresentationError};

/// What the guard did with a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardAction {
    /// Nothing to do, the presenter already matches
    Noop,
    /// `start` was issued with this mode
    Started(PresentationMode),
    /// `stop` was issued
    Stopped,
    /// A start was deferred; fire `token` after `delay`
    Deferred { token: u64, delay: Duration },
    /// A deferred start was dropped before it fired, no presenter call made
    Cancelled,
}

#[derive(Debug)]
struct PendingStart {
    token: u64,
    mode: PresentationMode,
    zone_name: Option<String>,
}

/// Idempotent start/stop wrapper around an [`AlertPresenter`].
pub struct PresentationGuard {
    presenter: Box<dyn AlertPresenter>,
    debounce: Duration,
    running: bool,
    current_mode: Option<PresentationMode>,
    pending: Option<PendingStart>,
    backgrounded_at: Option<Instant>,
    next_token: u64,
}

impl PresentationGuard {
    pub fn new(presenter: impl AlertPresenter, debounce: Duration) -> Self {
        Self {
            presenter: Box::new(presenter),
            debounce,
            running: false,
            current_mode: None,
            pending: None,
            backgrounded_at: None,
            next_token: 1,
        }
    }

    /// Record that the app just left the foreground.
    pub fn note_backgrounded(&mut self, at: Instant) {
        self.backgrounded_at = Some(at);
    }

    /// Apply a decision, calling the presenter if the active state changes.
    ///
    /// On error `running` keeps reflecting the last successful call.
    pub fn apply(
        &mut self,
        decision: &Decision,
        now: Instant,
    ) -> Result<GuardAction, PresentationError> {
        let mode = decision.presentation_mode;

        if !mode.is_active() {
            let cancelled = self.cancel_pending();
            if self.running {
                return self.stop();
            }
            return Ok(if cancelled {
                GuardAction::Cancelled
            } else {
                GuardAction::Noop
            });
        }

        // Keep the deferred start aimed at the latest decision
        if let Some(pending) = self.pending.as_mut() {
            pending.mode = mode;
            pending.zone_name = decision.zone_name.clone();
            debug!(token = pending.token, %mode, "Updated deferred alert start");
            return Ok(GuardAction::Noop);
        }

        if self.running && self.current_mode == Some(mode) {
            return Ok(GuardAction::Noop);
        }

        if !self.running && self.within_debounce(now) {
            let token = self.next_token;
            self.next_token += 1;
            self.pending = Some(PendingStart {
                token,
                mode,
                zone_name: decision.zone_name.clone(),
            });
            debug!(token, %mode, delay_ms = self.debounce.as_millis() as u64, "Deferring alert start");
            return Ok(GuardAction::Deferred {
                token,
                delay: self.debounce,
            });
        }

        self.start(mode, decision.zone_name.as_deref())
    }

    /// Issue a deferred start if `token` is still the pending one.
    pub fn fire_pending(&mut self, token: u64) -> Result<GuardAction, PresentationError> {
        match self.pending.take() {
            Some(pending) if pending.token == token => {
                debug!(token, mode = %pending.mode, "Firing deferred alert start");
                self.start(pending.mode, pending.zone_name.as_deref())
            }
            other => {
                // Stale timer: leave any newer pending start in place
                self.pending = other;
                Ok(GuardAction::Noop)
            }
        }
    }

    /// Drop a deferred start. Returns whether one was pending.
    pub fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                debug!(token = pending.token, "Cancelled deferred alert start");
                true
            }
            None => false,
        }
    }

    /// Forget what the presenter is showing without calling it.
    ///
    /// Only for resynchronizing after a process restart.
    pub fn reset(&mut self) {
        self.running = false;
        self.current_mode = None;
        self.pending = None;
        self.backgrounded_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_mode(&self) -> Option<PresentationMode> {
        self.current_mode
    }

    pub fn pending_token(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.token)
    }

    fn within_debounce(&self, now: Instant) -> bool {
        self.backgrounded_at
            .map(|at| now.saturating_duration_since(at) < self.debounce)
            .unwrap_or(false)
    }

    fn start(
        &mut self,
        mode: PresentationMode,
        zone_name: Option<&str>,
    ) -> Result<GuardAction, PresentationError> {
        match self.presenter.start(mode, zone_name) {
            Ok(()) => {
                info!(%mode, zone = zone_name.unwrap_or("-"), "Alert started");
                self.running = true;
                self.current_mode = Some(mode);
                Ok(GuardAction::Started(mode))
            }
            Err(e) => {
                error!(%mode, error = %e, "Alert start failed");
                Err(e)
            }
        }
    }

    fn stop(&mut self) -> Result<GuardAction, PresentationError> {
        match self.presenter.stop() {
            Ok(()) => {
                info!("Alert stopped");
                self.running = false;
                self.current_mode = None;
                Ok(GuardAction::Stopped)
            }
            Err(e) => {
                error!(error = %e, "Alert stop failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for PresentationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationGuard")
            .field("debounce", &self.debounce)
            .field("running", &self.running)
            .field("current_mode", &self.current_mode)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
