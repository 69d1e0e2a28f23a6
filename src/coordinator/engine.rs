//! The signal coordinator.
//!
//! All four signal setters funnel through one mutex: the mutation, the
//! decision and the resulting presenter call happen as a single step, so
//! decisions reach the guard in the order the setters were called. The only
//! asynchronous piece is the debounce timer, which re-acquires the same mutex
//! before touching presentation state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::decision::{decide, Decision, SignalState};
use super::guard::{GuardAction, PresentationGuard};
use crate::activity::{ActivityLog, SharedActivityLog};
use crate::presenter::{AlertPresenter, PresentationError};

/// Default debounce window after the app leaves the foreground.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Tunables supplied by the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How long a start is held back right after the app is backgrounded
    pub debounce_window: Duration,
    /// Whether a full-screen surface can be shown from the background
    pub fullscreen_supported: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            fullscreen_supported: true,
        }
    }
}

/// Point-in-time view of the coordinator for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorStatus {
    pub decision: Decision,
    pub screen_on: bool,
    pub presenting: bool,
    pub pending_start: bool,
}

struct Inner {
    state: SignalState,
    decision: Decision,
    guard: PresentationGuard,
    fullscreen_supported: bool,
    timer: Option<JoinHandle<()>>,
    activity: SharedActivityLog,
}

/// Merges camera, zone, screen and foreground signals into one alert decision.
///
/// Cloning yields another handle to the same coordinator, so each watcher
/// thread can hold its own.
#[derive(Clone)]
pub struct SignalCoordinator {
    inner: Arc<Mutex<Inner>>,
    runtime: Handle,
}

impl SignalCoordinator {
    /// Create a coordinator whose debounce timers run on `runtime`.
    pub fn new(config: CoordinatorConfig, presenter: impl AlertPresenter, runtime: Handle) -> Self {
        Self::with_activity_log(config, presenter, runtime, Arc::new(ActivityLog::new()))
    }

    /// Create a coordinator that records into an existing activity log.
    pub fn with_activity_log(
        config: CoordinatorConfig,
        presenter: impl AlertPresenter,
        runtime: Handle,
        activity: SharedActivityLog,
    ) -> Self {
        let inner = Inner {
            state: SignalState::default(),
            decision: Decision::none(),
            guard: PresentationGuard::new(presenter, config.debounce_window),
            fullscreen_supported: config.fullscreen_supported,
            timer: None,
            activity,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            runtime,
        }
    }

    /// Camera hardware became busy (`true`) or idle (`false`).
    pub fn set_camera_active(&self, active: bool) -> Result<Decision, PresentationError> {
        self.update("camera", |s| s.camera_active = active)
    }

    /// Result of the latest zone membership check.
    pub fn set_zone_membership(
        &self,
        inside_any_zone: bool,
        matched_zone_name: Option<String>,
    ) -> Result<Decision, PresentationError> {
        self.update("zone", |s| {
            s.inside_any_zone = inside_any_zone;
            s.matched_zone_name = if inside_any_zone {
                matched_zone_name
            } else {
                None
            };
        })
    }

    pub fn set_screen_on(&self, on: bool) -> Result<Decision, PresentationError> {
        self.update("screen", |s| s.screen_on = on)
    }

    pub fn set_app_foreground(&self, foreground: bool) -> Result<Decision, PresentationError> {
        self.update("foreground", |s| s.app_foreground = foreground)
    }

    /// The most recent decision.
    pub fn decision(&self) -> Decision {
        self.lock().decision.clone()
    }

    pub fn status(&self) -> CoordinatorStatus {
        let inner = self.lock();
        CoordinatorStatus {
            decision: inner.decision.clone(),
            screen_on: inner.state.screen_on,
            presenting: inner.guard.is_running(),
            pending_start: inner.guard.pending_token().is_some(),
        }
    }

    /// Whether the presenter is believed to be showing an alert.
    pub fn is_presenting(&self) -> bool {
        self.lock().guard.is_running()
    }

    /// Whether a deferred start is waiting for its timer.
    pub fn has_pending_start(&self) -> bool {
        self.lock().guard.pending_token().is_some()
    }

    pub fn activity(&self) -> SharedActivityLog {
        Arc::clone(&self.lock().activity)
    }

    /// Forget the presenter state without calling it.
    ///
    /// Use once at process start when the external state is unknown.
    pub fn reset_presentation(&self) {
        let mut inner = self.lock();
        inner.guard.reset();
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        debug!("Presentation state reset");
    }

    /// Cancel any deferred start and take down an active alert.
    pub fn shutdown(&self) -> Result<(), PresentationError> {
        let mut inner = self.lock();
        let result = inner.guard.apply(&Decision::none(), Instant::now());
        self.handle_action(&mut inner, result).map(|_| ())
    }

    fn update(
        &self,
        signal: &'static str,
        mutate: impl FnOnce(&mut SignalState),
    ) -> Result<Decision, PresentationError> {
        let mut inner = self.lock();
        let now = Instant::now();

        let was_foreground = inner.state.app_foreground;
        mutate(&mut inner.state);
        if was_foreground && !inner.state.app_foreground {
            inner.guard.note_backgrounded(now);
        }

        let decision = decide(&inner.state, inner.fullscreen_supported);
        debug!(
            signal,
            camera = inner.state.camera_active,
            inside = inner.state.inside_any_zone,
            screen_on = inner.state.screen_on,
            foreground = inner.state.app_foreground,
            mode = %decision.presentation_mode,
            "Decision recomputed"
        );
        inner.activity.record_signal_update();
        inner.decision = decision.clone();

        let result = inner.guard.apply(&decision, now);
        self.handle_action(&mut inner, result)?;
        Ok(decision)
    }

    fn handle_action(
        &self,
        inner: &mut Inner,
        result: Result<GuardAction, PresentationError>,
    ) -> Result<GuardAction, PresentationError> {
        match result {
            Ok(action) => {
                match action {
                    GuardAction::Started(_) => inner.activity.record_alert_started(),
                    GuardAction::Stopped => inner.activity.record_alert_stopped(),
                    GuardAction::Cancelled => {
                        if let Some(timer) = inner.timer.take() {
                            timer.abort();
                        }
                        inner.activity.record_deferred_cancelled();
                    }
                    GuardAction::Deferred { token, delay } => self.schedule(inner, token, delay),
                    GuardAction::Noop => {}
                }
                Ok(action)
            }
            Err(e) => {
                inner.activity.record_presentation_failure();
                Err(e)
            }
        }
    }

    fn schedule(&self, inner: &mut Inner, token: u64, delay: Duration) {
        if let Some(stale) = inner.timer.take() {
            stale.abort();
        }

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        inner.timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut inner = shared.lock().unwrap_or_else(PoisonError::into_inner);

            match inner.guard.fire_pending(token) {
                Ok(GuardAction::Noop) => {
                    debug!(token, "Deferred start no longer pending");
                    return;
                }
                Ok(GuardAction::Started(_)) => inner.activity.record_alert_started(),
                Ok(_) => {}
                Err(e) => {
                    // Nobody to return this to; the next signal proceeds normally
                    warn!(token, error = %e, "Deferred alert start failed");
                    inner.activity.record_presentation_failure();
                }
            }
            inner.timer = None;
        }));
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SignalCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("SignalCoordinator")
            .field("decision", &inner.decision)
            .field("guard", &inner.guard)
            .finish()
    }
}
