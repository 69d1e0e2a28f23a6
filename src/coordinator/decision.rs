//! Signal state and the pure alert decision.

use serde::{Deserialize, Serialize};

/// Which kind of alert surface should currently be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresentationMode {
    /// No violation
    None,
    /// Violation while the app itself is on screen; the app shows its own
    /// lightweight warning and no external surface is started
    SuppressedForeground,
    /// Notification-style alert from the background
    Notification,
    /// Full-screen overlay from the background
    FullscreenOverlay,
}

impl PresentationMode {
    /// Whether this mode needs the external alert presenter running.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PresentationMode::Notification | PresentationMode::FullscreenOverlay
        )
    }
}

impl std::fmt::Display for PresentationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PresentationMode::None => "none",
            PresentationMode::SuppressedForeground => "suppressed-foreground",
            PresentationMode::Notification => "notification",
            PresentationMode::FullscreenOverlay => "fullscreen-overlay",
        };
        f.write_str(s)
    }
}

/// The independent signals merged by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalState {
    pub camera_active: bool,
    pub inside_any_zone: bool,
    pub matched_zone_name: Option<String>,
    pub screen_on: bool,
    pub app_foreground: bool,
}

impl Default for SignalState {
    fn default() -> Self {
        Self {
            camera_active: false,
            inside_any_zone: false,
            matched_zone_name: None,
            screen_on: true,
            app_foreground: false,
        }
    }
}

/// Outcome of evaluating a [`SignalState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub should_alert: bool,
    pub presentation_mode: PresentationMode,
    /// Zone to name in the alert, present only when alerting
    pub zone_name: Option<String>,
}

impl Decision {
    /// The decision for a state with no violation.
    pub fn none() -> Self {
        Self {
            should_alert: false,
            presentation_mode: PresentationMode::None,
            zone_name: None,
        }
    }
}

/// Compute the decision for a signal state.
///
/// `fullscreen_supported` is supplied by the platform: when a full-screen
/// surface cannot be created from a background context the alert falls back
/// to a notification.
pub fn decide(state: &SignalState, fullscreen_supported: bool) -> Decision {
    let would_alert = state.inside_any_zone && state.camera_active;
    if !would_alert {
        return Decision::none();
    }

    let presentation_mode = if state.app_foreground {
        PresentationMode::SuppressedForeground
    } else if fullscreen_supported {
        PresentationMode::FullscreenOverlay
    } else {
        PresentationMode::Notification
    };

    Decision {
        should_alert: true,
        presentation_mode,
        zone_name: state.matched_zone_name.clone(),
    }
}
