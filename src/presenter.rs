//! The external alert surface.
//!
//! The coordinator never draws anything itself. It drives an
//! [`AlertPresenter`], which may be an overlay window, a notification, or
//! (for the CLI) a line on the console.

use thiserror::Error;
use tracing::info;

use crate::coordinator::PresentationMode;
use crate::ALERT_MESSAGE;

/// A failed start/stop call on the presenter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresentationError {
    #[error("failed to start {mode} alert: {message}")]
    StartFailed {
        mode: PresentationMode,
        message: String,
    },

    #[error("failed to stop alert: {message}")]
    StopFailed { message: String },
}

/// Something that can show and hide the restricted-zone alert.
///
/// `start` may be called again while already showing, with a different mode;
/// implementations should treat that as an update rather than a fresh alert.
pub trait AlertPresenter: Send + 'static {
    fn start(
        &mut self,
        mode: PresentationMode,
        zone_name: Option<&str>,
    ) -> Result<(), PresentationError>;

    fn stop(&mut self) -> Result<(), PresentationError>;
}

/// Presenter that prints the alert to stdout.
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    showing: Option<PresentationMode>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn showing(&self) -> Option<PresentationMode> {
        self.showing
    }
}

impl AlertPresenter for ConsolePresenter {
    fn start(
        &mut self,
        mode: PresentationMode,
        zone_name: Option<&str>,
    ) -> Result<(), PresentationError> {
        let zone = zone_name.unwrap_or("restricted zone");
        if self.showing.is_some() {
            info!(%mode, zone, "Updating alert");
            println!("[alert] switched to {mode} ({zone})");
        } else {
            info!(%mode, zone, "Showing alert");
            println!("[alert] {mode} ({zone})");
            println!("{ALERT_MESSAGE}");
        }
        self.showing = Some(mode);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PresentationError> {
        info!("Hiding alert");
        println!("[alert] cleared");
        self.showing = None;
        Ok(())
    }
}
