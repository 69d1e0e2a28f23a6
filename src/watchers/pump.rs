//! Channel between the watcher threads and the coordinator.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::location::LocationTracker;
use super::types::SignalEvent;
use crate::coordinator::{Decision, SignalCoordinator};
use crate::presenter::PresentationError;

const CHANNEL_CAPACITY: usize = 10_000;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors from the pump itself.
#[derive(Debug, Error)]
pub enum PumpError {
    #[error("signal pump is already running")]
    AlreadyRunning,
}

/// Routes each signal to the coordinator setter it belongs to.
pub struct SignalRouter {
    coordinator: SignalCoordinator,
    location: LocationTracker,
}

impl SignalRouter {
    pub fn new(coordinator: SignalCoordinator, location: LocationTracker) -> Self {
        Self {
            coordinator,
            location,
        }
    }

    pub fn dispatch(&self, event: &SignalEvent) -> Result<Decision, PresentationError> {
        match *event {
            SignalEvent::Camera { active } => self.coordinator.set_camera_active(active),
            SignalEvent::Location(point) => self.location.on_fix(point),
            SignalEvent::LocationUnavailable => self.location.on_location_unavailable(),
            SignalEvent::Screen { on } => self.coordinator.set_screen_on(on),
            SignalEvent::Foreground { foreground } => {
                self.coordinator.set_app_foreground(foreground)
            }
        }
    }

    pub fn coordinator(&self) -> &SignalCoordinator {
        &self.coordinator
    }

    pub fn location(&self) -> &LocationTracker {
        &self.location
    }
}

/// Counts from one pump run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub processed: u64,
    pub failed: u64,
}

/// Receives signals from any number of watcher threads and applies them one
/// at a time.
pub struct SignalPump {
    receiver: Receiver<SignalEvent>,
    running: Arc<AtomicBool>,
}

impl SignalPump {
    /// Create a pump and the sender watchers should clone.
    ///
    /// The pump's `run` returns once every sender has been dropped.
    pub fn new() -> (Self, Sender<SignalEvent>) {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        let pump = Self {
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        };
        (pump, sender)
    }

    /// Flag that keeps `run` looping; clear it to stop from another thread.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Make `run` return after its current poll.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Process signals until stopped or until all senders are gone.
    ///
    /// Presenter failures are logged and counted; they never end the loop.
    pub fn run(&self, router: &SignalRouter) -> Result<PumpStats, PumpError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(PumpError::AlreadyRunning);
        }

        let mut stats = PumpStats::default();
        while self.running.load(Ordering::SeqCst) {
            match self.receiver.recv_timeout(POLL_INTERVAL) {
                Ok(event) => Self::handle(router, &event, &mut stats),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("All signal senders dropped");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(stats)
    }

    /// Process whatever is queued right now without waiting.
    pub fn drain(&self, router: &SignalRouter) -> PumpStats {
        let mut stats = PumpStats::default();
        for event in self.receiver.try_iter() {
            Self::handle(router, &event, &mut stats);
        }
        stats
    }

    fn handle(router: &SignalRouter, event: &SignalEvent, stats: &mut PumpStats) {
        stats.processed += 1;
        if let Err(e) = router.dispatch(event) {
            stats.failed += 1;
            warn!(source = event.source(), error = %e, "Alert presentation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocationPolicy;
    use crate::coordinator::{CoordinatorConfig, PresentationMode};
    use crate::geo::{GeoPoint, ZoneRegistry, ZoneStore};
    use crate::presenter::AlertPresenter;
    use std::sync::Mutex;
    use tokio::runtime::Handle;

    const SQUARE: &str = r#"[{"id": "sq", "name": "Square", "coordinates": [
        {"lat": 0.0, "lng": 0.0}, {"lat": 0.0, "lng": 1.0},
        {"lat": 1.0, "lng": 1.0}, {"lat": 1.0, "lng": 0.0}
    ]}]"#;

    #[derive(Clone, Default)]
    struct Flaky {
        calls: Arc<Mutex<Vec<String>>>,
        fail_starts: bool,
    }

    impl AlertPresenter for Flaky {
        fn start(
            &mut self,
            mode: PresentationMode,
            _zone_name: Option<&str>,
        ) -> Result<(), PresentationError> {
            self.calls.lock().unwrap().push(format!("start {mode}"));
            if self.fail_starts {
                return Err(PresentationError::StartFailed {
                    mode,
                    message: "no surface".to_string(),
                });
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<(), PresentationError> {
            self.calls.lock().unwrap().push("stop".to_string());
            Ok(())
        }
    }

    fn router(presenter: Flaky) -> SignalRouter {
        let store = Arc::new(ZoneStore::new(ZoneRegistry::from_json(SQUARE).unwrap()));
        let coordinator =
            SignalCoordinator::new(CoordinatorConfig::default(), presenter, Handle::current());
        let location = LocationTracker::new(store, coordinator.clone(), LocationPolicy::Outside);
        SignalRouter::new(coordinator, location)
    }

    #[tokio::test]
    async fn test_drain_routes_signals() {
        let presenter = Flaky::default();
        let router = router(presenter.clone());
        let (pump, sender) = SignalPump::new();

        sender
            .send(SignalEvent::Location(GeoPoint::new(0.5, 0.5)))
            .unwrap();
        sender.send(SignalEvent::Camera { active: true }).unwrap();
        sender.send(SignalEvent::Camera { active: false }).unwrap();

        let stats = pump.drain(&router);
        assert_eq!(stats, PumpStats { processed: 3, failed: 0 });
        assert_eq!(
            *presenter.calls.lock().unwrap(),
            vec!["start fullscreen-overlay".to_string(), "stop".to_string()]
        );
    }

    #[tokio::test]
    async fn test_run_ends_when_senders_drop() {
        let router = router(Flaky::default());
        let (pump, sender) = SignalPump::new();

        let feeder = std::thread::spawn(move || {
            sender.send(SignalEvent::Screen { on: false }).unwrap();
            sender
                .send(SignalEvent::Foreground { foreground: true })
                .unwrap();
        });

        let stats = pump.run(&router).unwrap();
        feeder.join().unwrap();
        assert_eq!(stats.processed, 2);
        assert!(!pump.is_running());
    }

    #[tokio::test]
    async fn test_stop_ends_blocked_run() {
        let router = router(Flaky::default());
        let (pump, _sender) = SignalPump::new();

        let stats = std::thread::scope(|scope| {
            scope.spawn(|| {
                while !pump.is_running() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                pump.stop();
            });
            pump.run(&router).unwrap()
        });

        assert_eq!(stats, PumpStats::default());
        assert!(!pump.is_running());
    }

    #[tokio::test]
    async fn test_run_twice_concurrently_is_rejected() {
        let router = router(Flaky::default());
        let (pump, _sender) = SignalPump::new();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                while !pump.is_running() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                assert!(matches!(pump.run(&router), Err(PumpError::AlreadyRunning)));
                pump.stop();
            });
            pump.run(&router).unwrap();
        });
    }

    #[tokio::test]
    async fn test_presenter_failure_is_not_fatal() {
        let presenter = Flaky {
            fail_starts: true,
            ..Default::default()
        };
        let router = router(presenter);
        let (pump, sender) = SignalPump::new();

        sender
            .send(SignalEvent::Location(GeoPoint::new(0.5, 0.5)))
            .unwrap();
        sender.send(SignalEvent::Camera { active: true }).unwrap();
        sender.send(SignalEvent::Screen { on: false }).unwrap();

        let stats = pump.drain(&router);
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.failed, 2);
        assert!(!router.coordinator().is_presenting());
    }
}
