//! End-to-end tests for zone lookup, signal coordination and alert
//! presentation.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use camzone_agent::{
    config::LocationPolicy,
    coordinator::{CoordinatorConfig, PresentationMode, SignalCoordinator},
    geo::{GeoPoint, ZoneRegistry, ZoneStore},
    presenter::{AlertPresenter, PresentationError},
    watchers::{LocationTracker, SignalEvent, SignalPump, SignalRouter},
};
use tokio::runtime::Handle;

const SQUARE: &str = r#"[{"id": "sq", "name": "Test Square", "coordinates": [
    {"lat": 0.0, "lng": 0.0}, {"lat": 0.0, "lng": 1.0},
    {"lat": 1.0, "lng": 1.0}, {"lat": 1.0, "lng": 0.0}
]}]"#;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Start(PresentationMode, Option<String>),
    Stop,
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_next_start: Arc<Mutex<bool>>,
}

impl Recorder {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn fail_next_start(&self) {
        *self.fail_next_start.lock().unwrap() = true;
    }
}

impl AlertPresenter for Recorder {
    fn start(
        &mut self,
        mode: PresentationMode,
        zone_name: Option<&str>,
    ) -> Result<(), PresentationError> {
        if std::mem::take(&mut *self.fail_next_start.lock().unwrap()) {
            return Err(PresentationError::StartFailed {
                mode,
                message: "surface unavailable".to_string(),
            });
        }
        self.calls
            .lock()
            .unwrap()
            .push(Call::Start(mode, zone_name.map(str::to_string)));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PresentationError> {
        self.calls.lock().unwrap().push(Call::Stop);
        Ok(())
    }
}

fn setup(config: CoordinatorConfig) -> (SignalRouter, Recorder) {
    let recorder = Recorder::default();
    let coordinator = SignalCoordinator::new(config, recorder.clone(), Handle::current());
    let store = Arc::new(ZoneStore::new(ZoneRegistry::from_json(SQUARE).unwrap()));
    let tracker = LocationTracker::new(store, coordinator.clone(), LocationPolicy::Outside);
    (SignalRouter::new(coordinator, tracker), recorder)
}

#[tokio::test(start_paused = true)]
async fn test_backgrounded_camera_use_in_zone() {
    let (router, recorder) = setup(CoordinatorConfig::default());

    router
        .dispatch(&SignalEvent::Location(GeoPoint::new(0.5, 0.5)))
        .unwrap();
    router
        .dispatch(&SignalEvent::Foreground { foreground: true })
        .unwrap();
    router
        .dispatch(&SignalEvent::Foreground { foreground: false })
        .unwrap();
    let decision = router
        .dispatch(&SignalEvent::Camera { active: true })
        .unwrap();

    assert!(decision.should_alert);
    assert_eq!(decision.presentation_mode, PresentationMode::FullscreenOverlay);
    assert_eq!(decision.zone_name.as_deref(), Some("Test Square"));
    assert!(recorder.calls().is_empty());
    assert!(router.coordinator().has_pending_start());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(
        recorder.calls(),
        vec![Call::Start(
            PresentationMode::FullscreenOverlay,
            Some("Test Square".to_string())
        )]
    );

    router
        .dispatch(&SignalEvent::Camera { active: false })
        .unwrap();
    assert_eq!(recorder.calls().len(), 2);
    assert_eq!(recorder.calls()[1], Call::Stop);
}

#[tokio::test(start_paused = true)]
async fn test_outside_zone_never_alerts() {
    let (router, recorder) = setup(CoordinatorConfig::default());

    router
        .dispatch(&SignalEvent::Location(GeoPoint::new(2.0, 2.0)))
        .unwrap();
    let decision = router
        .dispatch(&SignalEvent::Camera { active: true })
        .unwrap();

    assert!(!decision.should_alert);
    assert_eq!(decision.presentation_mode, PresentationMode::None);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(recorder.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_repeated_decisions_start_once() {
    let (router, recorder) = setup(CoordinatorConfig::default());

    router
        .dispatch(&SignalEvent::Location(GeoPoint::new(0.5, 0.5)))
        .unwrap();
    for _ in 0..3 {
        router
            .dispatch(&SignalEvent::Camera { active: true })
            .unwrap();
        router
            .dispatch(&SignalEvent::Location(GeoPoint::new(0.25, 0.75)))
            .unwrap();
        router
            .dispatch(&SignalEvent::Screen { on: false })
            .unwrap();
    }
    assert_eq!(recorder.calls().len(), 1);

    router
        .dispatch(&SignalEvent::Camera { active: false })
        .unwrap();
    router
        .dispatch(&SignalEvent::Camera { active: false })
        .unwrap();
    router
        .dispatch(&SignalEvent::Location(GeoPoint::new(5.0, 5.0)))
        .unwrap();
    assert_eq!(
        recorder.calls(),
        vec![
            Call::Start(
                PresentationMode::FullscreenOverlay,
                Some("Test Square".to_string())
            ),
            Call::Stop,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_debounced_start_cancelled_by_leaving_zone() {
    let (router, recorder) = setup(CoordinatorConfig::default());

    router
        .dispatch(&SignalEvent::Location(GeoPoint::new(0.5, 0.5)))
        .unwrap();
    router
        .dispatch(&SignalEvent::Foreground { foreground: true })
        .unwrap();
    router
        .dispatch(&SignalEvent::Foreground { foreground: false })
        .unwrap();
    router
        .dispatch(&SignalEvent::Camera { active: true })
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    router
        .dispatch(&SignalEvent::Location(GeoPoint::new(2.0, 2.0)))
        .unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(recorder.calls().is_empty());
    assert!(!router.coordinator().has_pending_start());
    assert_eq!(router.coordinator().activity().stats().deferred_cancelled, 1);
}

#[tokio::test(start_paused = true)]
async fn test_returning_to_foreground_cancels_pending_start() {
    let (router, recorder) = setup(CoordinatorConfig::default());

    router
        .dispatch(&SignalEvent::Location(GeoPoint::new(0.5, 0.5)))
        .unwrap();
    router
        .dispatch(&SignalEvent::Foreground { foreground: true })
        .unwrap();
    router
        .dispatch(&SignalEvent::Foreground { foreground: false })
        .unwrap();
    router
        .dispatch(&SignalEvent::Camera { active: true })
        .unwrap();
    let decision = router
        .dispatch(&SignalEvent::Foreground { foreground: true })
        .unwrap();
    assert_eq!(
        decision.presentation_mode,
        PresentationMode::SuppressedForeground
    );

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(recorder.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_deferred_start_recovers_on_next_signal() {
    let (router, recorder) = setup(CoordinatorConfig::default());
    recorder.fail_next_start();

    router
        .dispatch(&SignalEvent::Location(GeoPoint::new(0.5, 0.5)))
        .unwrap();
    router
        .dispatch(&SignalEvent::Foreground { foreground: true })
        .unwrap();
    router
        .dispatch(&SignalEvent::Foreground { foreground: false })
        .unwrap();
    router
        .dispatch(&SignalEvent::Camera { active: true })
        .unwrap();

    tokio::time::sleep(Duration::from_millis(499)).await;
    assert!(recorder.calls().is_empty());
    assert!(router.coordinator().has_pending_start());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let status = router.coordinator().status();
    assert!(!status.presenting);
    assert!(!status.pending_start);
    assert!(recorder.calls().is_empty());
    assert_eq!(
        router.coordinator().activity().stats().presentation_failures,
        1
    );

    // Outside the debounce window now, so the next signal starts at once
    let decision = router
        .dispatch(&SignalEvent::Screen { on: false })
        .unwrap();
    assert_eq!(decision.presentation_mode, PresentationMode::FullscreenOverlay);
    assert_eq!(
        recorder.calls(),
        vec![Call::Start(
            PresentationMode::FullscreenOverlay,
            Some("Test Square".to_string())
        )]
    );
    assert!(router.coordinator().is_presenting());
}

#[tokio::test(start_paused = true)]
async fn test_pending_start_uses_latest_zone() {
    let zones = r#"[
        {"id": "a", "name": "Alpha", "coordinates": [
            {"lat": 0.0, "lng": 0.0}, {"lat": 0.0, "lng": 1.0},
            {"lat": 1.0, "lng": 1.0}, {"lat": 1.0, "lng": 0.0}]},
        {"id": "b", "name": "Bravo", "coordinates": [
            {"lat": 1.0, "lng": 0.0}, {"lat": 1.0, "lng": 1.0},
            {"lat": 2.0, "lng": 1.0}, {"lat": 2.0, "lng": 0.0}]}
    ]"#;
    let recorder = Recorder::default();
    let coordinator = SignalCoordinator::new(
        CoordinatorConfig {
            fullscreen_supported: false,
            ..Default::default()
        },
        recorder.clone(),
        Handle::current(),
    );
    let store = Arc::new(ZoneStore::new(ZoneRegistry::from_json(zones).unwrap()));
    let tracker = LocationTracker::new(store, coordinator.clone(), LocationPolicy::Outside);

    coordinator.set_app_foreground(true).unwrap();
    coordinator.set_app_foreground(false).unwrap();
    coordinator.set_camera_active(true).unwrap();
    tracker.on_fix(GeoPoint::new(0.5, 0.5)).unwrap();
    tracker.on_fix(GeoPoint::new(1.5, 0.5)).unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(
        recorder.calls(),
        vec![Call::Start(
            PresentationMode::Notification,
            Some("Bravo".to_string())
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn test_pump_drives_end_to_end() {
    let (router, recorder) = setup(CoordinatorConfig::default());
    let (pump, sender) = SignalPump::new();

    let watcher = thread::spawn(move || {
        sender
            .send(SignalEvent::Location(GeoPoint::new(0.5, 0.5)))
            .unwrap();
        sender.send(SignalEvent::Camera { active: true }).unwrap();
        sender.send(SignalEvent::Camera { active: false }).unwrap();
    });
    watcher.join().unwrap();

    let stats = pump.drain(&router);
    assert_eq!(stats.processed, 3);
    assert_eq!(recorder.calls().len(), 2);
}

/// Presenter that records protocol violations instead of panicking inside
/// the coordinator's lock.
#[derive(Clone, Default)]
struct StrictPresenter {
    state: Arc<Mutex<StrictState>>,
}

#[derive(Default)]
struct StrictState {
    showing: Option<PresentationMode>,
    violations: Vec<String>,
    starts: usize,
    stops: usize,
}

impl AlertPresenter for StrictPresenter {
    fn start(
        &mut self,
        mode: PresentationMode,
        _zone_name: Option<&str>,
    ) -> Result<(), PresentationError> {
        let mut state = self.state.lock().unwrap();
        if state.showing == Some(mode) {
            state.violations.push(format!("duplicate start {mode}"));
        }
        state.showing = Some(mode);
        state.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PresentationError> {
        let mut state = self.state.lock().unwrap();
        if state.showing.is_none() {
            state.violations.push("stop without start".to_string());
        }
        state.showing = None;
        state.stops += 1;
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_signals_keep_lifecycle_consistent() {
    let presenter = StrictPresenter::default();
    let coordinator = SignalCoordinator::new(
        CoordinatorConfig {
            debounce_window: Duration::from_millis(5),
            fullscreen_supported: true,
        },
        presenter.clone(),
        Handle::current(),
    );

    let mut workers = Vec::new();
    for worker in 0..4usize {
        let c = coordinator.clone();
        workers.push(thread::spawn(move || {
            for i in 0..200usize {
                let flip = (i + worker) % 2 == 0;
                let result = match worker {
                    0 => c.set_camera_active(flip),
                    1 => c.set_zone_membership(flip, Some("Test Square".to_string())),
                    2 => c.set_app_foreground(i % 7 == 0),
                    _ => c.set_screen_on(flip),
                };
                result.unwrap();
                if i % 25 == 0 {
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    // Let any deferred start settle
    tokio::time::sleep(Duration::from_millis(200)).await;

    let state = presenter.state.lock().unwrap();
    assert!(state.violations.is_empty(), "{:?}", state.violations);
    assert!(state.starts >= state.stops);
    assert_eq!(state.showing.is_some(), coordinator.is_presenting());
}

#[test]
fn test_reload_is_atomic_for_readers() {
    fn registry(prefix: &str) -> ZoneRegistry {
        let json = format!(
            r#"[
            {{"id": "{prefix}-1", "name": "one", "coordinates": [
                {{"lat": 0.0, "lng": 0.0}}, {{"lat": 0.0, "lng": 1.0}}, {{"lat": 1.0, "lng": 1.0}}]}},
            {{"id": "{prefix}-2", "name": "two", "coordinates": [
                {{"lat": 2.0, "lng": 2.0}}, {{"lat": 2.0, "lng": 3.0}}, {{"lat": 3.0, "lng": 3.0}}]}}
        ]"#
        );
        ZoneRegistry::from_json(&json).unwrap()
    }

    let store = Arc::new(ZoneStore::new(registry("a")));
    let writer_store = Arc::clone(&store);
    let writer = thread::spawn(move || {
        for i in 0..500 {
            writer_store.replace(registry(if i % 2 == 0 { "b" } else { "a" }));
        }
    });

    for _ in 0..2_000 {
        let snapshot = store.snapshot();
        let ids: Vec<&str> = snapshot.zones().iter().map(|z| z.id()).collect();
        assert_eq!(ids.len(), 2);
        let prefix = &ids[0][..1];
        assert!(ids.iter().all(|id| id.starts_with(prefix)), "mixed {ids:?}");
    }
    writer.join().unwrap();
}
