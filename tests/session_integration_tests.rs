//! Integration tests for acquisition sessions
//!
//! Drives a full session against real log directories:
//! - Empty data directory exhausting the attempt budget
//! - Fix already logged before the press
//! - Swim animation stopping when a session unwinds
//! - Button presses during a session

use hopeturtle::{
    ButtonWatcher, DisplayEvent, FixLog, FixRecord, Geometry, Orchestrator, RecordingBackend,
    ReferencePoint, SessionConfig, SessionOutcome, Shutdown, SimulatedButton, StatusRenderer,
};
use std::cell::{Cell, RefCell};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const HEADER: &str = "timestamp_utc,lat,lon,status,sats,hdop\n";

fn quick_config() -> SessionConfig {
    SessionConfig {
        status_hold: Duration::ZERO,
        summary_hold: Duration::ZERO,
        ..SessionConfig::default()
    }
}

fn recording_renderer() -> (StatusRenderer, hopeturtle::DisplayLog) {
    let (backend, log) = RecordingBackend::new(Geometry::OLED_128X64);
    let renderer = StatusRenderer::new(Box::new(backend), Shutdown::new())
        .with_frame_interval(Duration::from_millis(5));
    (renderer, log)
}

#[test]
fn test_empty_log_directory_exhausts_attempts() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let (renderer, log) = recording_renderer();
    let pauses = Rc::new(RefCell::new(Vec::new()));
    let recorded = pauses.clone();

    let mut orchestrator = Orchestrator::new(
        quick_config(),
        ReferencePoint::default(),
        || -> hopeturtle::Result<()> { Ok(()) },
        FixLog::new(temp_dir.path()),
        move |d: Duration| recorded.borrow_mut().push(d),
        renderer,
        Shutdown::new(),
    );

    let report = orchestrator.run_session();
    assert_eq!(report.outcome, SessionOutcome::NoFix);
    assert_eq!(report.attempts, 15);
    assert_eq!(*pauses.borrow(), vec![Duration::from_secs(3); 14]);

    let texts = log.texts();
    assert_eq!(texts[0][0], "Checking GPS...");
    assert_eq!(
        texts.last().cloned(),
        Some(vec!["No GPS fix yet".to_string(), "Check sky view...".to_string()])
    );

    // The animation is torn down once: a single clear between the last swim
    // frame and the final screen, and no frames after it.
    let events = log.events();
    let last_swim = events
        .iter()
        .rposition(|e| matches!(e, DisplayEvent::SwimFrame(_)))
        .expect("swim frames drawn");
    let final_text = events
        .iter()
        .rposition(|e| matches!(e, DisplayEvent::Text(_)))
        .expect("final screen");
    assert!(last_swim < final_text);
    let clears_between = events[last_swim..final_text]
        .iter()
        .filter(|e| **e == DisplayEvent::Clear)
        .count();
    assert_eq!(clears_between, 1);
}

#[test]
fn test_logged_fix_is_found_on_first_attempt() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(
        temp_dir.path().join("20240101-000000_gps.csv"),
        format!("{}2024-01-01T00:00:00Z,31.28,34.23,fix,7,1.2\n", HEADER),
    )
    .expect("Failed to write log");

    let (renderer, log) = recording_renderer();
    let pauses = Rc::new(Cell::new(0u32));
    let counter = pauses.clone();
    let mut orchestrator = Orchestrator::new(
        quick_config(),
        ReferencePoint::default(),
        || -> hopeturtle::Result<()> { Ok(()) },
        FixLog::new(temp_dir.path()),
        move |_d: Duration| counter.set(counter.get() + 1),
        renderer,
        Shutdown::new(),
    );

    let report = orchestrator.run_session();
    assert_eq!(report.attempts, 1);
    assert_eq!(pauses.get(), 0);
    match &report.outcome {
        SessionOutcome::Fix { record, km_to_ref } => {
            assert_eq!(record.timestamp, "2024-01-01T00:00:00Z");
            assert_eq!(record.session_id.as_deref(), Some("20240101-000000"));
            assert!((km_to_ref - 0.506).abs() < 0.01, "got {}", km_to_ref);
        }
        other => panic!("expected a fix, got {:?}", other),
    }

    let summary = log.texts().last().cloned().expect("summary screen");
    assert_eq!(
        summary,
        vec![
            "Fix: 31.28000,".to_string(),
            "34.23000".to_string(),
            "0.5 km -> Mawasi".to_string(),
            "Sats: 7".to_string(),
        ]
    );
}

#[test]
fn test_unwinding_session_stops_animation() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let (renderer, log) = recording_renderer();
    let attempts = Rc::new(Cell::new(0u32));
    let counter = attempts.clone();

    let mut orchestrator = Orchestrator::new(
        quick_config(),
        ReferencePoint::default(),
        move || -> hopeturtle::Result<()> {
            counter.set(counter.get() + 1);
            if counter.get() == 2 {
                thread::sleep(Duration::from_millis(20));
                panic!("sampler crashed");
            }
            Ok(())
        },
        FixLog::new(temp_dir.path()),
        |_d: Duration| {},
        renderer,
        Shutdown::new(),
    );

    let result = panic::catch_unwind(AssertUnwindSafe(|| orchestrator.run_session()));
    assert!(result.is_err());

    let frames = log.swim_frames();
    assert!(frames > 0);
    assert_eq!(log.events().last(), Some(&DisplayEvent::Clear));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(log.swim_frames(), frames, "animation kept running");

    // The next session still runs, on the fallback display
    let report = orchestrator.run_session();
    assert_eq!(report.outcome, SessionOutcome::NoFix);
    assert_eq!(log.swim_frames(), frames);
}

#[test]
fn test_presses_during_session_do_not_start_another() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let shutdown = Shutdown::new();
    let button = SimulatedButton::new();
    let remote = button.clone();

    let running = Arc::new(AtomicU32::new(0));
    let max_running = Arc::new(AtomicU32::new(0));
    let (renderer, _log) = recording_renderer();

    let sampler_running = running.clone();
    let sampler_max = max_running.clone();
    let sampler_button = remote.clone();
    let mut orchestrator = Orchestrator::new(
        SessionConfig {
            max_attempts: 2,
            ..quick_config()
        },
        ReferencePoint::default(),
        move || -> hopeturtle::Result<()> {
            let now = sampler_running.fetch_add(1, Ordering::SeqCst) + 1;
            sampler_max.fetch_max(now, Ordering::SeqCst);
            // Mash the button while the session is busy
            for _ in 0..3 {
                sampler_button.tap(Duration::from_millis(5));
            }
            sampler_running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        },
        FixLog::new(temp_dir.path()),
        |_d: Duration| {},
        renderer,
        shutdown.clone(),
    );

    let mut watcher = ButtonWatcher::new(
        button,
        Duration::from_millis(20),
        Duration::from_millis(1),
        shutdown.clone(),
    );

    let stopper = shutdown.clone();
    let presser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        remote.tap(Duration::from_millis(30));
        thread::sleep(Duration::from_millis(300));
        stopper.request();
    });

    let mut sessions = 0;
    let handled = watcher.run(|_event| {
        sessions += 1;
        orchestrator.run_session();
    });
    presser.join().expect("presser thread");

    assert_eq!(handled, 1);
    assert_eq!(sessions, 1);
    assert_eq!(max_running.load(Ordering::SeqCst), 1);
}
