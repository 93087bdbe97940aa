//! Acquisition session orchestration
//!
//! One session per accepted button press:
//!
//! 1. show a timestamped "Checking GPS..." screen,
//! 2. start the swim animation,
//! 3. up to `max_attempts` times run the sampler and look for a fix, pausing
//!    `retry_delay` after each miss except the last,
//! 4. stop the animation,
//! 5. show the fix summary or the "no fix" screen.
//!
//! Worst case a session takes
//! `max_attempts * sampler_timeout + (max_attempts - 1) * retry_delay` plus the
//! two screen holds; [`SessionConfig::worst_case_duration`] computes it. The
//! button is unresponsive for that long.

use crate::distance::ReferencePoint;
use crate::fixlog::FixSource;
use crate::render::{distance_line, EchoBackend, StatusRenderer};
use crate::sampler::GpsSampler;
use crate::shutdown::Shutdown;
use crate::types::{FixRecord, Geometry};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Hold of the opening "Checking GPS..." screen
    pub status_hold: Duration,
    /// Hold of the final fix / no-fix screen
    pub summary_hold: Duration,
    /// Upper bound of one sampler run, used for the duration bound only
    pub sampler_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            retry_delay: Duration::from_secs(3),
            status_hold: Duration::from_secs(1),
            summary_hold: Duration::from_secs(5),
            sampler_timeout: crate::sampler::DEFAULT_SAMPLER_TIMEOUT,
        }
    }
}

impl SessionConfig {
    /// Saturates at `Duration::MAX` rather than overflowing
    pub fn worst_case_duration(&self) -> Duration {
        let attempts = self.max_attempts;
        [
            self.sampler_timeout.saturating_mul(attempts),
            self.retry_delay.saturating_mul(attempts.saturating_sub(1)),
            self.status_hold,
            self.summary_hold,
        ]
        .into_iter()
        .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Something that can wait between attempts
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

impl<F> Pause for F
where
    F: FnMut(Duration),
{
    fn pause(&mut self, duration: Duration) {
        self(duration)
    }
}

/// Real sleep that gives up early on shutdown
#[derive(Debug, Clone)]
pub struct InterruptibleSleep {
    shutdown: Shutdown,
}

impl InterruptibleSleep {
    pub fn new(shutdown: Shutdown) -> Self {
        Self { shutdown }
    }
}

impl Pause for InterruptibleSleep {
    fn pause(&mut self, duration: Duration) {
        self.shutdown.sleep(duration);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Fix { record: FixRecord, km_to_ref: f64 },
    NoFix,
    /// Shutdown arrived mid-session; nothing final was shown
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

pub struct Orchestrator<S, F, P> {
    config: SessionConfig,
    reference: ReferencePoint,
    sampler: S,
    fixes: F,
    pause: P,
    shutdown: Shutdown,
    renderer: Option<StatusRenderer>,
    geometry: Geometry,
}

impl<S, F, P> Orchestrator<S, F, P>
where
    S: GpsSampler,
    F: FixSource,
    P: Pause,
{
    pub fn new(
        config: SessionConfig,
        reference: ReferencePoint,
        sampler: S,
        fixes: F,
        pause: P,
        renderer: StatusRenderer,
        shutdown: Shutdown,
    ) -> Self {
        let geometry = renderer.geometry();
        Self {
            config,
            reference,
            sampler,
            fixes,
            pause,
            shutdown,
            renderer: Some(renderer),
            geometry,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run one acquisition session to completion
    pub fn run_session(&mut self) -> SessionReport {
        let started_at = Utc::now();
        let started = Instant::now();
        info!(
            "Acquisition session started (max {} attempts, {:?} apart)",
            self.config.max_attempts, self.config.retry_delay
        );

        // Only missing if a previous session unwound with the animation running
        let mut renderer = self
            .renderer
            .take()
            .unwrap_or_else(|| {
                StatusRenderer::new(Box::new(EchoBackend::new(self.geometry)), self.shutdown.clone())
            });

        renderer.show_lines(&checking_lines(started_at), self.config.status_hold);

        let animation = renderer.spawn_swim();
        let (found, attempts) = self.poll_for_fix();
        let mut renderer = animation.cancel();

        let outcome = match found {
            Some(record) => match record.position() {
                Some((lat, lon)) => {
                    let km_to_ref = self.reference.distance_km(lat, lon);
                    info!(
                        "Fix on attempt {}: {:.5},{:.5} ({:.1} km to {})",
                        attempts, lat, lon, km_to_ref, self.reference.name
                    );
                    renderer.show_lines(
                        &fix_summary_lines(&record, km_to_ref, &self.reference),
                        self.config.summary_hold,
                    );
                    SessionOutcome::Fix { record, km_to_ref }
                }
                None => {
                    warn!("Fix source returned a record without coordinates");
                    renderer.show_lines(&no_fix_lines(), self.config.summary_hold);
                    SessionOutcome::NoFix
                }
            },
            None if self.shutdown.is_requested() => {
                info!("Session interrupted after {} attempts", attempts);
                renderer.clear();
                SessionOutcome::Interrupted
            }
            None => {
                info!("No GPS fix after {} attempts", attempts);
                renderer.show_lines(&no_fix_lines(), self.config.summary_hold);
                SessionOutcome::NoFix
            }
        };

        self.renderer = Some(renderer);
        SessionReport {
            outcome,
            attempts,
            started_at,
            elapsed: started.elapsed(),
        }
    }

    /// The bounded retry loop; returns the fix (if any) and attempts made
    fn poll_for_fix(&mut self) -> (Option<FixRecord>, u32) {
        let max = self.config.max_attempts;
        let mut attempts = 0;
        while attempts < max {
            if self.shutdown.is_requested() {
                break;
            }
            attempts += 1;
            debug!("GPS attempt {}/{}", attempts, max);

            if let Err(e) = self.sampler.sample() {
                warn!("GPS sampler failed on attempt {}: {}", attempts, e);
            }
            if let Some(record) = self.fixes.latest_fix() {
                return (Some(record), attempts);
            }
            if attempts < max {
                self.pause.pause(self.config.retry_delay);
            }
        }
        (None, attempts)
    }
}

fn checking_lines(now: DateTime<Utc>) -> Vec<String> {
    vec![
        "Checking GPS...".to_string(),
        format!("{} UTC", now.format("%H:%M:%S")),
    ]
}

/// Truncate (not round) to `places` decimals so the screen never overstates precision
///
/// Works on the decimal rendering, since `34.23 * 1e5` is just below `3423000.0`.
fn truncate_coordinate(value: f64, places: usize) -> String {
    let full = format!("{:.*}", places.max(9), value);
    match full.find('.') {
        Some(dot) if places == 0 => full[..dot].to_string(),
        Some(dot) => full[..dot + 1 + places].to_string(),
        None => full,
    }
}

pub fn fix_summary_lines(record: &FixRecord, km_to_ref: f64, reference: &ReferencePoint) -> Vec<String> {
    let (lat, lon) = record.position().unwrap_or_default();
    vec![
        format!("Fix: {},", truncate_coordinate(lat, 5)),
        truncate_coordinate(lon, 5),
        distance_line(km_to_ref, reference),
        format!("Sats: {}", record.satellites_label()),
    ]
}

pub fn no_fix_lines() -> Vec<String> {
    vec!["No GPS fix yet".to_string(), "Check sky view...".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DisplayEvent, RecordingBackend};
    use crate::types::FixStatus;
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;
    use std::rc::Rc;

    fn fast_config(max_attempts: u32) -> SessionConfig {
        SessionConfig {
            max_attempts,
            retry_delay: Duration::from_secs(3),
            status_hold: Duration::ZERO,
            summary_hold: Duration::ZERO,
            sampler_timeout: Duration::from_secs(1),
        }
    }

    fn fix_record() -> FixRecord {
        FixRecord {
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            lat: Some(31.28),
            lon: Some(34.23),
            status: FixStatus::Fix,
            satellites: Some("7".to_string()),
            hdop: Some(1.2),
            km_to_ref: None,
            session_id: None,
            source: PathBuf::from("s_gps.csv"),
        }
    }

    fn renderer() -> (StatusRenderer, crate::render::DisplayLog) {
        let (backend, log) = RecordingBackend::new(Geometry::OLED_128X64);
        (
            StatusRenderer::new(Box::new(backend), Shutdown::new())
                .with_frame_interval(Duration::from_millis(5)),
            log,
        )
    }

    #[test]
    fn test_fix_on_third_attempt_sleeps_twice() {
        let calls = Rc::new(Cell::new(0u32));
        let pauses = Rc::new(RefCell::new(Vec::new()));
        let (renderer, log) = renderer();

        let lookups = calls.clone();
        let recorded = pauses.clone();
        let mut orchestrator = Orchestrator::new(
            fast_config(15),
            ReferencePoint::default(),
            || -> crate::Result<()> { Ok(()) },
            move || {
                lookups.set(lookups.get() + 1);
                (lookups.get() == 3).then(fix_record)
            },
            move |d: Duration| recorded.borrow_mut().push(d),
            renderer,
            Shutdown::new(),
        );

        let report = orchestrator.run_session();
        assert_eq!(report.attempts, 3);
        assert_eq!(calls.get(), 3);
        assert_eq!(*pauses.borrow(), vec![Duration::from_secs(3); 2]);
        assert!(matches!(report.outcome, SessionOutcome::Fix { .. }));
        let summary = log.texts().last().cloned().expect("summary");
        assert_eq!(summary[0], "Fix: 31.28000,");
        assert_eq!(summary[3], "Sats: 7");
        assert_eq!(log.events().last(), Some(&DisplayEvent::Clear));
    }

    #[test]
    fn test_exhausted_budget_never_sleeps_after_last_attempt() {
        let samples = Rc::new(Cell::new(0u32));
        let pauses = Rc::new(Cell::new(0u32));
        let (renderer, log) = renderer();

        let counter = samples.clone();
        let pause_counter = pauses.clone();
        let mut orchestrator = Orchestrator::new(
            fast_config(4),
            ReferencePoint::default(),
            move || -> crate::Result<()> {
                counter.set(counter.get() + 1);
                Err(crate::HopeTurtleError::Sampler("no receiver".to_string()))
            },
            || None::<FixRecord>,
            move |_d: Duration| pause_counter.set(pause_counter.get() + 1),
            renderer,
            Shutdown::new(),
        );

        let report = orchestrator.run_session();
        assert_eq!(report.outcome, SessionOutcome::NoFix);
        assert_eq!(report.attempts, 4);
        assert_eq!(samples.get(), 4);
        assert_eq!(pauses.get(), 3);
        assert_eq!(log.texts().last(), Some(&no_fix_lines()));
    }

    #[test]
    fn test_shutdown_stops_retries_and_skips_summary() {
        let shutdown = Shutdown::new();
        let (renderer, log) = renderer();
        let stopper = shutdown.clone();
        let mut orchestrator = Orchestrator::new(
            fast_config(15),
            ReferencePoint::default(),
            || -> crate::Result<()> { Ok(()) },
            || None::<FixRecord>,
            move |_d: Duration| stopper.request(),
            renderer,
            shutdown,
        );

        let report = orchestrator.run_session();
        assert_eq!(report.outcome, SessionOutcome::Interrupted);
        assert_eq!(report.attempts, 1);
        assert!(!log.texts().contains(&no_fix_lines()));
    }

    #[test]
    fn test_zero_attempts_is_no_fix() {
        let (renderer, _log) = renderer();
        let mut orchestrator = Orchestrator::new(
            fast_config(0),
            ReferencePoint::default(),
            || -> crate::Result<()> { Ok(()) },
            || Some(fix_record()),
            |_d: Duration| {},
            renderer,
            Shutdown::new(),
        );
        let report = orchestrator.run_session();
        assert_eq!(report.attempts, 0);
        assert_eq!(report.outcome, SessionOutcome::NoFix);
    }

    #[test]
    fn test_worst_case_duration() {
        let config = SessionConfig::default();
        assert_eq!(
            config.worst_case_duration(),
            Duration::from_secs(15 * 20 + 14 * 3 + 1 + 5)
        );
    }

    #[test]
    fn test_worst_case_duration_saturates() {
        let config = SessionConfig {
            sampler_timeout: Duration::from_secs(u64::MAX),
            retry_delay: Duration::from_secs(u64::MAX),
            ..SessionConfig::default()
        };
        assert_eq!(config.worst_case_duration(), Duration::MAX);
    }

    #[test]
    fn test_truncate_coordinate_does_not_round() {
        assert_eq!(truncate_coordinate(31.283999, 3), "31.283");
        assert_eq!(truncate_coordinate(-34.23419, 4), "-34.2341");
        assert_eq!(truncate_coordinate(34.23, 5), "34.23000");
        assert_eq!(truncate_coordinate(7.9, 0), "7");
    }
}
