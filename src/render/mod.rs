//! Status renderer for the OLED
//!
//! Text screens are centred on the panel and held according to a
//! [`HoldPolicy`]. The swim animation runs on its own thread through
//! [`AnimationHandle`]. When no panel is attached the [`EchoBackend`] prints
//! the same screens with the same timing, so nothing here needs hardware.

pub mod animation;
pub mod backend;
pub mod layout;
pub mod modes;
#[cfg(feature = "hardware")]
pub mod oled;

pub use animation::*;
pub use backend::*;
pub use layout::*;
pub use modes::*;

use crate::shutdown::Shutdown;
use crate::types::{DisplayRequest, Geometry, HoldPolicy};
use log::{debug, warn};
use std::time::Duration;

/// Swim animation pace, one frame per second
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_secs(1);

pub struct StatusRenderer {
    backend: Box<dyn DisplayBackend>,
    shutdown: Shutdown,
    frame_interval: Duration,
}

impl StatusRenderer {
    pub fn new(backend: Box<dyn DisplayBackend>, shutdown: Shutdown) -> Self {
        Self {
            backend,
            shutdown,
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }

    /// Renderer over the textual echo backend
    pub fn echo(geometry: Geometry) -> Self {
        Self::new(Box::new(EchoBackend::new(geometry)), Shutdown::new())
    }

    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }

    pub fn geometry(&self) -> Geometry {
        self.backend.geometry()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Render `request` honouring its hold policy
    ///
    /// Looping and indefinite requests only return once shutdown is requested.
    pub fn present(mut self, request: &DisplayRequest) -> Self {
        match request.hold {
            HoldPolicy::Finite(hold) => {
                self.show_lines(&request.lines, hold);
                self
            }
            HoldPolicy::Indefinite => {
                self.show_until_stopped(&request.lines);
                self
            }
            HoldPolicy::Looping => {
                let shutdown = self.shutdown.clone();
                let animation = self.spawn_swim();
                shutdown.wait();
                animation.cancel()
            }
        }
    }

    /// Render, hold for `hold`, then clear
    pub fn show_lines(&mut self, lines: &[String], hold: Duration) {
        self.draw_text(lines);
        if self.shutdown.sleep(hold) {
            debug!("Hold interrupted by shutdown");
        }
        self.clear();
    }

    /// Render and block until shutdown; the screen is left as is
    pub fn show_until_stopped(&mut self, lines: &[String]) {
        self.draw_text(lines);
        debug!("Holding screen until shutdown");
        self.shutdown.wait();
    }

    /// Start the swim animation; the renderer lives on the animation thread until cancelled
    pub fn spawn_swim(self) -> AnimationHandle {
        AnimationHandle::spawn(self)
    }

    pub fn clear(&mut self) {
        if let Err(e) = self.backend.clear() {
            warn!("{} display clear failed: {}", self.backend.name(), e);
        }
    }

    fn draw_text(&mut self, lines: &[String]) {
        let frame = center_text(lines, self.geometry(), GLYPH_WIDTH);
        if let Err(e) = self.backend.draw(&frame) {
            warn!("{} display draw failed: {}", self.backend.name(), e);
        }
    }

    fn draw_swim_frame(&mut self, index: usize) {
        let art: Vec<String> = SWIM_FRAMES[index].iter().map(|l| l.to_string()).collect();
        let mut frame = center_block(&art, self.geometry(), GLYPH_WIDTH, SWIM_LINE_HEIGHT);
        frame.animation_frame = Some(index);
        if let Err(e) = self.backend.draw(&frame) {
            warn!("{} swim frame failed: {}", self.backend.name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frame;
    use crate::HopeTurtleError;
    use std::thread;
    use std::time::Instant;

    fn recording(geometry: Geometry) -> (StatusRenderer, DisplayLog) {
        let (backend, log) = RecordingBackend::new(geometry);
        let renderer = StatusRenderer::new(Box::new(backend), Shutdown::new())
            .with_frame_interval(Duration::from_millis(10));
        (renderer, log)
    }

    #[test]
    fn test_finite_hold_draws_then_clears() {
        let (mut renderer, log) = recording(Geometry::OLED_128X64);
        let started = Instant::now();
        renderer.show_lines(&["a".to_string(), "b".to_string()], Duration::from_millis(30));
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(
            log.events(),
            vec![
                DisplayEvent::Text(vec!["a".to_string(), "b".to_string()]),
                DisplayEvent::Clear
            ]
        );
    }

    #[test]
    fn test_small_panel_truncates_lines() {
        let (mut renderer, log) = recording(Geometry::OLED_128X32);
        let lines: Vec<String> = (1..=5).map(|i| format!("line {i}")).collect();
        renderer.show_lines(&lines, Duration::ZERO);
        assert_eq!(log.texts()[0].len(), 3);
    }

    #[test]
    fn test_swim_alternates_frames_until_cancelled() {
        let (renderer, log) = recording(Geometry::OLED_128X64);
        let animation = renderer.spawn_swim();
        thread::sleep(Duration::from_millis(60));
        let started = Instant::now();
        let _renderer = animation.cancel();
        assert!(started.elapsed() < Duration::from_millis(500));

        let events = log.events();
        assert_eq!(events.first(), Some(&DisplayEvent::SwimFrame(0)));
        assert_eq!(events.get(1), Some(&DisplayEvent::SwimFrame(1)));
        assert_eq!(events.last(), Some(&DisplayEvent::Clear));
        let clears = events.iter().filter(|e| **e == DisplayEvent::Clear).count();
        assert_eq!(clears, 1);
    }

    #[test]
    fn test_cancel_is_observed_within_one_frame() {
        let (backend, _log) = RecordingBackend::new(Geometry::OLED_128X64);
        let renderer = StatusRenderer::new(Box::new(backend), Shutdown::new());
        let animation = renderer.spawn_swim();
        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        let _renderer = animation.cancel();
        assert!(started.elapsed() < DEFAULT_FRAME_INTERVAL);
    }

    #[test]
    fn test_dropped_handle_stops_animation() {
        let (renderer, log) = recording(Geometry::OLED_128X64);
        drop(renderer.spawn_swim());
        let frames = log.swim_frames();
        thread::sleep(Duration::from_millis(40));
        assert_eq!(log.swim_frames(), frames);
        assert_eq!(log.events().last(), Some(&DisplayEvent::Clear));
    }

    #[test]
    fn test_renderer_is_usable_after_cancel() {
        let (renderer, log) = recording(Geometry::OLED_128X64);
        let mut renderer = renderer.spawn_swim().cancel();
        renderer.show_lines(&["done".to_string()], Duration::ZERO);
        assert_eq!(log.texts(), vec![vec!["done".to_string()]]);
    }

    #[test]
    fn test_indefinite_hold_returns_on_shutdown() {
        let (backend, log) = RecordingBackend::new(Geometry::OLED_128X64);
        let shutdown = Shutdown::new();
        let renderer = StatusRenderer::new(Box::new(backend), shutdown.clone());
        let remote = shutdown.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.request();
        });
        let request = DisplayRequest::indefinite(["Checking GPS..."]);
        let _renderer = renderer.present(&request);
        stopper.join().expect("join");
        assert_eq!(log.events(), vec![DisplayEvent::Text(vec!["Checking GPS...".to_string()])]);
    }

    struct BrokenBackend;

    impl DisplayBackend for BrokenBackend {
        fn geometry(&self) -> Geometry {
            Geometry::OLED_128X32
        }

        fn draw(&mut self, _frame: &Frame) -> crate::Result<()> {
            Err(HopeTurtleError::Display("bus error".to_string()))
        }

        fn clear(&mut self) -> crate::Result<()> {
            Err(HopeTurtleError::Display("bus error".to_string()))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_backend_failures_are_not_fatal() {
        let mut renderer = StatusRenderer::new(Box::new(BrokenBackend), Shutdown::new())
            .with_frame_interval(Duration::from_millis(5));
        renderer.show_lines(&["x".to_string()], Duration::ZERO);
        let renderer = renderer.spawn_swim().cancel();
        assert_eq!(renderer.backend_name(), "broken");
    }
}
