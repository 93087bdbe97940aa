//! Display backends
//!
//! The renderer only knows how to turn text into laid-out [`Frame`]s; putting
//! pixels on glass is the backend's job. [`EchoBackend`] prints frames to
//! stdout so every display mode works without the OLED attached, and
//! [`RecordingBackend`] captures them for tests.

use crate::types::{Frame, Geometry};
use crate::Result;
use std::sync::{Arc, Mutex};

/// Fixed glyph width of the 6x10 monospace font every backend lays out for
pub const GLYPH_WIDTH: u32 = 6;

pub trait DisplayBackend: Send {
    fn geometry(&self) -> Geometry;

    fn draw(&mut self, frame: &Frame) -> Result<()>;

    fn clear(&mut self) -> Result<()>;

    /// Short name for log lines
    fn name(&self) -> &'static str;
}

/// Textual stand-in used when no panel is attached
#[derive(Debug, Clone)]
pub struct EchoBackend {
    geometry: Geometry,
}

impl EchoBackend {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry }
    }
}

impl Default for EchoBackend {
    fn default() -> Self {
        Self::new(Geometry::OLED_128X64)
    }
}

impl DisplayBackend for EchoBackend {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn draw(&mut self, frame: &Frame) -> Result<()> {
        match frame.animation_frame {
            Some(index) => {
                println!("[OLED] (simulated swim frame {})", index + 1);
                for line in &frame.lines {
                    println!("{}", line.text);
                }
            }
            None => println!("[OLED] (simulated) {}", frame.texts().join(" | ")),
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

/// What a [`RecordingBackend`] saw, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Text(Vec<String>),
    SwimFrame(usize),
    Clear,
}

/// Shared view of the events a [`RecordingBackend`] captured
#[derive(Debug, Clone, Default)]
pub struct DisplayLog {
    events: Arc<Mutex<Vec<DisplayEvent>>>,
}

impl DisplayLog {
    pub fn events(&self) -> Vec<DisplayEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Text screens only, in order
    pub fn texts(&self) -> Vec<Vec<String>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DisplayEvent::Text(lines) => Some(lines),
                _ => None,
            })
            .collect()
    }

    pub fn swim_frames(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, DisplayEvent::SwimFrame(_)))
            .count()
    }

    fn push(&self, event: DisplayEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Backend that records every frame instead of drawing it
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    geometry: Geometry,
    log: DisplayLog,
}

impl RecordingBackend {
    pub fn new(geometry: Geometry) -> (Self, DisplayLog) {
        let log = DisplayLog::default();
        (
            Self {
                geometry,
                log: log.clone(),
            },
            log,
        )
    }
}

impl DisplayBackend for RecordingBackend {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn draw(&mut self, frame: &Frame) -> Result<()> {
        let event = match frame.animation_frame {
            Some(index) => DisplayEvent::SwimFrame(index),
            None => DisplayEvent::Text(frame.texts()),
        };
        self.log.push(event);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.log.push(DisplayEvent::Clear);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
