use std::time::Duration;

/// How long a rendered message stays on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldPolicy {
    /// Render, wait, then clear
    Finite(Duration),
    /// Render and block until the process is told to stop
    Indefinite,
    /// Alternate the two swim frames until cancelled
    Looping,
}

/// A render instruction: the lines to show and how long to keep them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRequest {
    pub lines: Vec<String>,
    pub hold: HoldPolicy,
}

impl DisplayRequest {
    pub fn finite<S: Into<String>>(lines: impl IntoIterator<Item = S>, hold: Duration) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            hold: HoldPolicy::Finite(hold),
        }
    }

    pub fn indefinite<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            hold: HoldPolicy::Indefinite,
        }
    }

    pub fn looping() -> Self {
        Self {
            lines: Vec::new(),
            hold: HoldPolicy::Looping,
        }
    }
}

/// Pixel dimensions of the attached panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub const OLED_128X64: Geometry = Geometry {
        width: 128,
        height: 64,
    };
    pub const OLED_128X32: Geometry = Geometry {
        width: 128,
        height: 32,
    };

    /// Text line pitch; 0.91" and 0.96" panels both use the tight pitch
    pub fn line_height(&self) -> u32 {
        if self.height <= 64 {
            10
        } else {
            12
        }
    }

    /// Lines that fit on this panel, never more than seven
    pub fn max_lines(&self) -> usize {
        const MAX_TEXT_LINES: u32 = 7;
        (self.height / self.line_height()).clamp(1, MAX_TEXT_LINES) as usize
    }
}

/// One line of text at its top-left pixel position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLine {
    pub text: String,
    pub x: i32,
    pub y: i32,
}

/// A fully laid-out screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub lines: Vec<PlacedLine>,
    /// Index of the swim frame this screen shows, `None` for text screens
    pub animation_frame: Option<usize>,
}

impl Frame {
    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(|line| line.text.clone()).collect()
    }
}
