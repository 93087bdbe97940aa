use crate::distance::ReferencePoint;
use crate::fixlog::FixSource;
use crate::types::DisplayRequest;
use std::time::Duration;

/// Named screens of the display command surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayMode {
    BootWaking,
    BootAlive,
    GpsSearching,
    Swim,
    Distance,
    Brief,
    Custom(Vec<String>),
    NotifyInstall,
    NotifyUpdate,
    Unknown(String),
}

/// Command names accepted by [`DisplayMode::from_command`]
pub const COMMANDS: [&str; 9] = [
    "boot-waking",
    "boot-alive",
    "gps-searching",
    "swim",
    "distance",
    "brief",
    "custom",
    "notify-install",
    "notify-update",
];

impl DisplayMode {
    /// Map a command word (case-insensitive) and its trailing arguments to a mode
    pub fn from_command(command: &str, args: &[String]) -> Self {
        match command.to_ascii_lowercase().as_str() {
            "boot-waking" => DisplayMode::BootWaking,
            "boot-alive" => DisplayMode::BootAlive,
            "gps-searching" => DisplayMode::GpsSearching,
            "swim" => DisplayMode::Swim,
            "distance" => DisplayMode::Distance,
            "brief" => DisplayMode::Brief,
            "custom" => DisplayMode::Custom(args.to_vec()),
            "notify-install" => DisplayMode::NotifyInstall,
            "notify-update" => DisplayMode::NotifyUpdate,
            other => DisplayMode::Unknown(other.to_string()),
        }
    }

    /// Resolve the mode to concrete lines; `brief` and `distance` look up the latest fix
    pub fn request(
        &self,
        fixes: &dyn FixSource,
        reference: &ReferencePoint,
        hold: Duration,
    ) -> DisplayRequest {
        match self {
            DisplayMode::BootWaking => DisplayRequest::finite(["Hope Turtle", "is waking up!"], hold),
            DisplayMode::BootAlive => DisplayRequest::finite(["Hope Turtle", "is alive!"], hold),
            DisplayMode::GpsSearching => {
                DisplayRequest::finite(["GPS:", "Searching satellites..."], hold)
            }
            DisplayMode::Swim => DisplayRequest::looping(),
            DisplayMode::Distance => DisplayRequest::finite(distance_lines(fixes, reference), hold),
            DisplayMode::Brief => DisplayRequest::finite(brief_lines(fixes, reference), hold),
            DisplayMode::Custom(lines) => custom_request(lines, hold),
            DisplayMode::NotifyInstall => DisplayRequest::finite(["Hope Turtle", "installed!"], hold),
            DisplayMode::NotifyUpdate => DisplayRequest::finite(["Hope Turtle", "updated!"], hold),
            DisplayMode::Unknown(command) => {
                DisplayRequest::finite(["Unknown cmd:".to_string(), command.clone()], hold)
            }
        }
    }
}

/// Free text; a "Checking GPS" banner stays up until the next screen replaces it
fn custom_request(lines: &[String], hold: Duration) -> DisplayRequest {
    if lines.is_empty() {
        return DisplayRequest::finite(["(no text)"], hold);
    }
    if lines
        .iter()
        .any(|line| line.to_lowercase().contains("checking gps"))
    {
        DisplayRequest::indefinite(lines.iter().cloned())
    } else {
        DisplayRequest::finite(lines.iter().cloned(), hold)
    }
}

/// `<km> km -> <ref>` line shared by every summary screen
pub fn distance_line(km: f64, reference: &ReferencePoint) -> String {
    format!("{:.1} km -> {}", km, reference.name)
}

fn brief_lines(fixes: &dyn FixSource, reference: &ReferencePoint) -> Vec<String> {
    let fix = fixes.latest_fix();
    match fix.as_ref().and_then(|f| f.position().map(|p| (f, p))) {
        Some((fix, (lat, lon))) => vec![
            format!("{:.3},{:.3}", lat, lon),
            distance_line(reference.distance_km(lat, lon), reference),
            format!("Sats: {}", fix.satellites_label()),
        ],
        None => vec!["No fix yet".to_string(), "Check GPS...".to_string()],
    }
}

fn distance_lines(fixes: &dyn FixSource, reference: &ReferencePoint) -> Vec<String> {
    let fix = fixes.latest_fix();
    match fix.as_ref().and_then(|f| f.position().map(|p| (f, p))) {
        Some((fix, (lat, lon))) => vec![
            distance_line(reference.distance_km(lat, lon), reference),
            format!("({:.3},{:.3})", lat, lon),
            format!("Sats: {}", fix.satellites_label()),
            fix.timestamp.clone(),
        ],
        None => vec!["No last fix".to_string(), "found".to_string()],
    }
}
