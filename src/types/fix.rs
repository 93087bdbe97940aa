use std::fmt;
use std::path::PathBuf;

#[cfg(feature = "json")]
use serde::Serialize;

/// GPS lock state as written in the `status` column of a session log
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub enum FixStatus {
    Fix,
    Searching,
    Other(String),
}

impl FixStatus {
    /// Case-insensitive parse; anything that is not `fix` or `searching` is kept verbatim
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("fix") {
            FixStatus::Fix
        } else if trimmed.eq_ignore_ascii_case("searching") {
            FixStatus::Searching
        } else {
            FixStatus::Other(trimmed.to_string())
        }
    }

    pub fn is_fix(&self) -> bool {
        matches!(self, FixStatus::Fix)
    }
}

impl fmt::Display for FixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixStatus::Fix => write!(f, "fix"),
            FixStatus::Searching => write!(f, "searching"),
            FixStatus::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// One row of a `<session-id>_gps.csv` log
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct FixRecord {
    pub timestamp: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub status: FixStatus,
    pub satellites: Option<String>,
    pub hdop: Option<f64>,
    /// Distance the sampler itself logged, if any
    pub km_to_ref: Option<f64>,
    pub session_id: Option<String>,
    pub source: PathBuf,
}

impl FixRecord {
    /// Both coordinates, only when the row is a usable fix
    pub fn position(&self) -> Option<(f64, f64)> {
        if !self.status.is_fix() {
            return None;
        }
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn is_usable_fix(&self) -> bool {
        self.position().is_some()
    }

    /// Satellite count for display, `?` when the sampler left it blank
    pub fn satellites_label(&self) -> &str {
        self.satellites.as_deref().unwrap_or("?")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str, lat: Option<f64>, lon: Option<f64>) -> FixRecord {
        FixRecord {
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            lat,
            lon,
            status: FixStatus::parse(status),
            satellites: None,
            hdop: None,
            km_to_ref: None,
            session_id: None,
            source: PathBuf::from("a_gps.csv"),
        }
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(FixStatus::parse("FIX"), FixStatus::Fix);
        assert_eq!(FixStatus::parse(" Fix "), FixStatus::Fix);
        assert_eq!(FixStatus::parse("Searching"), FixStatus::Searching);
        assert_eq!(
            FixStatus::parse("no_lock"),
            FixStatus::Other("no_lock".to_string())
        );
    }

    #[test]
    fn test_usable_fix_requires_status_and_both_coordinates() {
        assert!(record("fix", Some(31.28), Some(34.23)).is_usable_fix());
        assert!(!record("fix", Some(31.28), None).is_usable_fix());
        assert!(!record("fix", None, Some(34.23)).is_usable_fix());
        assert!(!record("searching", Some(31.28), Some(34.23)).is_usable_fix());
    }

    #[test]
    fn test_satellites_label_defaults_to_question_mark() {
        let mut rec = record("fix", Some(1.0), Some(2.0));
        assert_eq!(rec.satellites_label(), "?");
        rec.satellites = Some("7".to_string());
        assert_eq!(rec.satellites_label(), "7");
    }
}
