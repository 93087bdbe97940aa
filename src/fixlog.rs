//! Fix log reader
//!
//! The GPS sampler appends one row per sample to `<session-id>_gps.csv` in the
//! data directory. This module finds the most recent usable fix across those
//! files: files newest-modified first, rows within a file newest first. Any file
//! or row that fails to open or parse is skipped so a single corrupt log never
//! hides an older good fix.

use crate::types::{FixRecord, FixStatus};
use crate::Result;
use log::debug;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

/// File name suffix the sampler uses for session logs
pub const LOG_FILE_SUFFIX: &str = "_gps.csv";

/// Anything the orchestrator can ask for the latest fix
pub trait FixSource {
    fn latest_fix(&self) -> Option<FixRecord>;
}

impl<F> FixSource for F
where
    F: Fn() -> Option<FixRecord>,
{
    fn latest_fix(&self) -> Option<FixRecord> {
        self()
    }
}

/// Session logs in one data directory
#[derive(Debug, Clone)]
pub struct FixLog {
    data_dir: PathBuf,
}

impl FixLog {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl FixSource for FixLog {
    fn latest_fix(&self) -> Option<FixRecord> {
        latest_fix(&self.data_dir)
    }
}

/// Raw CSV row; every column is optional so short or sparse rows still decode
#[derive(Debug, Deserialize)]
struct LogRow {
    #[serde(default)]
    timestamp_utc: Option<String>,
    #[serde(default)]
    lat: Option<String>,
    #[serde(default)]
    lon: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    sats: Option<String>,
    #[serde(default)]
    hdop: Option<String>,
    #[serde(default)]
    km_to_ref: Option<String>,
}

/// Return the newest usable fix in `data_dir`, or `None` if no log has one
pub fn latest_fix(data_dir: &Path) -> Option<FixRecord> {
    let files = match log_files_newest_first(data_dir) {
        Ok(files) => files,
        Err(e) => {
            debug!("Cannot list logs in {}: {}", data_dir.display(), e);
            return None;
        }
    };

    for path in files {
        match read_records(&path) {
            Ok(records) => {
                if let Some(record) = records.into_iter().rev().find(FixRecord::is_usable_fix) {
                    debug!(
                        "Latest fix {} from {}",
                        record.timestamp,
                        path.display()
                    );
                    return Some(record);
                }
                debug!("No usable fix in {}", path.display());
            }
            Err(e) => {
                debug!("Skipping unreadable log {}: {}", path.display(), e);
            }
        }
    }

    None
}

/// Session log files in `data_dir`, most recently modified first
///
/// Ties on modification time fall back to file name, newest session id first.
pub fn log_files_newest_first(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*{}",
        glob::Pattern::escape(&data_dir.to_string_lossy()),
        LOG_FILE_SUFFIX
    );

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                debug!("Skipping log entry: {}", e);
                continue;
            }
        };
        match fs::metadata(&path).and_then(|meta| meta.modified()) {
            Ok(modified) if path.is_file() => files.push((modified, path)),
            Ok(_) => {}
            Err(e) => debug!("Cannot stat {}: {}", path.display(), e),
        }
    }

    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Every decodable row of one log in file order; undecodable rows are dropped
pub fn read_records(path: &Path) -> Result<Vec<FixRecord>> {
    let session_id = session_id(path);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    // Column names match case-insensitively
    let headers: csv::StringRecord = reader
        .headers()?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();
    reader.set_headers(headers.clone());
    if !headers.iter().any(|h| h == "status") {
        return Err(crate::HopeTurtleError::Parse(format!(
            "{} has no status column",
            path.display()
        )));
    }

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<LogRow>().enumerate() {
        match row {
            Ok(row) => records.push(to_record(row, session_id.clone(), path)),
            Err(e) => debug!("{} row {}: {}", path.display(), index + 1, e),
        }
    }
    Ok(records)
}

fn to_record(row: LogRow, session_id: Option<String>, path: &Path) -> FixRecord {
    FixRecord {
        timestamp: row.timestamp_utc.unwrap_or_default(),
        lat: parse_float(row.lat.as_deref()),
        lon: parse_float(row.lon.as_deref()),
        status: FixStatus::parse(row.status.as_deref().unwrap_or("")),
        satellites: row.sats.filter(|s| !s.is_empty()),
        hdop: parse_float(row.hdop.as_deref()),
        km_to_ref: parse_float(row.km_to_ref.as_deref()),
        session_id,
        source: path.to_path_buf(),
    }
}

fn parse_float(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// `20240101T000000_gps.csv` -> `20240101T000000`
pub fn session_id(path: &Path) -> Option<String> {
    static SESSION_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = SESSION_RE
        .get_or_init(|| Regex::new(r"^(?P<session>.+)_gps\.csv$").ok())
        .as_ref()?;
    let name = path.file_name()?.to_str()?;
    re.captures(name)
        .and_then(|caps| caps.name("session"))
        .map(|m| m.as_str().to_string())
}
