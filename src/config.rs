//! Environment-driven configuration
//!
//! Every knob has a default that matches the stock HopeTurtle build; `HT_*`
//! environment variables override them and the CLI overrides those. A value
//! that does not parse is reported and the default is kept, so a typo in a
//! service file never stops the logger from starting.

use crate::button::{DEFAULT_DEBOUNCE, DEFAULT_POLL_INTERVAL};
use crate::distance::ReferencePoint;
use crate::sampler::DEFAULT_SAMPLER_TIMEOUT;
use crate::session::SessionConfig;
use log::warn;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Hold for canned display-command screens
pub const DEFAULT_MESSAGE_HOLD: Duration = Duration::from_secs(4);

/// Ceiling for configured timeouts and delays
pub const MAX_WAIT_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonConfig {
    pub gpio_chip: PathBuf,
    /// BCM line number (GPIO22 is physical pin 15)
    pub line: u32,
    pub debounce: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    pub i2c_bus: PathBuf,
    /// 32 for the 0.91" module, 64 for the 0.96" one
    pub height: u32,
    pub message_hold: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub reference: ReferencePoint,
    pub sampler_command: String,
    pub session: SessionConfig,
    pub button: ButtonConfig,
    pub display: DisplayConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable lookup (the process environment in production)
    pub fn from_lookup<L>(lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME").unwrap_or_else(|| "/home/hopeturtle".to_string());
        let defaults = ReferencePoint::default();

        let data_dir = lookup("HT_DATA_DIR")
            .map(|dir| expand_home(&dir, &home))
            .unwrap_or_else(|| PathBuf::from(&home).join("hopeturtle").join("data"));

        let reference = ReferencePoint {
            name: lookup("HT_REF_NAME").unwrap_or(defaults.name),
            lat: parsed(&lookup, "HT_REF_LAT", defaults.lat),
            lon: parsed(&lookup, "HT_REF_LON", defaults.lon),
        };

        let sampler_command = lookup("HT_GPS_CMD").unwrap_or_else(|| {
            format!("python3 {}/hopeturtle/src/gps_snapshot.py", home)
        });
        let sampler_timeout = seconds(&lookup, "HT_GPS_TIMEOUT_S", DEFAULT_SAMPLER_TIMEOUT);

        let session_defaults = SessionConfig::default();
        let session = SessionConfig {
            max_attempts: parsed(&lookup, "HT_MAX_ATTEMPTS", session_defaults.max_attempts),
            retry_delay: seconds(&lookup, "HT_RETRY_DELAY_S", session_defaults.retry_delay),
            sampler_timeout,
            ..session_defaults
        };

        let button = ButtonConfig {
            gpio_chip: PathBuf::from(
                lookup("HT_GPIO_CHIP").unwrap_or_else(|| "/dev/gpiochip0".to_string()),
            ),
            line: parsed(&lookup, "HT_BUTTON_PIN", 22),
            debounce: DEFAULT_DEBOUNCE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        };

        let height = match parsed(&lookup, "HT_OLED_HEIGHT", 64u32) {
            32 => 32,
            64 => 64,
            other => {
                warn!("HT_OLED_HEIGHT={} unsupported, using 64", other);
                64
            }
        };
        let display = DisplayConfig {
            i2c_bus: PathBuf::from(
                lookup("HT_I2C_BUS").unwrap_or_else(|| "/dev/i2c-1".to_string()),
            ),
            height,
            message_hold: DEFAULT_MESSAGE_HOLD,
        };

        Self {
            data_dir,
            reference,
            sampler_command,
            session,
            button,
            display,
        }
    }
}

fn parsed<L, T>(lookup: &L, key: &str, default: T) -> T
where
    L: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring {}={:?}: not a valid value, using {}", key, raw, default);
                default
            }
        },
        None => default,
    }
}

/// Whole seconds, capped at [`MAX_WAIT_SECS`]
fn seconds<L>(lookup: &L, key: &str, default: Duration) -> Duration
where
    L: Fn(&str) -> Option<String>,
{
    let secs = parsed(lookup, key, default.as_secs());
    if secs > MAX_WAIT_SECS {
        warn!("{}={} too large, capping at {}", key, secs, MAX_WAIT_SECS);
    }
    Duration::from_secs(secs.min(MAX_WAIT_SECS))
}

/// Expand a leading `~` the way a shell would
pub fn expand_home(path: &str, home: &str) -> PathBuf {
    if path == "~" {
        PathBuf::from(home)
    } else if let Some(rest) = path.strip_prefix("~/") {
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}
