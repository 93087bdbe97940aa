//! HopeTurtle Logger Library
//!
//! Button-triggered GPS acquisition with live feedback on a small SSD1306
//! OLED. A press starts a bounded retry loop that runs the external GPS
//! sampler and scans the session logs for a fix, while a swim animation runs
//! on its own thread; the session ends with a fix summary (coordinates,
//! distance to the reference point, satellites) or a "no fix" screen.
//!
//! # Features
//!
//! - **`cli`** (default): Build the `hopeturtle` command-line binary
//! - **`json`**: JSON output for `hopeturtle latest --json`
//! - **`hardware`**: SSD1306-over-I2C display and GPIO character-device button backends
//!
//! # Quick Start
//!
//! Look up the latest fix in a data directory:
//! ```rust,no_run
//! use hopeturtle::{latest_fix, ReferencePoint};
//! use std::path::Path;
//!
//! let reference = ReferencePoint::default();
//! if let Some(fix) = latest_fix(Path::new("/home/hopeturtle/hopeturtle/data")) {
//!     if let Some((lat, lon)) = fix.position() {
//!         println!("{:.1} km to {}", reference.distance_km(lat, lon), reference.name);
//!     }
//! }
//! ```
//!
//! Run one acquisition session against the textual display:
//! ```rust,no_run
//! use hopeturtle::{
//!     CommandSampler, FixLog, Geometry, InterruptibleSleep, Orchestrator, ReferencePoint,
//!     SessionConfig, Shutdown, StatusRenderer,
//! };
//! use std::time::Duration;
//!
//! let shutdown = Shutdown::new();
//! let sampler = CommandSampler::from_command_line("python3 gps_snapshot.py", Duration::from_secs(20)).unwrap();
//! let mut orchestrator = Orchestrator::new(
//!     SessionConfig::default(),
//!     ReferencePoint::default(),
//!     sampler,
//!     FixLog::new("/home/hopeturtle/hopeturtle/data"),
//!     InterruptibleSleep::new(shutdown.clone()),
//!     StatusRenderer::echo(Geometry::OLED_128X64),
//!     shutdown,
//! );
//! let report = orchestrator.run_session();
//! println!("{:?} after {} attempts", report.outcome, report.attempts);
//! ```
//!
//! # Public API
//!
//! ## Acquisition
//! - [`Orchestrator`] - One session: animation, bounded retry loop, final screen
//! - [`ButtonWatcher`] - Debounced press detection over any `embedded_hal` input pin
//! - [`CommandSampler`] - Runs the external GPS sampler with a timeout
//!
//! ## Fix Logs
//! - [`latest_fix`] - Newest usable fix across `*_gps.csv` session logs
//! - [`FixLog`] - [`FixSource`] over a data directory
//! - [`haversine_km`] - Great-circle distance
//!
//! ## Display
//! - [`StatusRenderer`] - Centred text screens with finite or indefinite holds
//! - [`AnimationHandle`] - The running swim animation
//! - [`DisplayMode`] - Named screens of the display command surface

// Module declarations
pub mod button;
pub mod config;
pub mod distance;
pub mod error;
pub mod fixlog;
pub mod render;
pub mod sampler;
pub mod session;
pub mod shutdown;
pub mod types;

// Re-export everything from modules for convenience
pub use button::*;
pub use config::*;
pub use distance::*;
pub use error::*;
pub use fixlog::*;
pub use render::*;
pub use sampler::*;
pub use session::*;
pub use shutdown::*;
pub use types::*;
