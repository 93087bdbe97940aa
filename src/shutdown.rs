//! Process-wide stop signal
//!
//! SIGINT/SIGTERM only flip an atomic flag; every blocking loop in the crate
//! (button polling, indefinite holds, retry delays) checks it and unwinds
//! normally so the GPIO line and any running animation are released by drop.

use crate::{HopeTurtleError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

static SIGNAL_RECEIVED: AtomicBool = AtomicBool::new(false);

/// How often blocking waits re-check the flag
pub const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Only uses atomic operations (async-signal-safe).
extern "C" fn handle_stop_signal(_: libc::c_int) {
    SIGNAL_RECEIVED.store(true, Ordering::SeqCst);
}

#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    follows_signals: bool,
}

impl Shutdown {
    /// A flag that only trips when [`Shutdown::request`] is called
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag that also trips on SIGINT or SIGTERM
    pub fn install_signal_handlers() -> Result<Self> {
        let handler = handle_stop_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        for signal in [libc::SIGINT, libc::SIGTERM] {
            // SAFETY: the handler only stores to a static atomic.
            if unsafe { libc::signal(signal, handler) } == libc::SIG_ERR {
                return Err(HopeTurtleError::Io(std::io::Error::last_os_error()));
            }
        }
        Ok(Self {
            requested: Arc::new(AtomicBool::new(false)),
            follows_signals: true,
        })
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
            || (self.follows_signals && SIGNAL_RECEIVED.load(Ordering::SeqCst))
    }

    /// Sleep for `duration` unless stopped first; returns `true` if stopped
    ///
    /// A duration too long to express as a deadline waits for the stop alone.
    pub fn sleep(&self, duration: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(duration) else {
            self.wait();
            return true;
        };
        loop {
            if self.is_requested() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(SHUTDOWN_POLL.min(deadline - now));
        }
    }

    /// Block until stopped
    pub fn wait(&self) {
        while !self.is_requested() {
            thread::sleep(SHUTDOWN_POLL);
        }
    }
}
