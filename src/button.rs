//! Momentary button watcher
//!
//! The button pulls the line low when pressed. A press is a high→low edge seen
//! while idle and at least the debounce interval after the previous accepted
//! press (or after the last session finished). While a session runs nothing
//! reads the pin, and on returning to idle the current level becomes the new
//! baseline, so a press made or still held during the session never fires.

use crate::shutdown::Shutdown;
use embedded_hal::digital::InputPin;
use log::{debug, info, warn};
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// An accepted press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Busy,
}

/// Edge detector with a quiet interval between accepted presses
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    /// `true` = line high = released
    last_high: bool,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration, initial_high: bool) -> Self {
        Self {
            quiet,
            last_high: initial_high,
            last_accepted: None,
        }
    }

    /// Feed one sample; returns `true` when it is an accepted press
    pub fn update(&mut self, high: bool, now: Instant) -> bool {
        let falling = self.last_high && !high;
        self.last_high = high;
        if !falling {
            return false;
        }
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.quiet {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }

    /// Take `high` as the baseline and restart the quiet interval at `now`
    pub fn rearm(&mut self, high: bool, now: Instant) {
        self.last_high = high;
        self.last_accepted = Some(now);
    }
}

pub struct ButtonWatcher<P> {
    pin: P,
    debouncer: Debouncer,
    poll_interval: Duration,
    shutdown: Shutdown,
    state: WatcherState,
}

impl<P: InputPin> ButtonWatcher<P> {
    pub fn new(mut pin: P, debounce: Duration, poll_interval: Duration, shutdown: Shutdown) -> Self {
        let initial_high = read_high(&mut pin);
        Self {
            pin,
            debouncer: Debouncer::new(debounce, initial_high),
            poll_interval,
            shutdown,
            state: WatcherState::Idle,
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Block until a debounced press, or `None` once shutdown is requested
    pub fn wait_for_press(&mut self) -> Option<ButtonEvent> {
        loop {
            if self.shutdown.is_requested() {
                return None;
            }
            let high = read_high(&mut self.pin);
            let now = Instant::now();
            if self.debouncer.update(high, now) {
                debug!("Button press accepted");
                return Some(ButtonEvent { at: now });
            }
            thread::sleep(self.poll_interval);
        }
    }

    /// Run `on_press` once per accepted press until shutdown; returns presses handled
    pub fn run<F>(&mut self, mut on_press: F) -> u32
    where
        F: FnMut(ButtonEvent),
    {
        info!("Button listener active");
        let mut handled = 0;
        while let Some(event) = self.wait_for_press() {
            self.state = WatcherState::Busy;
            on_press(event);
            handled += 1;
            self.return_to_idle();
        }
        info!("Button listener stopping after {} presses", handled);
        handled
    }

    /// Give the pin back; dropping it releases the GPIO line
    pub fn release(self) -> P {
        self.pin
    }

    fn return_to_idle(&mut self) {
        let high = read_high(&mut self.pin);
        self.debouncer.rearm(high, Instant::now());
        self.state = WatcherState::Idle;
    }
}

/// A failed read counts as released so a flaky line cannot start sessions
fn read_high<P: InputPin>(pin: &mut P) -> bool {
    match pin.is_high() {
        Ok(high) => high,
        Err(e) => {
            warn!("Button read failed: {:?}", e);
            true
        }
    }
}

/// Button without hardware, pressed from software (stdin in `--simulate` mode)
#[derive(Debug, Clone, Default)]
pub struct SimulatedButton {
    pressed: Arc<AtomicBool>,
}

impl SimulatedButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pressed(&self, pressed: bool) {
        self.pressed.store(pressed, Ordering::SeqCst);
    }

    /// Press and release with a hold long enough for the poller to see it
    pub fn tap(&self, hold: Duration) {
        self.set_pressed(true);
        thread::sleep(hold);
        self.set_pressed(false);
    }
}

impl embedded_hal::digital::ErrorType for SimulatedButton {
    type Error = Infallible;
}

impl InputPin for SimulatedButton {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.pressed.load(Ordering::SeqCst))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pressed.load(Ordering::SeqCst))
    }
}

/// Request the button line from a GPIO character device as an input
///
/// The line needs an external (or device-tree) pull-up; the character device
/// v1 API cannot set bias.
#[cfg(feature = "hardware")]
pub fn open_cdev_pin(
    chip: &std::path::Path,
    line: u32,
) -> crate::Result<linux_embedded_hal::CdevPin> {
    use crate::HopeTurtleError;
    use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};

    fn gpio<E: std::fmt::Display>(e: E) -> HopeTurtleError {
        HopeTurtleError::Gpio(e.to_string())
    }

    let mut chip = Chip::new(chip).map_err(gpio)?;
    let handle = chip
        .get_line(line)
        .map_err(gpio)?
        .request(LineRequestFlags::INPUT, 1, "hopeturtle-button")
        .map_err(gpio)?;
    let pin = linux_embedded_hal::CdevPin::new(handle).map_err(gpio)?;
    info!("Button on GPIO line {} ready", line);
    Ok(pin)
}
