//! Looping "swim" animation on its own thread
//!
//! Spawning moves the whole [`StatusRenderer`] onto the animation thread, so
//! the panel has exactly one owner at a time. Cancelling consumes the handle,
//! stops the loop within one frame interval and hands the renderer back. A
//! handle that is dropped without being cancelled (an unwinding session) stops
//! the loop from `Drop`.

use super::{EchoBackend, StatusRenderer};
use crate::shutdown::Shutdown;
use crate::types::Geometry;
use log::{debug, warn};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// The two swim frames
pub const SWIM_FRAMES: [[&str; 5]; 2] = [
    [
        "   _________    ____   ",
        "  /           \\ |  o | ",
        " |            |/ ___\\| ",
        " |____________|_/      ",
        "   |__|  |__|          ",
    ],
    [
        "   _________    ____   ",
        "  /           \\ |  o | ",
        " |            |/ ___\\| ",
        " |____________|_/      ",
        "   |_  |__|  _|        ",
    ],
];

/// Line pitch of the swim art, independent of panel height
pub const SWIM_LINE_HEIGHT: u32 = 10;

struct Finished {
    renderer: StatusRenderer,
    frames_drawn: usize,
}

/// A running swim animation, owned by whoever spawned it
pub struct AnimationHandle {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<Finished>>,
    geometry: Geometry,
    frame_interval: Duration,
    shutdown: Shutdown,
}

impl AnimationHandle {
    pub(super) fn spawn(renderer: StatusRenderer) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let interval = renderer.frame_interval;
        let geometry = renderer.geometry();
        let shutdown = renderer.shutdown.clone();

        let spawned = thread::Builder::new()
            .name("swim".to_string())
            .spawn(move || {
                let mut renderer = renderer;
                let mut frames_drawn = 0usize;
                loop {
                    renderer.draw_swim_frame(frames_drawn % SWIM_FRAMES.len());
                    frames_drawn += 1;
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        // Stop message or the handle went away
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                renderer.clear();
                Finished {
                    renderer,
                    frames_drawn,
                }
            });

        let worker = match spawned {
            Ok(worker) => Some(worker),
            Err(e) => {
                warn!("Cannot start swim animation: {}", e);
                None
            }
        };

        Self {
            stop: Some(stop_tx),
            worker,
            geometry,
            frame_interval: interval,
            shutdown,
        }
    }

    /// Stop the animation and take the display back
    pub fn cancel(mut self) -> StatusRenderer {
        match self.finish() {
            Some(renderer) => renderer,
            None => StatusRenderer::new(
                Box::new(EchoBackend::new(self.geometry)),
                self.shutdown.clone(),
            )
            .with_frame_interval(self.frame_interval),
        }
    }

    fn finish(&mut self) -> Option<StatusRenderer> {
        if let Some(stop) = self.stop.take() {
            // The worker may already be gone; joining below reports that
            let _ = stop.send(());
        }
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(finished) => {
                debug!("Swim animation stopped after {} frames", finished.frames_drawn);
                Some(finished.renderer)
            }
            Err(_) => {
                warn!("Swim animation thread panicked; display falls back to echo");
                None
            }
        }
    }
}

impl Drop for AnimationHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            debug!("Swim animation handle dropped without cancel; stopping it");
            let _ = self.finish();
        }
    }
}
