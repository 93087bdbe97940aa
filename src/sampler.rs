//! GPS sampler invocation
//!
//! The sampler is an external program that reads the receiver once and appends
//! a row to the current session log. Its exit status and output are not part of
//! the contract; only the row it leaves behind matters.

use crate::shutdown::Shutdown;
use crate::{HopeTurtleError, Result};
use log::debug;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Default upper bound on one sampler run before it is killed
pub const DEFAULT_SAMPLER_TIMEOUT: Duration = Duration::from_secs(20);

const WAIT_POLL: Duration = Duration::from_millis(50);

pub trait GpsSampler {
    fn sample(&mut self) -> Result<()>;
}

impl<F> GpsSampler for F
where
    F: FnMut() -> Result<()>,
{
    fn sample(&mut self) -> Result<()> {
        self()
    }
}

/// Runs the sampler program as a subprocess with a timeout
#[derive(Debug, Clone)]
pub struct CommandSampler {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    shutdown: Option<Shutdown>,
}

impl CommandSampler {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            shutdown: None,
        }
    }

    /// Stop waiting for (and kill) a running sampler once `shutdown` is requested
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Build from a whitespace-separated command line such as `python3 gps_snapshot.py`
    pub fn from_command_line(command_line: &str, timeout: Duration) -> Result<Self> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| HopeTurtleError::Parse("empty GPS sampler command".to_string()))?;
        Ok(Self::new(program, words.collect(), timeout))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl GpsSampler for CommandSampler {
    fn sample(&mut self) -> Result<()> {
        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HopeTurtleError::Sampler(format!("cannot start {}: {}", self.program, e)))?;

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(
                        "GPS sampler exited with {} after {:?}",
                        status,
                        started.elapsed()
                    );
                    return Ok(());
                }
                Ok(None) => {}
                Err(e) => {
                    reap(&mut child);
                    return Err(HopeTurtleError::Io(e));
                }
            }
            if self.shutdown.as_ref().is_some_and(Shutdown::is_requested) {
                reap(&mut child);
                return Err(HopeTurtleError::Sampler(format!(
                    "{} interrupted by shutdown",
                    self.program
                )));
            }
            if started.elapsed() >= self.timeout {
                reap(&mut child);
                return Err(HopeTurtleError::Sampler(format!(
                    "{} timed out after {:?}",
                    self.program, self.timeout
                )));
            }
            thread::sleep(WAIT_POLL);
        }
    }
}

/// Kill can fail if the child exited in between; wait reaps either way
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
