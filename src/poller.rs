//! Completion barrier over every environment of a batch.
//!
//! Environments are not tracked by handle: the poller asks the runtime which environments
//! still mount the shared game-data directory and sleeps until none remain. Every match of a
//! batch mounts that directory, so the barrier only tells that *all* matches finished.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use tracing::{debug, instrument, trace};

use crate::{container::ContainerRuntime, error::ArenaError};

/// Polling interval used when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// How long and how often to wait for environments to exit.
///
/// The default has no deadline: a hung environment blocks the caller until it is killed
/// from outside (or the wait is cancelled through a [`CancellationToken`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    interval: Duration,
    deadline: Option<Duration>,
}

impl WaitPolicy {
    /// Poll every `interval`, forever.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Change the polling interval.
    #[must_use]
    pub fn with_interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// Give up after `deadline` with [`ArenaError::WaitTimedOut`].
    #[must_use]
    pub fn with_deadline(self, deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            ..self
        }
    }

    /// Polling interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Optional deadline, `None` means wait forever.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

/// Shared flag used to abort a [`wait_for_completion`] call from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// New, not cancelled, token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Observed at the next poll.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once [`CancellationToken::cancel`] was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Block until no environment mounting `shared_mount` is running.
///
/// Returns the number of polls performed. A runtime query failure is returned as is, there
/// are no retries.
#[instrument(skip(runtime, cancel))]
pub fn wait_for_completion<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    shared_mount: &Path,
    policy: WaitPolicy,
    cancel: Option<&CancellationToken>,
) -> anyhow::Result<usize> {
    let started = Instant::now();
    let mut polls = 0;
    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(ArenaError::WaitCancelled.into());
        }

        let running = runtime
            .list_running(shared_mount)
            .context("could not list running environments")?;
        polls += 1;
        if running.is_empty() {
            debug!(polls, elapsed = ?started.elapsed(), "all environments exited");
            return Ok(polls);
        }
        trace!(?running);

        let mut pause = policy.interval;
        if let Some(deadline) = policy.deadline {
            let elapsed = started.elapsed();
            if elapsed >= deadline {
                return Err(ArenaError::WaitTimedOut(deadline).into());
            }
            // one last poll lands on the deadline
            pause = pause.min(deadline - elapsed);
        }
        std::thread::sleep(pause);
    }
}
