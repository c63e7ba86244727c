//! Cancellable fixed-interval poll timer
//!
//! Each polled job owns a `PollTimer` with its own deadline. All timers share
//! one `CancellationToken`, so a single cancel wakes every waiting poll loop.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Outcome of waiting for the next poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Interval elapsed (or the deadline was reached); poll again
    Elapsed,
    Cancelled,
}

/// Fixed-interval timer bounded by a wall-clock deadline
#[derive(Debug)]
pub struct PollTimer {
    interval: Duration,
    deadline: Instant,
    cancel: CancellationToken,
}

impl PollTimer {
    pub fn new(interval: Duration, timeout: Duration, cancel: CancellationToken) -> Self {
        debug!(?interval, ?timeout, "PollTimer::new: called");
        Self {
            interval,
            deadline: Instant::now() + timeout,
            cancel,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Sleep one interval, shortened so the last wait ends at the deadline
    pub async fn wait(&self) -> Tick {
        if self.cancel.is_cancelled() {
            debug!("PollTimer::wait: already cancelled");
            return Tick::Cancelled;
        }
        let sleep_for = self.interval.min(self.remaining());
        tokio::select! {
            _ = tokio::time::sleep(sleep_for) => Tick::Elapsed,
            _ = self.cancel.cancelled() => {
                debug!("PollTimer::wait: cancelled while sleeping");
                Tick::Cancelled
            }
        }
    }
}
