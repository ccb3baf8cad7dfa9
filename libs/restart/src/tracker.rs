//! Per-instance restart state machines.

use std::time::{Duration, Instant};

use crate::policy::{JobKind, RestartPolicy};

/// Outcome of a restart decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartDecision {
    /// Whether the task should be relaunched.
    pub restart: bool,

    /// How long to wait before relaunching. Zero when `restart` is false.
    pub wait: Duration,
}

impl RestartDecision {
    /// Relaunch after `wait`.
    pub const fn restart_after(wait: Duration) -> Self {
        Self {
            restart: true,
            wait,
        }
    }

    /// Do not relaunch.
    pub const fn stop() -> Self {
        Self {
            restart: false,
            wait: Duration::ZERO,
        }
    }
}

/// Restart state for a single task instance.
///
/// Not safe for concurrent use; the supervising caller owns it exclusively.
#[derive(Debug, Clone)]
pub enum RestartTracker {
    Service(ServiceTracker),
    Batch(BatchTracker),
    /// Restarts are exhausted or were never allowed.
    Disabled,
}

impl RestartTracker {
    /// Creates the tracker for a job kind, opening the service window now.
    pub fn new(kind: JobKind, policy: &RestartPolicy) -> Self {
        Self::new_at(kind, policy, Instant::now())
    }

    /// Creates the tracker for a job kind with an explicit window start.
    pub fn new_at(kind: JobKind, policy: &RestartPolicy, now: Instant) -> Self {
        match kind {
            JobKind::Service => Self::Service(ServiceTracker::new(policy, now)),
            JobKind::Batch => Self::Batch(BatchTracker::new(policy)),
        }
    }

    /// A tracker that never restarts.
    pub fn no_restarts() -> Self {
        Self::Disabled
    }

    /// Decides whether to relaunch after an exit with `exit_code`.
    pub fn next_restart(&mut self, exit_code: i32) -> RestartDecision {
        self.next_restart_at(exit_code, Instant::now())
    }

    /// Same as [`next_restart`](Self::next_restart) with an explicit clock reading.
    pub fn next_restart_at(&mut self, exit_code: i32, now: Instant) -> RestartDecision {
        match self {
            Self::Service(tracker) => tracker.next_restart(now),
            Self::Batch(tracker) => tracker.next_restart(exit_code),
            Self::Disabled => RestartDecision::stop(),
        }
    }

    /// Restart attempts counted so far (in the current window for services).
    pub fn attempts_used(&self) -> u32 {
        match self {
            Self::Service(tracker) => tracker.count,
            Self::Batch(tracker) => tracker.count,
            Self::Disabled => 0,
        }
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Service(_) => "service",
            Self::Batch(_) => "batch",
            Self::Disabled => "disabled",
        }
    }
}

/// Lifetime-bounded restarts for run-to-completion work.
#[derive(Debug, Clone)]
pub struct BatchTracker {
    max_attempts: u32,
    delay: Duration,
    count: u32,
}

impl BatchTracker {
    pub fn new(policy: &RestartPolicy) -> Self {
        Self {
            max_attempts: policy.attempts,
            delay: policy.delay,
            count: 0,
        }
    }

    fn next_restart(&mut self, exit_code: i32) -> RestartDecision {
        // A clean exit means the work is done.
        if self.count < self.max_attempts && exit_code != 0 {
            self.count += 1;
            return RestartDecision::restart_after(self.delay);
        }
        RestartDecision::stop()
    }
}

/// Windowed restart pacing for long-running work.
///
/// The exit code is deliberately not consulted: a service that exits
/// cleanly is relaunched exactly like one that crashed. Whether a clean
/// exit should instead stop the service is an open policy question.
#[derive(Debug, Clone)]
pub struct ServiceTracker {
    max_attempts: u32,
    delay: Duration,
    interval: Duration,
    count: u32,
    window_start: Instant,
}

impl ServiceTracker {
    pub fn new(policy: &RestartPolicy, now: Instant) -> Self {
        Self {
            max_attempts: policy.attempts,
            delay: policy.delay,
            interval: policy.interval,
            count: 0,
            window_start: now,
        }
    }

    fn next_restart(&mut self, now: Instant) -> RestartDecision {
        let decision = self.decide(now);
        self.count = self.count.saturating_add(1);
        decision
    }

    fn decide(&mut self, now: Instant) -> RestartDecision {
        // An interval too large to add to an Instant never closes.
        let window_end = self.window_start.checked_add(self.interval);

        match window_end {
            Some(end) if now > end => {
                self.count = 0;
                self.window_start = now;
                RestartDecision::restart_after(self.delay)
            }
            _ if self.count < self.max_attempts => RestartDecision::restart_after(self.delay),
            Some(end) => RestartDecision::restart_after(end.saturating_duration_since(now)),
            None => RestartDecision::restart_after(self.interval),
        }
    }
}
