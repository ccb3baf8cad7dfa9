//! Restart policy trackers.
//!
//! When a task instance exits, process supervision asks the instance's
//! [`RestartTracker`] whether to relaunch it and how long to wait first.
//! The tracker variant is fixed when the instance starts:
//!
//! - **Service**: restarts are never refused. Attempts are counted inside a
//!   sliding window of `interval`; once `attempts` is spent, the next restart
//!   waits until the window closes.
//! - **Batch**: at most `attempts` restarts over the instance's lifetime, and
//!   only for failing exits.
//! - **Disabled**: never restarts.
//!
//! # Invariants
//!
//! - A tracker is owned by exactly one supervisor and mutated once per exit
//! - A decision is always produced; there is no error path
//! - A service tracker never answers "do not restart"

mod policy;
mod tracker;

pub use policy::{JobKind, ParseJobKindError, RestartPolicy};
pub use tracker::{BatchTracker, RestartDecision, RestartTracker, ServiceTracker};

use std::time::Duration;

/// Default restart attempts per window for services.
pub const DEFAULT_SERVICE_ATTEMPTS: u32 = 2;

/// Default restart window for services.
pub const DEFAULT_SERVICE_INTERVAL: Duration = Duration::from_secs(60);

/// Default lifetime restart attempts for batch work.
pub const DEFAULT_BATCH_ATTEMPTS: u32 = 15;

/// Default wait before a granted restart.
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(15);
