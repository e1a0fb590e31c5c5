//! Timed code rotation for Rollcall.
//!
//! While a session is open, its code is replaced every `interval`
//! (default 15 s) and the new code is pushed to every display the
//! transport registered for the session.
//!
//! # Pieces
//!
//! - [`RotationScheduler`]: the timer. Pure timing, knows nothing about
//!   sessions.
//! - [`CodeDisplay`]: the seam to the transport that renders codes.
//! - [`spawn_rotation`]: one Tokio task per open session that ties the
//!   two to a [`SessionState`](rollcall_session::SessionState).
//!   Returns a [`RotationHandle`] used to stop it.
//!
//! # Integration
//!
//! ```ignore
//! let opened = state.open(session_id).await?;
//! let rotation = spawn_rotation(Arc::clone(&state), display, config);
//! // ... later
//! let snapshot = state.close().await?;
//! rotation.cancel().await; // returns once the task has exited
//! ```

#![allow(async_fn_in_trait)]

mod display;
mod error;
mod task;

pub use display::{CloseSummary, CodeDisplay, CodeUpdate, NullDisplay};
pub use error::DisplayError;
pub use task::{RotationHandle, RotationSummary, spawn_rotation};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for code rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// How long each code stays valid. Also the time between rotations.
    pub interval: Duration,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
        }
    }
}

impl RotationConfig {
    /// Shortest interval accepted.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Below this, participants can hardly type the code in time.
    pub const RECOMMENDED_MIN_INTERVAL: Duration = Duration::from_secs(5);

    /// Longest interval accepted: one day.
    pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Create a config with the given interval in seconds.
    pub fn with_secs(secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(secs),
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`RotationScheduler::new`]. Rules:
    /// - `interval` raised to at least [`Self::MIN_INTERVAL`].
    /// - `interval` lowered to at most [`Self::MAX_INTERVAL`].
    /// - A warning is logged below [`Self::RECOMMENDED_MIN_INTERVAL`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                "rotation interval below 1s, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        if self.interval > Self::MAX_INTERVAL {
            warn!(
                interval_secs = self.interval.as_secs(),
                "rotation interval above one day, clamping"
            );
            self.interval = Self::MAX_INTERVAL;
        }
        if self.interval < Self::RECOMMENDED_MIN_INTERVAL {
            warn!(
                interval_secs = self.interval.as_secs_f64(),
                "rotation interval below the recommended 5s"
            );
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Returned by [`RotationScheduler::wait_for_rotation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationTick {
    /// Monotonically increasing rotation number (starts at 1).
    pub rotation: u64,
    /// Rotations that were due while we were late (0 in normal operation).
    pub skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-interval rotation timer.
///
/// Late wake-ups never cause a burst: missed rotations are skipped and the
/// next one is scheduled a full interval after the actual wake-up, so a
/// code is always on screen for at least `interval`.
#[derive(Debug)]
pub struct RotationScheduler {
    interval: Duration,
    /// When the next rotation is due.
    next: Instant,
    rotations: u64,
}

impl RotationScheduler {
    /// Create a scheduler whose first rotation is one interval from now.
    pub fn new(config: RotationConfig) -> Self {
        let config = config.validated();
        debug!(
            interval_secs = config.interval.as_secs_f64(),
            "rotation scheduler created"
        );
        Self {
            interval: config.interval,
            next: Instant::now() + config.interval,
            rotations: 0,
        }
    }

    /// Wait until the next rotation is due.
    pub async fn wait_for_rotation(&mut self) -> RotationTick {
        time::sleep_until(self.next).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(self.next);
        let skipped = (late_by.as_nanos() / self.interval.as_nanos()) as u64;
        if skipped > 0 {
            warn!(
                rotation = self.rotations + 1,
                skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "rotation overdue, skipping ahead"
            );
        }

        self.rotations += 1;
        self.next = now + self.interval;

        RotationTick {
            rotation: self.rotations,
            skipped,
        }
    }

    /// Restart the countdown: the next rotation is one interval from now.
    pub fn reset(&mut self) {
        self.next = Instant::now() + self.interval;
    }

    /// Rotations fired so far.
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// The validated interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
