//! Per-engine suspension state.
//!
//! The orchestrator only emits a suspend/no-suspend signal; this is the
//! bookkeeping the surrounding search loop keeps per engine to act on it.
//!
//! # State Machine
//!
//! ```text
//! ┌────────┐  suspend(t)   ┌───────────┐  t elapsed   ┌────────┐
//! │ Active ├──────────────►│ Suspended ├─────────────►│ Active │
//! └───▲────┘               └───────────┘              └───┬────┘
//!     │        resume() after a successful invocation     │
//!     └───────────────────────────────────────────────────┘
//! ```
//!
//! Without an engine-supplied time, the suspension grows with consecutive
//! failures: `min(max_ban_time_on_fail, continuous_errors * ban_time_on_fail)`.

use crate::config::SearchSettings;
use std::time::{Duration, Instant};

/// Longest suspension ever applied, roughly a hundred years.
pub const MAX_SUSPENSION: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Backoff applied when a failure carries no suspension time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspensionPolicy {
    /// Suspension added per consecutive failure.
    pub ban_time_on_fail: Duration,
    /// Upper bound of the failure-driven suspension.
    pub max_ban_time_on_fail: Duration,
}

impl Default for SuspensionPolicy {
    fn default() -> Self {
        Self {
            ban_time_on_fail: Duration::from_secs(5),
            max_ban_time_on_fail: Duration::from_secs(120),
        }
    }
}

impl From<&SearchSettings> for SuspensionPolicy {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            ban_time_on_fail: Duration::from_secs(settings.ban_time_on_fail_seconds),
            max_ban_time_on_fail: Duration::from_secs(settings.max_ban_time_on_fail_seconds),
        }
    }
}

/// Suspension state of one engine.
#[derive(Debug, Clone, Default)]
pub struct SuspendedStatus {
    continuous_errors: u32,
    suspend_end: Option<Instant>,
    suspend_reason: Option<String>,
}

impl SuspendedStatus {
    /// Whether the engine must not be dispatched right now.
    pub fn is_suspended(&self) -> bool {
        self.is_suspended_at(Instant::now())
    }

    fn is_suspended_at(&self, now: Instant) -> bool {
        self.suspend_end.is_some_and(|end| now < end)
    }

    /// Consecutive suspending failures since the last success.
    pub fn continuous_errors(&self) -> u32 {
        self.continuous_errors
    }

    /// Why the engine was last suspended.
    pub fn reason(&self) -> Option<&str> {
        self.suspend_reason.as_deref()
    }

    /// Time left until the suspension ends.
    pub fn remaining(&self) -> Duration {
        self.suspend_end
            .map(|end| end.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    /// Suspend for `suspended_time`, or for the policy backoff when `None`.
    ///
    /// The time is capped at [`MAX_SUSPENSION`]. Returns the applied suspension.
    pub fn suspend(
        &mut self,
        suspended_time: Option<Duration>,
        reason: impl Into<String>,
        policy: &SuspensionPolicy,
    ) -> Duration {
        self.continuous_errors = self.continuous_errors.saturating_add(1);
        let duration = suspended_time.unwrap_or_else(|| {
            policy
                .ban_time_on_fail
                .saturating_mul(self.continuous_errors)
                .min(policy.max_ban_time_on_fail)
        });
        let duration = duration.min(MAX_SUSPENSION);
        let now = Instant::now();
        self.suspend_end = now.checked_add(duration).or_else(|| {
            tracing::warn!(?duration, "suspension end not representable, suspending for a day");
            now.checked_add(Duration::from_secs(24 * 60 * 60))
        });
        self.suspend_reason = Some(reason.into());
        duration
    }

    /// Clear the suspension after a successful invocation.
    pub fn resume(&mut self) {
        self.continuous_errors = 0;
        self.suspend_end = None;
        self.suspend_reason = None;
    }
}
