//! Readiness polling for freshly created instances.
//!
//! A poll session checks the remote status of one instance at a fixed
//! interval until it reports `active` or `error`, the deadline passes, or the
//! caller cancels. The first check happens one interval after the session
//! starts. Checks never overlap, and a failed check ends the session.
//!
//! ```ignore
//! use shadeform::poller::{await_ready, PollSettings, ResourceHandle};
//! use tokio_util::sync::CancellationToken;
//!
//! let handle = ResourceHandle::new("trainer", instance_id);
//! let outcome = await_ready(&handle, &client, PollSettings::default(), &CancellationToken::new()).await;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_CREATE_TIMEOUT, DEFAULT_POLL_INTERVAL};
use crate::error::{Result, ShadeformError};

/// Status reported once an instance is usable.
pub const STATUS_ACTIVE: &str = "active";

/// Status reported when provisioning failed for good.
pub const STATUS_ERROR: &str = "error";

/// Identifies the instance being awaited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    name: String,
    id: String,
}

impl ResourceHandle {
    /// Create a handle from a display name and the remote id.
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    /// Display name, used for logging only.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remote identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// One status reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Raw status string, e.g. `pending_provider`.
    pub status: String,
    /// Explanation sent alongside the status, if any.
    pub detail: Option<String>,
}

impl StatusSnapshot {
    /// Snapshot with just a status string.
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            detail: None,
        }
    }
}

/// Source of status readings for an instance.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    /// Read the current remote status of `id`.
    async fn fetch_status(&self, id: &str) -> Result<StatusSnapshot>;
}

/// Timing of a poll session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Time between checks, also the delay before the first one.
    pub interval: Duration,
    /// Total time allowed before giving up.
    pub deadline: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_CREATE_TIMEOUT,
        }
    }
}

/// How a poll session ended.
#[derive(Debug)]
pub enum PollOutcome {
    /// The instance reported `active`.
    Ready,
    /// The instance reported `error`.
    Failed { id: String, reason: String },
    /// No terminal status before the deadline.
    TimedOut { id: String, waited: Duration },
    /// The caller cancelled the session.
    Cancelled { id: String },
    /// A status check failed.
    FetchError { id: String, error: ShadeformError },
}

impl PollOutcome {
    /// Id of the awaited instance, absent only for [`PollOutcome::Ready`].
    #[must_use]
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            Self::Ready => None,
            Self::Failed { id, .. }
            | Self::TimedOut { id, .. }
            | Self::Cancelled { id }
            | Self::FetchError { id, .. } => Some(id),
        }
    }

    /// Whether the instance is usable.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Collapse the outcome into a result for callers that need no cleanup.
    ///
    /// # Errors
    /// Every variant but [`PollOutcome::Ready`] maps to its matching
    /// [`ShadeformError`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Ready => Ok(()),
            Self::Failed { id, reason } => Err(ShadeformError::ProvisioningFailed { id, reason }),
            Self::TimedOut { id, waited } => Err(ShadeformError::Timeout {
                id,
                waited_secs: waited.as_secs(),
            }),
            Self::Cancelled { id } => Err(ShadeformError::Cancelled { id }),
            Self::FetchError { id, error } => Err(ShadeformError::StatusCheck {
                id,
                source: Box::new(error),
            }),
        }
    }
}

/// Wait until the instance behind `handle` is active.
///
/// Checks run every `settings.interval`, the first one interval after the
/// call. When a check and the deadline fall due together the check runs
/// first. Cancellation and the deadline are also observed while a check is
/// in flight.
pub async fn await_ready<F>(
    handle: &ResourceHandle,
    fetcher: &F,
    settings: PollSettings,
    cancel: &CancellationToken,
) -> PollOutcome
where
    F: StatusFetcher + ?Sized,
{
    let started = Instant::now();
    let deadline = offset(started, settings.deadline);
    // interval_at panics on a zero period
    let period = settings.interval.clamp(Duration::from_millis(1), FAR_FUTURE);
    let mut ticker = interval_at(offset(started, period), period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks: u32 = 0;

    info!(
        instance_name = %handle.name(),
        instance_id = %handle.id(),
        interval_secs = settings.interval.as_secs(),
        deadline_secs = settings.deadline.as_secs(),
        "Waiting for instance to become active"
    );

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return cancelled(handle, ticks),
            _ = ticker.tick() => {}
            () = sleep_until(deadline) => return timed_out(handle, started, ticks),
        }

        ticks += 1;
        let fetched = tokio::select! {
            biased;
            () = cancel.cancelled() => return cancelled(handle, ticks),
            result = fetcher.fetch_status(handle.id()) => result,
            () = sleep_until(deadline) => return timed_out(handle, started, ticks),
        };

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(instance_id = %handle.id(), tick = ticks, error = %error, "Status check failed");
                return PollOutcome::FetchError {
                    id: handle.id().to_string(),
                    error,
                };
            }
        };

        debug!(
            instance_name = %handle.name(),
            instance_id = %handle.id(),
            status = %snapshot.status,
            tick = ticks,
            elapsed_secs = started.elapsed().as_secs(),
            "Polling instance status"
        );

        match snapshot.status.as_str() {
            STATUS_ACTIVE => {
                info!(instance_id = %handle.id(), tick = ticks, "Instance is active");
                return PollOutcome::Ready;
            }
            STATUS_ERROR => {
                let reason = snapshot
                    .detail
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| "provider reported error status".to_string());
                warn!(instance_id = %handle.id(), reason = %reason, "Instance entered error state");
                return PollOutcome::Failed {
                    id: handle.id().to_string(),
                    reason,
                };
            }
            _ => {}
        }
    }
}

/// Stand-in for "never", well inside `Instant` range.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn offset(start: Instant, by: Duration) -> Instant {
    start + by.min(FAR_FUTURE)
}

fn cancelled(handle: &ResourceHandle, ticks: u32) -> PollOutcome {
    info!(instance_id = %handle.id(), tick = ticks, "Wait for instance cancelled");
    PollOutcome::Cancelled {
        id: handle.id().to_string(),
    }
}

fn timed_out(handle: &ResourceHandle, started: Instant, ticks: u32) -> PollOutcome {
    let waited = started.elapsed();
    warn!(
        instance_id = %handle.id(),
        tick = ticks,
        waited_secs = waited.as_secs(),
        "Timed out waiting for instance"
    );
    PollOutcome::TimedOut {
        id: handle.id().to_string(),
        waited,
    }
}
